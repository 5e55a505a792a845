//! Topology retrieval: which peripheral servers are reachable under a
//! hub session, and where their XML-RPC APIs live.

use std::{collections::HashMap, sync::Arc};

use tracing::warn;

use {
    hubgate_client::CallExecutor,
    hubgate_protocol::{Fault, Value},
};

use crate::error::GatewayError;

const LIST_SYSTEMS: &str = "system.listSystems";
const LIST_USER_SYSTEMS: &str = "system.listUserSystems";
const LIST_SYSTEM_FQDNS: &str = "system.listFqdns";
const SYSTEM_ID_FIELD: &str = "id";

/// Result of resolving endpoints for a batch of server ids. Every
/// requested id appears in exactly one of the two maps.
#[derive(Debug, Default, PartialEq)]
pub struct TopologyResolution {
    pub endpoints: HashMap<i64, String>,
    pub failed: HashMap<i64, String>,
}

pub struct TopologyRetriever {
    executor: Arc<dyn CallExecutor>,
}

impl TopologyRetriever {
    pub fn new(executor: Arc<dyn CallExecutor>) -> Self {
        Self { executor }
    }

    /// Every server id visible under the hub session. Backend errors
    /// propagate as-is — no partial success at this granularity.
    pub async fn list_server_ids(
        &self,
        endpoint: &str,
        session_key: &str,
    ) -> Result<Vec<i64>, GatewayError> {
        let response = self
            .executor
            .execute(endpoint, LIST_SYSTEMS, &[Value::String(session_key.into())])
            .await?;
        parse_system_ids(&response)
    }

    /// Server ids visible to one user — the autoconnect login scope.
    pub async fn list_user_server_ids(
        &self,
        endpoint: &str,
        session_key: &str,
        username: &str,
    ) -> Result<Vec<i64>, GatewayError> {
        let response = self
            .executor
            .execute(
                endpoint,
                LIST_USER_SYSTEMS,
                &[
                    Value::String(session_key.into()),
                    Value::String(username.into()),
                ],
            )
            .await?;
        parse_system_ids(&response)
    }

    /// Resolve the API endpoint for each server id independently.
    /// Per-id failures are recorded and never abort the batch.
    pub async fn resolve_server_endpoints(
        &self,
        endpoint: &str,
        session_key: &str,
        server_ids: &[i64],
    ) -> TopologyResolution {
        let mut resolution = TopologyResolution::default();
        for &server_id in server_ids {
            match self.resolve_one(endpoint, session_key, server_id).await {
                Ok(url) => {
                    resolution.endpoints.insert(server_id, url);
                },
                Err(e) => {
                    warn!(server_id, error = %e, "failed to resolve server endpoint");
                    resolution.failed.insert(server_id, e.to_string());
                },
            }
        }
        resolution
    }

    async fn resolve_one(
        &self,
        endpoint: &str,
        session_key: &str,
        server_id: i64,
    ) -> Result<String, GatewayError> {
        let response = self
            .executor
            .execute(
                endpoint,
                LIST_SYSTEM_FQDNS,
                &[Value::String(session_key.into()), Value::Int(server_id)],
            )
            .await?;
        first_fqdn_endpoint(&response)
    }
}

fn parse_system_ids(response: &Value) -> Result<Vec<i64>, GatewayError> {
    let systems = response
        .as_array()
        .ok_or_else(|| Fault::internal("system list is not an array"))?;
    let mut ids = Vec::with_capacity(systems.len());
    for system in systems {
        let id = system
            .as_struct()
            .and_then(|members| members.get(SYSTEM_ID_FIELD))
            .and_then(Value::as_int)
            .ok_or_else(|| Fault::internal("system entry without a numeric id"))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Additional FQDNs beyond the first are discarded.
fn first_fqdn_endpoint(response: &Value) -> Result<String, GatewayError> {
    let fqdns = response
        .as_array()
        .ok_or_else(|| Fault::internal("FQDN list is not an array"))?;
    let first = fqdns
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Fault::internal("no FQDN found for server"))?;
    Ok(format!("http://{first}/rpc/api"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test_support::MockExecutor;
    use hubgate_client::CallError;

    fn system_entry(id: i64) -> Value {
        let mut members = BTreeMap::new();
        members.insert("id".to_string(), Value::Int(id));
        members.insert("name".to_string(), Value::String(format!("server-{id}")));
        Value::Struct(members)
    }

    #[tokio::test]
    async fn lists_server_ids_from_system_entries() {
        let retriever = TopologyRetriever::new(Arc::new(MockExecutor::new(|_, method, _| {
            assert_eq!(method, "system.listSystems");
            Ok(Value::Array(vec![system_entry(1), system_entry(2)]))
        })));

        let ids = retriever
            .list_server_ids("http://hub/rpc/api", "hub-key")
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn list_errors_propagate_as_is() {
        let retriever = TopologyRetriever::new(Arc::new(MockExecutor::new(|_, _, _| {
            Err(CallError::Fault {
                code: -1,
                message: "hub unavailable".into(),
            })
        })));

        let err = retriever
            .list_server_ids("http://hub/rpc/api", "hub-key")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "hub unavailable");
    }

    #[tokio::test]
    async fn user_listing_passes_the_username() {
        let retriever = TopologyRetriever::new(Arc::new(MockExecutor::new(|_, method, args| {
            assert_eq!(method, "system.listUserSystems");
            assert_eq!(args[1], Value::String("minion-admin".into()));
            Ok(Value::Array(vec![system_entry(9)]))
        })));

        let ids = retriever
            .list_user_server_ids("http://hub/rpc/api", "hub-key", "minion-admin")
            .await
            .unwrap();
        assert_eq!(ids, vec![9]);
    }

    #[tokio::test]
    async fn one_failed_fqdn_lookup_does_not_abort_the_batch() {
        let retriever = TopologyRetriever::new(Arc::new(MockExecutor::new(|_, _, args| {
            match args[1].as_int() {
                // No FQDNs for server 2.
                Some(2) => Ok(Value::Array(vec![])),
                Some(id) => Ok(Value::Array(vec![
                    Value::String(format!("server-{id}.example.org")),
                    Value::String(format!("ignored-{id}.example.org")),
                ])),
                None => panic!("server id missing"),
            }
        })));

        let resolution = retriever
            .resolve_server_endpoints("http://hub/rpc/api", "hub-key", &[1, 2, 3])
            .await;

        assert_eq!(
            resolution.endpoints[&1],
            "http://server-1.example.org/rpc/api"
        );
        assert_eq!(
            resolution.endpoints[&3],
            "http://server-3.example.org/rpc/api"
        );
        assert!(resolution.failed[&2].contains("no FQDN found"));
        assert_eq!(resolution.endpoints.len() + resolution.failed.len(), 3);
    }
}
