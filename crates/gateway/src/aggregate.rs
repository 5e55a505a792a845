use std::collections::{BTreeMap, HashMap};

use hubgate_protocol::Value;

/// Aggregation of a per-server batch operation.
///
/// Every targeted server id lands in exactly one of the two maps; a
/// single failure never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    pub successes: HashMap<i64, Value>,
    pub failures: HashMap<i64, String>,
}

impl AggregatedResult {
    pub fn record_success(&mut self, server_id: i64, response: Value) {
        self.successes.insert(server_id, response);
    }

    pub fn record_failure(&mut self, server_id: i64, message: impl Into<String>) {
        self.failures.insert(server_id, message.into());
    }

    pub fn absorb_failures(&mut self, failed: HashMap<i64, String>) {
        self.failures.extend(failed);
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    /// Wire shape: `Successful` and `Failed` structs, each with
    /// index-aligned `ServerIds` and `Responses` arrays sorted by id.
    pub fn to_members(&self) -> BTreeMap<String, Value> {
        let mut members = BTreeMap::new();
        members.insert(
            "Successful".to_string(),
            side(self.successes.iter().map(|(id, v)| (*id, v.clone()))),
        );
        members.insert(
            "Failed".to_string(),
            side(self
                .failures
                .iter()
                .map(|(id, msg)| (*id, Value::String(msg.clone())))),
        );
        members
    }

    pub fn to_value(&self) -> Value {
        Value::Struct(self.to_members())
    }
}

fn side(entries: impl Iterator<Item = (i64, Value)>) -> Value {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by_key(|(id, _)| *id);
    let (ids, responses): (Vec<_>, Vec<_>) = entries.into_iter().unzip();

    let mut members = BTreeMap::new();
    members.insert(
        "ServerIds".to_string(),
        Value::Array(ids.into_iter().map(Value::Int).collect()),
    );
    members.insert("Responses".to_string(), Value::Array(responses));
    Value::Struct(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_lands_on_exactly_one_side() {
        let mut result = AggregatedResult::default();
        result.record_success(1, Value::String("ok".into()));
        result.record_failure(2, "boom");
        result.record_success(3, Value::String("ok".into()));

        assert_eq!(result.len(), 3);
        let members = result.to_members();
        let successful = members["Successful"].as_struct().unwrap();
        assert_eq!(
            successful["ServerIds"],
            Value::Array(vec![Value::Int(1), Value::Int(3)])
        );
        let failed = members["Failed"].as_struct().unwrap();
        assert_eq!(failed["ServerIds"], Value::Array(vec![Value::Int(2)]));
        assert_eq!(
            failed["Responses"],
            Value::Array(vec![Value::String("boom".into())])
        );
    }

    #[test]
    fn empty_batch_serializes_to_empty_sides() {
        let result = AggregatedResult::default();
        assert!(result.is_empty());
        let members = result.to_members();
        let successful = members["Successful"].as_struct().unwrap();
        assert_eq!(successful["ServerIds"], Value::Array(vec![]));
        assert_eq!(successful["Responses"], Value::Array(vec![]));
    }
}
