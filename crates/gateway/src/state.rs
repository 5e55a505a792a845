use std::sync::Arc;

use {hubgate_client::CallExecutor, hubgate_sessions::SessionStore};

use crate::{
    multicast::Multicaster, proxy::HubProxy, relay::AuthRelay, topology::TopologyRetriever,
    unicast::Unicaster,
};

/// The domain services handlers dispatch into. Each one holds the same
/// injected executor and session store — there is exactly one of each.
pub struct GatewayServices {
    pub relay: Arc<AuthRelay>,
    pub topology: Arc<TopologyRetriever>,
    pub unicaster: Arc<Unicaster>,
    pub multicaster: Arc<Multicaster>,
    pub proxy: Arc<HubProxy>,
}

/// Shared gateway runtime state, wrapped in Arc for use across requests.
pub struct GatewayState {
    pub hub_url: String,
    pub sessions: Arc<SessionStore>,
    pub services: GatewayServices,
    pub version: String,
}

impl GatewayState {
    pub fn new(
        hub_url: impl Into<String>,
        executor: Arc<dyn CallExecutor>,
        sessions: Arc<SessionStore>,
    ) -> Arc<Self> {
        let hub_url = hub_url.into();
        let topology = Arc::new(TopologyRetriever::new(Arc::clone(&executor)));
        let relay = Arc::new(AuthRelay::new(
            hub_url.clone(),
            Arc::clone(&executor),
            Arc::clone(&topology),
            Arc::clone(&sessions),
        ));
        let unicaster = Arc::new(Unicaster::new(Arc::clone(&executor), Arc::clone(&sessions)));
        let multicaster = Arc::new(Multicaster::new(
            Arc::clone(&executor),
            Arc::clone(&sessions),
        ));
        let proxy = Arc::new(HubProxy::new(hub_url.clone(), executor));

        Arc::new(Self {
            hub_url,
            sessions,
            services: GatewayServices {
                relay,
                topology,
                unicaster,
                multicaster,
                proxy,
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
