// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::dashboard_state::{DashboardState, StateHandle, new_state_handle};
use crate::application::identity_provider::IdentityProvider;
use crate::application::key_value_store::KeyValueStore;
use crate::application::node_service::NodeService;
use crate::application::persistence::Persistence;
use crate::application::reading_feed::ReadingFeed;
use crate::application::session_service::SessionService;
use crate::application::subscription_service::SubscriptionManager;
use crate::domain::device::DevAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub nodes: NodeService,
    pub dashboard_service: DashboardService,
    pub subscriptions: Arc<SubscriptionManager>,
    pub dashboard_state: StateHandle,
}

impl AppState {
    /// Restore persisted slots and wire the services together.
    pub async fn build(
        identity: Arc<dyn IdentityProvider>,
        feed: Arc<dyn ReadingFeed>,
        store: Arc<dyn KeyValueStore>,
        default_devices: &[DevAddr],
    ) -> Self {
        let persistence = Persistence::new(store);
        let restored = persistence.load(default_devices).await;
        tracing::info!(
            "Restored {} tracked devices, {} with history",
            restored.devices.len(),
            restored.history.len()
        );

        let dashboard_state = new_state_handle(DashboardState::restore(restored));
        let sessions = Arc::new(SessionService::new(identity));
        let subscriptions = Arc::new(SubscriptionManager::new(
            feed,
            dashboard_state.clone(),
            persistence.clone(),
        ));
        let nodes = NodeService::new(
            dashboard_state.clone(),
            persistence,
            subscriptions.clone(),
            sessions.clone(),
        );

        Self {
            sessions,
            nodes,
            dashboard_service: DashboardService::new(dashboard_state.clone()),
            subscriptions,
            dashboard_state,
        }
    }
}
