// Node service - tracked devices, map pins and preferences
use crate::application::dashboard_state::StateHandle;
use crate::application::persistence::Persistence;
use crate::application::session_service::SessionService;
use crate::application::subscription_service::SubscriptionManager;
use crate::domain::device::{DevAddr, DevAddrError, LocationError, NodeLocation};
use crate::domain::preferences::{Locale, Theme};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    InvalidAddress(#[from] DevAddrError),
    #[error("device {0} is already tracked")]
    Duplicate(DevAddr),
    #[error("device {0} is not tracked")]
    NotTracked(DevAddr),
    #[error(transparent)]
    InvalidLocation(#[from] LocationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preferences {
    pub theme: Theme,
    pub locale: Locale,
}

#[derive(Clone)]
pub struct NodeService {
    state: StateHandle,
    persistence: Persistence,
    subscriptions: Arc<SubscriptionManager>,
    sessions: Arc<SessionService>,
}

impl NodeService {
    pub fn new(
        state: StateHandle,
        persistence: Persistence,
        subscriptions: Arc<SubscriptionManager>,
        sessions: Arc<SessionService>,
    ) -> Self {
        Self {
            state,
            persistence,
            subscriptions,
            sessions,
        }
    }

    /// (Re)open one subscription per tracked device, if signed in.
    pub async fn connect(&self) {
        let Some(session) = self.sessions.current().await else {
            tracing::debug!("No session, not subscribing");
            return;
        };
        let devices = self.state.read().await.devices.clone();
        self.subscriptions
            .resubscribe(&devices, session.bearer())
            .await;
    }

    /// Validate and track a new device. Nothing changes on rejection.
    pub async fn add_device(&self, input: &str) -> Result<DevAddr, NodeError> {
        let dev_addr = DevAddr::parse(input)?;
        {
            let mut state = self.state.write().await;
            if !state.add_device(dev_addr) {
                return Err(NodeError::Duplicate(dev_addr));
            }
            self.persistence.save_devices(&state.devices).await;
        }
        tracing::info!("Tracking device {}", dev_addr);
        self.connect().await;
        Ok(dev_addr)
    }

    /// Stop tracking a device, purging its reading, history and map pin.
    pub async fn remove_device(&self, dev_addr: DevAddr) -> Result<(), NodeError> {
        {
            let mut state = self.state.write().await;
            if !state.remove_device(dev_addr) {
                return Err(NodeError::NotTracked(dev_addr));
            }
            self.persistence.save_devices(&state.devices).await;
            self.persistence.save_history(&state.history).await;
            self.persistence.save_locations(&state.locations).await;
        }
        tracing::info!("Stopped tracking device {}", dev_addr);
        self.connect().await;
        Ok(())
    }

    pub async fn set_location(
        &self,
        dev_addr: DevAddr,
        location: NodeLocation,
    ) -> Result<(), NodeError> {
        let location = location.validate()?;
        let mut state = self.state.write().await;
        if !state.set_location(dev_addr, location) {
            return Err(NodeError::NotTracked(dev_addr));
        }
        tracing::debug!("Device {} pinned at {:?}", dev_addr, location);
        self.persistence.save_locations(&state.locations).await;
        Ok(())
    }

    pub async fn preferences(&self) -> Preferences {
        let state = self.state.read().await;
        Preferences {
            theme: state.theme,
            locale: state.locale,
        }
    }

    pub async fn set_theme(&self, theme: Theme) {
        let mut state = self.state.write().await;
        state.theme = theme;
        self.persistence.save_theme(theme).await;
    }

    pub async fn toggle_theme(&self) -> Theme {
        let mut state = self.state.write().await;
        state.theme = state.theme.toggled();
        self.persistence.save_theme(state.theme).await;
        state.theme
    }

    pub async fn set_locale(&self, locale: Locale) {
        let mut state = self.state.write().await;
        state.locale = locale;
        self.persistence.save_locale(locale).await;
    }

    /// Close every subscription, then sign out. Returns the provider's
    /// logout page.
    pub async fn logout(&self) -> String {
        self.subscriptions.shutdown().await;
        self.state.write().await.reset_latest();
        self.sessions.logout().await
    }
}
