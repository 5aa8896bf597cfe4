// Application layer - Use cases and the ports they drive
pub mod dashboard_service;
pub mod dashboard_state;
pub mod identity_provider;
pub mod key_value_store;
pub mod node_service;
pub mod persistence;
pub mod reading_feed;
pub mod session_service;
pub mod status_ticker;
pub mod subscription_service;
