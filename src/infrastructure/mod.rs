// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod file_store;
pub mod graphql_feed;
pub mod hosted_ui_identity;
pub mod http_response;
pub mod memory_store;
