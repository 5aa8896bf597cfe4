// Domain layer - Pure types and rules, no I/O
pub mod dashboard;
pub mod device;
pub mod history;
pub mod preferences;
pub mod reading;
pub mod session;
pub mod status;
pub mod telemetry;
