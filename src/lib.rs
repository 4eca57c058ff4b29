pub mod app;
pub mod attendance;
pub mod bridge;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod state;
pub mod ui;

pub use app::router;
pub use bridge::HostBridge;
pub use config::Config;
pub use state::AppState;
pub use ui::{load_template, PageTemplate};
