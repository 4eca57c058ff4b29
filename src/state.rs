use crate::bridge::HostBridge;
use crate::ingest::Session;
use crate::ui::{LayoutPass, MatchColumnHeights, PageTemplate};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub bridge: HostBridge,
    pub template: Arc<PageTemplate>,
    pub layout: Arc<dyn LayoutPass>,
}

impl AppState {
    pub fn new(template: PageTemplate, bridge: HostBridge) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            bridge,
            template: Arc::new(template),
            layout: Arc::new(MatchColumnHeights),
        }
    }
}
