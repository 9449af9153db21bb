use std::sync::Arc;
use crate::domain::ports::{EntrantRepository, EventRepository, NotificationRepository};
use crate::domain::services::lifecycle::LifecycleManager;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub event_repo: Arc<dyn EventRepository>,
    pub entrant_repo: Arc<dyn EntrantRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub lifecycle: Arc<LifecycleManager>,
}
