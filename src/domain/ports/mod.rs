use crate::domain::models::{
    entrant::{Entrant, EntrantStatus},
    event::{Event, EventCapacity},
    notification::Notification,
};
use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
    async fn get_event_capacity(&self, event_id: &str) -> Result<EventCapacity, AppError>;
    /// Shifts the enrolled counter; `CapacityExceeded` if it would leave `[0, max_capacity]`.
    async fn update_event_capacity(&self, event_id: &str, delta: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait EntrantRepository: Send + Sync {
    /// All `WAITING` entrants of the event, in no particular order.
    async fn fetch_waiting_pool(&self, event_id: &str) -> Result<Vec<Entrant>, AppError>;
    async fn list_by_event(&self, event_id: &str, status: Option<EntrantStatus>) -> Result<Vec<Entrant>, AppError>;
    async fn find_entrant(&self, id: &str) -> Result<Option<Entrant>, AppError>;
    /// Any non-cancelled entrant of the event registered under `email`.
    async fn find_active_by_email(&self, event_id: &str, email: &str) -> Result<Option<Entrant>, AppError>;
    async fn count_by_status(&self, event_id: &str, status: EntrantStatus) -> Result<i64, AppError>;
    /// Registration history: every record under `email` across events, newest first.
    async fn list_by_email(&self, email: &str) -> Result<Vec<Entrant>, AppError>;
    /// Upserts one entrant. An existing record keeps its `event_id` and `joined_at`.
    async fn save_entrant(&self, entrant: &Entrant) -> Result<Entrant, AppError>;
    /// Upserts every entrant and shifts the event's enrolled counter by
    /// `enrolled_delta` as one unit: either all of it lands or none of it.
    async fn save_entrants_batch(&self, event_id: &str, entrants: &[Entrant], enrolled_delta: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), AppError>;
    async fn list_by_recipient(&self, email: &str) -> Result<Vec<Notification>, AppError>;
    async fn list_for_event(&self, event_id: &str) -> Result<Vec<Notification>, AppError>;
}
