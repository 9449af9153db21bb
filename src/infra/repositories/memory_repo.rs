use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::{
    entrant::{normalize_email, Entrant, EntrantStatus},
    event::{Event, EventCapacity},
    notification::Notification,
};
use crate::domain::ports::{EntrantRepository, EventRepository, NotificationRepository};
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    events: HashMap<String, Event>,
    entrants: HashMap<String, Entrant>,
    notifications: Vec<Notification>,
}

/// Process-local store behind a single lock, so a batch (entrants plus the
/// enrolled counter) is validated and applied as one step.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut entrants: Vec<Entrant>) -> Vec<Entrant> {
    entrants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
    entrants
}

/// Mirrors the SQLite upsert: `event_id` and `joined_at` are fixed at first insert.
fn upsert(entrants: &mut HashMap<String, Entrant>, entrant: &Entrant) -> Entrant {
    let mut stored = entrant.clone();
    if let Some(existing) = entrants.get(&entrant.id) {
        stored.event_id = existing.event_id.clone();
        stored.joined_at = existing.joined_at;
    }
    entrants.insert(stored.id.clone(), stored.clone());
    stored
}

fn shifted_capacity(event: &Event, delta: i32) -> Result<i32, AppError> {
    let mut capacity = event.capacity();
    capacity.apply_delta(delta)?;
    Ok(capacity.current_enrolled)
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self.tables.read().await.events.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn get_event_capacity(&self, event_id: &str) -> Result<EventCapacity, AppError> {
        self.tables.read().await.events.get(event_id)
            .map(Event::capacity)
            .ok_or(AppError::NotFound("Event not found".into()))
    }

    async fn update_event_capacity(&self, event_id: &str, delta: i32) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(event_id)
            .ok_or(AppError::NotFound("Event not found".into()))?;
        event.current_enrolled = shifted_capacity(event, delta)?;
        Ok(())
    }
}

#[async_trait]
impl EntrantRepository for InMemoryStore {
    async fn fetch_waiting_pool(&self, event_id: &str) -> Result<Vec<Entrant>, AppError> {
        EntrantRepository::list_by_event(self, event_id, Some(EntrantStatus::Waiting)).await
    }

    async fn list_by_event(&self, event_id: &str, status: Option<EntrantStatus>) -> Result<Vec<Entrant>, AppError> {
        let tables = self.tables.read().await;
        let entrants = tables.entrants.values()
            .filter(|e| e.event_id == event_id)
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        Ok(sorted(entrants))
    }

    async fn find_entrant(&self, id: &str) -> Result<Option<Entrant>, AppError> {
        Ok(self.tables.read().await.entrants.get(id).cloned())
    }

    async fn find_active_by_email(&self, event_id: &str, email: &str) -> Result<Option<Entrant>, AppError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.entrants.values()
            .find(|e| e.event_id == event_id && e.email == email && e.is_active())
            .cloned())
    }

    async fn count_by_status(&self, event_id: &str, status: EntrantStatus) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.entrants.values()
            .filter(|e| e.event_id == event_id && e.status == status)
            .count() as i64)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Entrant>, AppError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        let mut entrants = sorted(tables.entrants.values()
            .filter(|e| e.email == email)
            .cloned()
            .collect());
        entrants.reverse();
        Ok(entrants)
    }

    async fn save_entrant(&self, entrant: &Entrant) -> Result<Entrant, AppError> {
        let mut tables = self.tables.write().await;
        Ok(upsert(&mut tables.entrants, entrant))
    }

    async fn save_entrants_batch(&self, event_id: &str, entrants: &[Entrant], enrolled_delta: i32) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        let event = tables.events.get(event_id)
            .ok_or(AppError::NotFound("Event not found".into()))?;
        let next_enrolled = shifted_capacity(event, enrolled_delta)?;

        if let Some(foreign) = entrants.iter().find(|e| e.event_id != event_id) {
            return Err(AppError::InternalWithMsg(format!(
                "entrant {} belongs to event {}, not {}",
                foreign.id, foreign.event_id, event_id
            )));
        }

        for entrant in entrants {
            upsert(&mut tables.entrants, entrant);
        }
        if let Some(event) = tables.events.get_mut(event_id) {
            event.current_enrolled = next_enrolled;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: &Notification) -> Result<(), AppError> {
        self.tables.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_by_recipient(&self, email: &str) -> Result<Vec<Notification>, AppError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.notifications.iter()
            .filter(|n| n.recipient_email == email)
            .rev()
            .cloned()
            .collect())
    }

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<Notification>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.notifications.iter()
            .filter(|n| n.event_id == event_id)
            .rev()
            .cloned()
            .collect())
    }
}
