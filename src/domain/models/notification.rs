use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::entrant::Entrant;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Waiting,   // joined the list, or not picked in a draw
    Invited,
    Declined,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Notification {
    pub id: String,
    pub event_id: String,
    pub entrant_id: String,
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_entrant(entrant: &Entrant, kind: NotificationKind, title: String, message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: entrant.event_id.clone(),
            entrant_id: entrant.id.clone(),
            recipient_email: entrant.email.clone(),
            kind,
            title,
            message,
            created_at: Utc::now(),
        }
    }

    pub fn joined(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Waiting,
            format!("You joined the waiting list for {}.", event_name),
            "You will be notified when the lottery is drawn.".to_string(),
        )
    }

    pub fn selected(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Invited,
            format!("You've been invited to {}!", event_name),
            "You were selected in the lottery for this event.".to_string(),
        )
    }

    pub fn enrolled(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Invited,
            format!("You're enrolled in {}!", event_name),
            "You were selected in the lottery and your spot is confirmed.".to_string(),
        )
    }

    pub fn not_selected(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Waiting,
            format!("Not selected in the {} draw.", event_name),
            "You were not selected in this draw, but you may still be chosen if a spot opens.".to_string(),
        )
    }

    pub fn replacement(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Invited,
            format!("A spot opened up in {}!", event_name),
            "You were drawn from the waiting list to fill a cancelled spot.".to_string(),
        )
    }

    pub fn declined(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Declined,
            format!("You declined your invitation to {}.", event_name),
            "Your spot has been released to the waiting list.".to_string(),
        )
    }

    pub fn cancelled(entrant: &Entrant, event_name: &str) -> Self {
        Self::for_entrant(
            entrant,
            NotificationKind::Cancelled,
            format!("Your registration for {} was cancelled.", event_name),
            "Your spot for this event has been cancelled.".to_string(),
        )
    }
}
