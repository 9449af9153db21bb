use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum EntrantStatus {
    Waiting,
    Invited,
    Enrolled,
    Cancelled,
}

impl EntrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrantStatus::Waiting => "WAITING",
            EntrantStatus::Invited => "INVITED",
            EntrantStatus::Enrolled => "ENROLLED",
            EntrantStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WAITING" => Some(EntrantStatus::Waiting),
            "INVITED" => Some(EntrantStatus::Invited),
            "ENROLLED" => Some(EntrantStatus::Enrolled),
            "CANCELLED" => Some(EntrantStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for EntrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant in one event's lottery.
///
/// `status` and `status_changed_at` only ever change together through
/// [`Entrant::transition`]; entrants are never deleted, a withdrawn or
/// cancelled entrant stays in `CANCELLED` for history.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Entrant {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: EntrantStatus,
    pub joined_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

pub struct NewEntrantParams {
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Entrant {
    pub fn new(params: NewEntrantParams, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: params.event_id,
            name: params.name,
            email: normalize_email(&params.email),
            phone: params.phone,
            status: EntrantStatus::Waiting,
            joined_at: now,
            status_changed_at: now,
        }
    }

    /// Moves the entrant to `to`, stamping `status_changed_at`.
    /// A clock behind `joined_at` is clamped so the stamp never precedes it.
    pub fn transition(&mut self, to: EntrantStatus, at: DateTime<Utc>) {
        self.status = to;
        self.status_changed_at = at.max(self.joined_at);
    }

    pub fn is_active(&self) -> bool {
        self.status != EntrantStatus::Cancelled
    }

    pub fn time_since_status_change(&self, now: DateTime<Utc>) -> Duration {
        let delta = now - self.status_changed_at;
        if delta < Duration::zero() { Duration::zero() } else { delta }
    }

    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        let elapsed = self.time_since_status_change(now);

        if elapsed.num_days() > 0 {
            format!("{} days ago", elapsed.num_days())
        } else if elapsed.num_hours() > 0 {
            format!("{} hours ago", elapsed.num_hours())
        } else if elapsed.num_minutes() > 0 {
            format!("{} minutes ago", elapsed.num_minutes())
        } else {
            "Just now".to_string()
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
