use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub max_capacity: i32,
    pub current_enrolled: i32,
    pub max_waiting_list_size: i32, // 0 = unlimited
    pub created_at: DateTime<Utc>,
}

pub struct NewEventParams {
    pub name: String,
    pub description: String,
    pub max_capacity: i32,
    pub max_waiting_list_size: i32,
}

impl Event {
    pub fn new(params: NewEventParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            description: params.description,
            max_capacity: params.max_capacity,
            current_enrolled: 0,
            max_waiting_list_size: params.max_waiting_list_size,
            created_at: Utc::now(),
        }
    }

    pub fn capacity(&self) -> EventCapacity {
        EventCapacity {
            max_capacity: self.max_capacity,
            current_enrolled: self.current_enrolled,
            max_waiting_list_size: self.max_waiting_list_size,
        }
    }
}

/// Capacity counters of one event. Holds `0 <= current_enrolled <= max_capacity`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct EventCapacity {
    pub max_capacity: i32,
    pub current_enrolled: i32,
    pub max_waiting_list_size: i32,
}

impl EventCapacity {
    pub fn has_available_spots(&self) -> bool {
        self.current_enrolled < self.max_capacity
    }

    pub fn available_spots(&self) -> i32 {
        (self.max_capacity - self.current_enrolled).max(0)
    }

    pub fn is_waiting_list_full(&self, waiting_count: usize) -> bool {
        self.max_waiting_list_size > 0 && waiting_count >= self.max_waiting_list_size as usize
    }

    /// Fails with `CapacityExceeded` at the cap and leaves the counter untouched.
    pub fn increment_enrolled(&mut self) -> Result<(), AppError> {
        if !self.has_available_spots() {
            return Err(AppError::CapacityExceeded);
        }
        self.current_enrolled += 1;
        Ok(())
    }

    /// Returns false when there was nothing to release.
    pub fn decrement_enrolled(&mut self) -> bool {
        if self.current_enrolled == 0 {
            return false;
        }
        self.current_enrolled -= 1;
        true
    }

    /// Applies a signed change all at once, or not at all.
    pub fn apply_delta(&mut self, delta: i32) -> Result<(), AppError> {
        let next = self.current_enrolled + delta;
        if next > self.max_capacity {
            return Err(AppError::CapacityExceeded);
        }
        if next < 0 {
            return Err(AppError::InternalWithMsg(format!(
                "enrolled counter would drop below zero ({} {:+})",
                self.current_enrolled, delta
            )));
        }
        self.current_enrolled = next;
        Ok(())
    }
}
