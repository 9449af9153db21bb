pub mod sqlite_entrant_repo;
pub mod sqlite_event_repo;
pub mod sqlite_notification_repo;

pub mod memory_repo;
