pub mod event_locks;
pub mod lifecycle;
pub mod lottery;
