pub mod entrant;
pub mod event;
pub mod health;
pub mod lottery;
pub mod notification;
