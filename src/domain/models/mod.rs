pub mod entrant;
pub mod event;
pub mod notification;
