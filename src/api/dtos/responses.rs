use chrono::Utc;
use serde::Serialize;

use crate::domain::models::entrant::Entrant;
use crate::domain::models::event::{Event, EventCapacity};
use crate::domain::services::lottery::DrawResult;

#[derive(Serialize)]
pub struct EntrantResponse {
    #[serde(flatten)]
    pub entrant: Entrant,
    pub time_ago: String,
}

impl From<Entrant> for EntrantResponse {
    fn from(entrant: Entrant) -> Self {
        let time_ago = entrant.time_ago(Utc::now());
        Self { entrant, time_ago }
    }
}

/// One row of an entrant's registration history.
#[derive(Serialize)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub entrant: EntrantResponse,
    pub event_name: String,
}

#[derive(Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub has_available_spots: bool,
    pub waiting_count: i64,
}

#[derive(Serialize)]
pub struct DrawResponse {
    pub selected: usize,
    pub enrolled: usize,
    pub invited: usize,
    pub winners: Vec<EntrantResponse>,
}

impl From<DrawResult> for DrawResponse {
    fn from(result: DrawResult) -> Self {
        let enrolled = result.enrolled_count();
        let selected = result.winners.len();
        Self {
            selected,
            enrolled,
            invited: selected - enrolled,
            winners: result.winners.into_iter().map(EntrantResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct CapacityResponse {
    pub event_id: String,
    #[serde(flatten)]
    pub capacity: EventCapacity,
}
