use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub max_capacity: i32,
    pub max_waiting_list_size: Option<i32>,
}

#[derive(Deserialize)]
pub struct JoinWaitingListRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct RunLotteryRequest {
    pub count: u32,
}

#[derive(Deserialize)]
pub struct RespondInvitationRequest {
    pub accept: bool,
}

#[derive(Deserialize)]
pub struct EntrantListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: String,
}
