mod link;

use serde::Serialize;

pub use link::{LinkInfoResponse, SaveLinkRequest, SaveLinkResponse};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
