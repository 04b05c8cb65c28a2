use serde::Serialize;

/// Body of an away status write.
#[derive(Debug, Serialize)]
pub struct AwayRequest {
    pub away: bool,
}
