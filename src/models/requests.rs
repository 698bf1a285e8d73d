use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to run a full match for a free-text requirement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(length(min = 1, max = 20000))]
    #[serde(alias = "requirementText", rename = "requirement")]
    pub requirement: String,
}

/// Request to parse a requirement without matching
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ParseRequest {
    #[validate(length(min = 1, max = 20000))]
    #[serde(alias = "requirementText", rename = "requirement")]
    pub requirement: String,
}
