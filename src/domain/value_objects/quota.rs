use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::media_types::MediaType;

/// Machine-checkable outcome of a usage check. A deny is a normal result,
/// never an error: the caller translates it into a rejection response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCode {
    Ok,
    MonthlyLimitReached,
    FileTooLarge,
    VideoTooLong,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    pub code: DecisionCode,
    pub reason: String,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            code: DecisionCode::Ok,
            reason: "OK".to_string(),
        }
    }

    pub fn deny(code: DecisionCode, reason: String) -> Self {
        Self {
            allowed: false,
            code,
            reason,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckUsageRequest {
    pub media_type: MediaType,
    pub file_size_mb: Option<f64>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitUsageRequest {
    pub media_type: MediaType,
}
