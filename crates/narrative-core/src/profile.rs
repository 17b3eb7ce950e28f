use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The public profile carried in a personal document.
///
/// `signature` covers every other field. An absent signature is the
/// "missing" state, distinct from a present-but-invalid one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Profile {
    pub fn new(display_name: Option<String>) -> Self {
        Self {
            display_name,
            avatar_url: None,
            updated_at: Utc::now(),
            signature: None,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(None)
    }
}
