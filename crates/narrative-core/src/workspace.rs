use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An unsigned identity entry published in a shared collaborative document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The identity table of a shared collaborative document. Any other fields
/// of that document are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub identities: BTreeMap<String, WorkspaceIdentity>,
}

impl WorkspaceDocument {
    pub fn from_value(value: &serde_json::Value) -> Self {
        value
            .get("identities")
            .cloned()
            .and_then(|ids| serde_json::from_value(ids).ok())
            .map(|identities| Self { identities })
            .unwrap_or_default()
    }
}
