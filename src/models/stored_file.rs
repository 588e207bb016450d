//! Represents an uploaded file held by the file store.

use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file.
///
/// `path` and `url` are public locations (`/uploads/<name>`), not
/// filesystem paths.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
