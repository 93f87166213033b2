//! JSON shapes returned by the `/files` endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object in a bucket listing, plus the URL it can be fetched from.
///
/// Built fresh from the store's metadata on every listing call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    /// Object key within the bucket.
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// When the store last wrote this object, if it reported one.
    pub last_modified: Option<DateTime<Utc>>,

    /// Store-assigned entity tag.
    pub etag: Option<String>,

    /// `http://<endpoint>:<port>/<bucket>/<key>`.
    pub url: String,
}

/// Result of a successful upload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub message: String,
    /// Generated storage key, `<millis>-<sanitized name>`.
    pub file_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub message: String,
}

/// Time-limited GET URL for one object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccessUrl {
    pub url: String,
}
