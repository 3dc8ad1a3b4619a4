//! Typed view of the player configuration blob.
//!
//! Only the parts the pipeline reads are typed. Everything else is kept
//! in the `extra` maps so a decoded config serialises back to the same
//! JSON. Typed fields are lenient: a value of an unexpected type reads
//! as `None` rather than failing the whole page.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Decoded `var config = {...}` object of a player page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub video: VideoMetadata,
    pub request: PlayerRequest,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerConfig {
    /// Progressive-download candidates, in page order.
    #[must_use]
    pub fn progressive(&self) -> &[ProgressiveFile] {
        &self.request.files.progressive
    }
}

/// The `video` object: title, owner, canonical URL and friends.
///
/// Typed fields are a view. A value that does not fit its typed field
/// stays in `extra` under its own key, so no part of the object is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Canonical page URL, e.g. `https://vimeo.com/76979871`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<VideoOwner>,
    /// Thumbnail URLs keyed by width (`"640"`, `"base"`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbs: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for VideoMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            id: take_typed(&mut extra, "id"),
            title: take_typed(&mut extra, "title"),
            url: take_typed(&mut extra, "url"),
            duration: take_typed(&mut extra, "duration"),
            width: take_typed(&mut extra, "width"),
            height: take_typed(&mut extra, "height"),
            owner: take_typed(&mut extra, "owner"),
            thumbs: take_typed(&mut extra, "thumbs"),
            extra,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoOwner {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRequest {
    pub files: PlayerFiles,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `request.files`; `hls` and `dash` stay untyped in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFiles {
    /// Required; may be empty.
    #[serde(deserialize_with = "lenient_entries")]
    pub progressive: Vec<ProgressiveFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One progressive-download rendition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveFile {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Label such as `"720p"`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cdn: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressiveFile {
    /// Candidate carrying only a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// The URL, if it is a non-empty string.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Move `key` out of `map` when its value decodes as `T`.
fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let decoded = serde_json::from_value(map.get(key)?.clone()).ok()?;
    map.remove(key);
    Some(decoded)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Non-object entries become empty candidates instead of failing the list.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<ProgressiveFile>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}
