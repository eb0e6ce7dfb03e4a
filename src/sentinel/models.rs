//! Wire shapes of the Sentinel resources this integration manages.
//!
//! Request bodies must match the management API byte-for-byte in field names;
//! response shapes are lenient and keep any property they do not model in
//! `extra` so callers can still see the full remote representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ORIGIN_TAG_NAME: &str = "origin";
pub const ORIGIN_TAG_VALUE: &str = "Sentinel TH Integration";
pub const ORIGIN_LABEL: &str = "Sentinel TH Integration";
pub const EXTID_TAG_NAME: &str = "extid";
pub const TACTICS_TAG_NAME: &str = "tactics";
pub const TECHNIQUES_TAG_NAME: &str = "techniques";
pub const HUNT_QUERY_CATEGORY: &str = "Hunt Queries";
pub const RELATED_RESOURCE_TYPE: &str = "Microsoft.OperationalInsights/savedSearches";
pub const NEW_STATUS: &str = "New";

/// Remote field-length limit of a saved search tag value.
pub const TECHNIQUES_MAX_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `{ value: [...], nextLink }` envelope returned by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// A hunting query (saved search).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: SavedSearchProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SavedSearch {
    pub fn display_name(&self) -> &str {
        self.properties.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.properties
            .tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hunt {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: HuntProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Hunt {
    pub fn display_name(&self) -> &str {
        self.properties.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Directed link from a hunt to a saved search. Deleting it leaves the
/// saved search in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HuntRelation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: HuntRelationProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntRelationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resource_type: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What the caller supplies to create a hunting query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuerySpec {
    pub display_name: String,
    pub query: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extid: Option<String>,
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
}

impl QuerySpec {
    pub fn new(display_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    /// Origin and external-ID tags always come first, tactics and techniques
    /// follow only when present.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = vec![
            Tag::new(ORIGIN_TAG_NAME, ORIGIN_TAG_VALUE),
            Tag::new(EXTID_TAG_NAME, self.extid.clone().unwrap_or_default()),
        ];

        let tactics = clean_tactics(&self.tactics.join(","));
        if !tactics.is_empty() {
            tags.push(Tag::new(TACTICS_TAG_NAME, tactics));
        }

        let techniques = self.techniques.join(",");
        if !techniques.is_empty() {
            tags.push(Tag::new(
                TECHNIQUES_TAG_NAME,
                truncate_to_last_comma(&techniques, TECHNIQUES_MAX_LEN),
            ));
        }

        tags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HuntSpec {
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl HuntSpec {
    pub fn new(display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// Body of `PUT .../savedSearches/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SavedSearchRequest {
    pub properties: SavedSearchRequestProperties,
    pub etag: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchRequestProperties {
    pub category: String,
    pub display_name: String,
    pub query: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<Tag>,
}

impl From<&QuerySpec> for SavedSearchRequest {
    fn from(spec: &QuerySpec) -> Self {
        Self {
            properties: SavedSearchRequestProperties {
                category: HUNT_QUERY_CATEGORY.to_string(),
                display_name: spec.display_name.clone(),
                query: spec.query.clone(),
                status: NEW_STATUS.to_string(),
                description: spec.description.clone(),
                tags: spec.tags(),
            },
            etag: "*".to_string(),
        }
    }
}

/// Body of `PUT .../hunts/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct HuntRequest {
    pub properties: HuntRequestProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntRequestProperties {
    pub display_name: String,
    pub description: String,
    pub status: String,
    pub labels: Vec<String>,
}

impl From<&HuntSpec> for HuntRequest {
    fn from(spec: &HuntSpec) -> Self {
        Self {
            properties: HuntRequestProperties {
                display_name: spec.display_name.clone(),
                description: spec.description.clone(),
                status: NEW_STATUS.to_string(),
                labels: vec![ORIGIN_LABEL.to_string()],
            },
        }
    }
}

/// Body of `PUT .../hunts/{huntId}/relations/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct RelationRequest {
    pub properties: RelationRequestProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRequestProperties {
    pub related_resource_id: String,
    pub related_resource_type: String,
    pub labels: Vec<String>,
}

impl RelationRequest {
    pub fn to_saved_search(query_resource_id: impl Into<String>) -> Self {
        Self {
            properties: RelationRequestProperties {
                related_resource_id: query_resource_id.into(),
                related_resource_type: RELATED_RESOURCE_TYPE.to_string(),
                labels: vec![ORIGIN_LABEL.to_string()],
            },
        }
    }
}

/// Strips whitespace and fixes the `CommandandControl` spelling the service
/// rejects.
pub fn clean_tactics(tactics: &str) -> String {
    tactics
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace("CommandandControl", "CommandAndControl")
}

/// Cuts `value` to at most `max_len` characters, backing off to the last
/// comma inside that window (the comma itself is dropped). Without a comma
/// the value is hard-truncated.
pub fn truncate_to_last_comma(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }

    let window: String = value.chars().take(max_len).collect();
    match window.rfind(',') {
        Some(idx) => window[..idx].to_string(),
        None => window,
    }
}
