use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    document_db::{CollectionSpec, Predicate, SortOrder},
    error::CmsResult,
    resource::{require, Resource, UniqueKey},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Metadata for an uploaded asset. The file itself lives wherever `url`
/// points; nothing is stored here but the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Set once at creation, RFC 3339.
    pub uploaded_at: String,
}

/// Create payload. `uploadedAt` is always stamped by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedia {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<u64>,
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaFilter {
    pub kind: Option<String>,
}

impl Resource for Media {
    const MODEL: &'static str = "Media";
    const PLURAL: &'static str = "media";
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "media",
        unique_fields: &[],
    };
    const UNIQUE_KEYS: &'static [UniqueKey<Self>] = &[];
    const SORT: SortOrder = SortOrder::Descending("uploadedAt");
    const DEFAULT_LIMIT: u64 = 20;

    type Draft = NewMedia;
    type Patch = MediaPatch;
    type Filter = MediaFilter;

    fn from_draft(draft: NewMedia) -> Self {
        Self {
            name: draft.name,
            url: draft.url,
            kind: draft.kind,
            size: draft.size,
            dimensions: draft.dimensions,
            uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn apply_patch(&mut self, patch: MediaPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if patch.dimensions.is_some() {
            self.dimensions = patch.dimensions;
        }
    }

    fn validate(&self) -> CmsResult<()> {
        require(Self::MODEL, "name", &self.name)?;
        require(Self::MODEL, "url", &self.url)?;
        require(Self::MODEL, "type", &self.kind)
    }

    fn predicates(filter: &MediaFilter) -> Vec<Predicate> {
        filter
            .kind
            .iter()
            .map(|kind| Predicate::Eq("type", kind.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resource::parse_body;

    #[test]
    fn create_stamps_upload_time_and_ignores_client_value() {
        let draft: NewMedia = parse_body(
            "Media",
            json!({
                "name": "hero.png",
                "url": "https://cdn.example.com/hero.png",
                "type": "image/png",
                "size": 2048,
                "uploadedAt": "1999-01-01T00:00:00Z"
            }),
        )
        .expect("valid media");
        let media = Media::from_draft(draft);
        assert_ne!(media.uploaded_at, "1999-01-01T00:00:00Z");
        assert!(media.uploaded_at.ends_with('Z'));
        assert!(media.validate().is_ok());
    }

    #[test]
    fn negative_size_is_rejected() {
        let result = parse_body::<NewMedia>(
            "Media",
            json!({ "name": "a", "url": "/a", "type": "image/png", "size": -1 }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn patch_cannot_move_upload_time() {
        let mut media = Media::from_draft(NewMedia {
            name: "a".to_string(),
            url: "/a".to_string(),
            kind: "image/png".to_string(),
            size: 1,
            dimensions: None,
        });
        let uploaded_at = media.uploaded_at.clone();
        let patch: MediaPatch = parse_body(
            "Media",
            json!({ "name": "b", "uploadedAt": "2000-01-01T00:00:00Z" }),
        )
        .expect("valid patch");
        media.apply_patch(patch);
        assert_eq!(media.name, "b");
        assert_eq!(media.uploaded_at, uploaded_at);
    }

    #[test]
    fn type_filter_maps_to_equality() {
        let filter = MediaFilter {
            kind: Some("video/mp4".to_string()),
        };
        assert_eq!(
            Media::predicates(&filter),
            vec![Predicate::Eq("type", "video/mp4".to_string())]
        );
    }
}
