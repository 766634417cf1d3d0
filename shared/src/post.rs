use serde::{Deserialize, Serialize};

use crate::{
    document_db::{CollectionSpec, Predicate, SortOrder},
    error::CmsResult,
    resource::{
        replace_if_set, replace_optional, require, Conflict, Publishable, Resource, UniqueKey,
    },
};

/// Lifecycle of a post or project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Published,
    #[default]
    Draft,
    Archived,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }
}

/// Filter shared by the post and project listings. Every field is optional
/// and the set ones are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub status: Option<String>,
    pub featured: Option<bool>,
    /// Matches documents whose `tags` contain the value.
    pub tag: Option<String>,
}

impl ContentFilter {
    pub fn published() -> Self {
        Self {
            status: Some(PublishStatus::Published.as_str().to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(status) = &self.status {
            predicates.push(Predicate::Eq("status", status.clone()));
        }
        if let Some(featured) = self.featured {
            predicates.push(Predicate::Flag("featured", featured));
        }
        if let Some(tag) = &self.tag {
            predicates.push(Predicate::Contains("tags", tag.clone()));
        }
        predicates
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Blog post. `content` holds the raw markdown body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication date, ISO 8601.
    pub date: String,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub date: Option<String>,
    pub status: Option<PublishStatus>,
    pub author: Option<Author>,
    pub reading_time: Option<u32>,
    pub featured: Option<bool>,
}

fn post_slug(post: &Post) -> &str {
    &post.slug
}

impl Resource for Post {
    const MODEL: &'static str = "Post";
    const PLURAL: &'static str = "posts";
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "posts",
        unique_fields: &["slug"],
    };
    const UNIQUE_KEYS: &'static [UniqueKey<Self>] = &[UniqueKey {
        field: "slug",
        conflict: Conflict::Slug,
        value: post_slug,
    }];
    const SORT: SortOrder = SortOrder::Descending("date");
    const DEFAULT_LIMIT: u64 = 10;

    type Draft = Post;
    type Patch = PostPatch;
    type Filter = ContentFilter;

    fn from_draft(draft: Self::Draft) -> Self {
        draft
    }

    fn apply_patch(&mut self, patch: PostPatch) {
        replace_if_set(&mut self.title, patch.title);
        replace_if_set(&mut self.slug, patch.slug);
        replace_if_set(&mut self.excerpt, patch.excerpt);
        replace_if_set(&mut self.content, patch.content);
        replace_if_set(&mut self.image, patch.image);
        replace_if_set(&mut self.tags, patch.tags);
        replace_if_set(&mut self.date, patch.date);
        replace_if_set(&mut self.status, patch.status);
        replace_optional(&mut self.author, patch.author);
        replace_optional(&mut self.reading_time, patch.reading_time);
        replace_if_set(&mut self.featured, patch.featured);
    }

    fn validate(&self) -> CmsResult<()> {
        require(Self::MODEL, "title", &self.title)?;
        require(Self::MODEL, "slug", &self.slug)?;
        require(Self::MODEL, "excerpt", &self.excerpt)?;
        require(Self::MODEL, "content", &self.content)?;
        require(Self::MODEL, "image", &self.image)?;
        require(Self::MODEL, "date", &self.date)
    }

    fn predicates(filter: &ContentFilter) -> Vec<Predicate> {
        filter.predicates()
    }
}

impl Publishable for Post {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{error::CmsError, resource::parse_body};

    fn body() -> serde_json::Value {
        json!({
            "title": "Hello",
            "slug": "hello",
            "excerpt": "Short",
            "content": "# Hello",
            "image": "/hello.png",
            "date": "2024-05-01"
        })
    }

    #[test]
    fn draft_applies_defaults() {
        let post: Post = parse_body("Post", body()).expect("valid body");
        assert_eq!(post.status, PublishStatus::Draft);
        assert!(!post.featured);
        assert!(post.tags.is_empty());
        assert!(post.validate().is_ok());
    }

    #[test]
    fn missing_required_field_is_validation_error() {
        let mut value = body();
        value.as_object_mut().expect("object").remove("excerpt");
        let err = parse_body::<Post>("Post", value).expect_err("excerpt missing");
        assert!(matches!(err, CmsError::Validation(ref msg) if msg.contains("excerpt")));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut value = body();
        value["status"] = json!("deleted");
        assert!(parse_body::<Post>("Post", value).is_err());
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut post: Post = parse_body("Post", body()).expect("valid body");
        let patch: PostPatch = parse_body(
            "Post",
            json!({ "title": "Renamed", "featured": true, "readingTime": 4 }),
        )
        .expect("valid patch");
        post.apply_patch(patch);
        assert_eq!(post.title, "Renamed");
        assert!(post.featured);
        assert_eq!(post.reading_time, Some(4));
        assert_eq!(post.slug, "hello");
        assert_eq!(post.content, "# Hello");
    }

    #[test]
    fn patch_to_blank_title_fails_validation() {
        let mut post: Post = parse_body("Post", body()).expect("valid body");
        post.apply_patch(PostPatch {
            title: Some(String::new()),
            ..PostPatch::default()
        });
        assert!(post.validate().is_err());
    }

    #[test]
    fn filter_builds_conjunction() {
        let filter = ContentFilter {
            status: Some("published".to_string()),
            featured: Some(true),
            tag: Some("rust".to_string()),
        };
        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::Eq("status", "published".to_string()),
                Predicate::Flag("featured", true),
                Predicate::Contains("tags", "rust".to_string()),
            ]
        );
        assert!(ContentFilter::default().predicates().is_empty());
    }
}
