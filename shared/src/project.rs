use serde::{Deserialize, Serialize};

use crate::{
    document_db::{CollectionSpec, Predicate, SortOrder},
    error::CmsResult,
    post::{ContentFilter, PublishStatus},
    resource::{
        replace_if_set, replace_optional, require, Conflict, Publishable, Resource, UniqueKey,
    },
};

/// Portfolio project with its case-study fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub image: String,
    /// Image URLs in display order.
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub date: String,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub image: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub demo_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: Option<bool>,
    pub date: Option<String>,
    pub status: Option<PublishStatus>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub role: Option<String>,
    pub client: Option<String>,
    pub duration: Option<String>,
}

fn project_slug(project: &Project) -> &str {
    &project.slug
}

impl Resource for Project {
    const MODEL: &'static str = "Project";
    const PLURAL: &'static str = "projects";
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "projects",
        unique_fields: &["slug"],
    };
    const UNIQUE_KEYS: &'static [UniqueKey<Self>] = &[UniqueKey {
        field: "slug",
        conflict: Conflict::Slug,
        value: project_slug,
    }];
    const SORT: SortOrder = SortOrder::Descending("date");
    const DEFAULT_LIMIT: u64 = 10;

    type Draft = Project;
    type Patch = ProjectPatch;
    type Filter = ContentFilter;

    fn from_draft(draft: Self::Draft) -> Self {
        draft
    }

    fn apply_patch(&mut self, patch: ProjectPatch) {
        replace_if_set(&mut self.title, patch.title);
        replace_if_set(&mut self.slug, patch.slug);
        replace_if_set(&mut self.description, patch.description);
        replace_optional(&mut self.long_description, patch.long_description);
        replace_if_set(&mut self.image, patch.image);
        replace_if_set(&mut self.gallery, patch.gallery);
        replace_if_set(&mut self.tags, patch.tags);
        replace_optional(&mut self.demo_url, patch.demo_url);
        replace_optional(&mut self.github_url, patch.github_url);
        replace_if_set(&mut self.featured, patch.featured);
        replace_if_set(&mut self.date, patch.date);
        replace_if_set(&mut self.status, patch.status);
        replace_optional(&mut self.problem, patch.problem);
        replace_optional(&mut self.solution, patch.solution);
        replace_if_set(&mut self.technologies, patch.technologies);
        replace_optional(&mut self.role, patch.role);
        replace_optional(&mut self.client, patch.client);
        replace_optional(&mut self.duration, patch.duration);
    }

    fn validate(&self) -> CmsResult<()> {
        require(Self::MODEL, "title", &self.title)?;
        require(Self::MODEL, "slug", &self.slug)?;
        require(Self::MODEL, "description", &self.description)?;
        require(Self::MODEL, "image", &self.image)?;
        require(Self::MODEL, "date", &self.date)
    }

    fn predicates(filter: &ContentFilter) -> Vec<Predicate> {
        filter.predicates()
    }
}

impl Publishable for Project {}
