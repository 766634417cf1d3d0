//! Site settings: one document per category, created lazily from a static
//! table of defaults and updated by merging supplied fields.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    document_db::{Document, DocumentDb},
    error::{CmsError, CmsResult},
    resource::require,
};

/// Stored body of a settings document.
pub type SettingsBody = Map<String, Value>;

/// Default value of one settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Flag(bool),
    /// "© <current year> Portfolio. All rights reserved."
    CopyrightNotice,
}

impl DefaultValue {
    fn to_json(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.to_string()),
            Self::Flag(flag) => Value::Bool(flag),
            Self::CopyrightNotice => Value::String(format!(
                "© {} Portfolio. All rights reserved.",
                Utc::now().year()
            )),
        }
    }
}

const GENERAL_DEFAULTS: &[(&str, DefaultValue)] = &[
    ("siteTitle", DefaultValue::Text("Portfolio & Blog")),
    (
        "siteDescription",
        DefaultValue::Text("Full Stack Developer specializing in Next.js and TypeScript"),
    ),
    ("contactEmail", DefaultValue::Text("contact@example.com")),
    ("phoneNumber", DefaultValue::Text("")),
    ("location", DefaultValue::Text("")),
    ("resumeUrl", DefaultValue::Text("")),
    ("footerText", DefaultValue::CopyrightNotice),
];

const SOCIAL_DEFAULTS: &[(&str, DefaultValue)] = &[
    ("github", DefaultValue::Text("https://github.com")),
    ("linkedin", DefaultValue::Text("https://linkedin.com")),
    ("twitter", DefaultValue::Text("https://twitter.com")),
    ("instagram", DefaultValue::Text("")),
    ("facebook", DefaultValue::Text("")),
    ("youtube", DefaultValue::Text("")),
];

const PREFERENCE_DEFAULTS: &[(&str, DefaultValue)] = &[
    ("enableBlog", DefaultValue::Flag(true)),
    ("enableComments", DefaultValue::Flag(true)),
    ("enableDarkMode", DefaultValue::Flag(true)),
    ("enableAnalytics", DefaultValue::Flag(false)),
    ("maintenanceMode", DefaultValue::Flag(false)),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub site_title: String,
    pub site_description: String,
    pub contact_email: String,
    pub phone_number: String,
    pub location: String,
    pub resume_url: String,
    pub footer_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSettings {
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    pub instagram: String,
    pub facebook: String,
    pub youtube: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSettings {
    pub enable_blog: bool,
    pub enable_comments: bool,
    pub enable_dark_mode: bool,
    pub enable_analytics: bool,
    pub maintenance_mode: bool,
}

/// Settings partition. Each category maps to its own singleton collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsCategory {
    General,
    Social,
    Preferences,
}

impl SettingsCategory {
    pub const ALL: [Self; 3] = [Self::General, Self::Social, Self::Preferences];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Social => "social",
            Self::Preferences => "preferences",
        }
    }

    /// Model name used in validation messages.
    pub fn model(self) -> &'static str {
        match self {
            Self::General => "GeneralSettings",
            Self::Social => "SocialSettings",
            Self::Preferences => "PreferenceSettings",
        }
    }

    /// Singleton collection backing the category.
    pub fn collection(self) -> &'static str {
        match self {
            Self::General => "general_settings",
            Self::Social => "social_settings",
            Self::Preferences => "preference_settings",
        }
    }

    pub fn defaults(self) -> &'static [(&'static str, DefaultValue)] {
        match self {
            Self::General => GENERAL_DEFAULTS,
            Self::Social => SOCIAL_DEFAULTS,
            Self::Preferences => PREFERENCE_DEFAULTS,
        }
    }

    fn has_field(self, field: &str) -> bool {
        self.defaults().iter().any(|(name, _)| *name == field)
    }

    fn default_body(self) -> SettingsBody {
        self.defaults()
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.to_json()))
            .collect()
    }

    /// Type-checks a merged body against the category schema.
    fn validate(self, body: &SettingsBody) -> CmsResult<()> {
        let value = Value::Object(body.clone());
        let model = self.model();
        let invalid = |err: serde_json::Error| CmsError::validation(model, err);
        match self {
            Self::General => {
                let general: GeneralSettings = serde_json::from_value(value).map_err(invalid)?;
                require(model, "siteTitle", &general.site_title)?;
                require(model, "siteDescription", &general.site_description)?;
                require(model, "contactEmail", &general.contact_email)?;
                require(model, "footerText", &general.footer_text)?;
            },
            Self::Social => {
                serde_json::from_value::<SocialSettings>(value).map_err(invalid)?;
            },
            Self::Preferences => {
                serde_json::from_value::<PreferenceSettings>(value).map_err(invalid)?;
            },
        }
        Ok(())
    }
}

impl FromStr for SettingsCategory {
    type Err = CmsError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == name)
            .ok_or_else(|| CmsError::InvalidCategory(name.to_string()))
    }
}

impl fmt::Display for SettingsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All three settings documents, as served by `GET /api/settings`.
#[derive(Debug, Clone, Serialize)]
pub struct AllSettings {
    pub general: Document<SettingsBody>,
    pub social: Document<SettingsBody>,
    pub preferences: Document<SettingsBody>,
}

#[derive(Clone)]
pub struct SettingsStore {
    db: DocumentDb,
}

impl SettingsStore {
    pub fn new(db: DocumentDb) -> Self {
        Self { db }
    }

    /// Creates the three singleton collections.
    pub async fn ensure_schema(&self) -> CmsResult<()> {
        for category in SettingsCategory::ALL {
            self.db.ensure_singleton(category.collection()).await?;
        }
        Ok(())
    }

    /// Returns the category document, creating it from defaults on first
    /// access. Never reports "not found".
    pub async fn get(&self, category: SettingsCategory) -> CmsResult<Document<SettingsBody>> {
        let (document, created) = self
            .db
            .find_or_insert_singleton(category.collection(), &category.default_body())
            .await?;
        if created {
            tracing::info!(category = %category, id = %document.id, "settings created from defaults");
        }
        Ok(document)
    }

    pub async fn get_by_name(&self, name: &str) -> CmsResult<Document<SettingsBody>> {
        self.get(name.parse()?).await
    }

    pub async fn get_all(&self) -> CmsResult<AllSettings> {
        Ok(AllSettings {
            general: self.get(SettingsCategory::General).await?,
            social: self.get(SettingsCategory::Social).await?,
            preferences: self.get(SettingsCategory::Preferences).await?,
        })
    }

    /// Merges the supplied fields into the category document, creating it
    /// from defaults first if absent. Keys outside the category schema are
    /// ignored; type errors and blanked required fields fail the whole
    /// update and leave the stored document unchanged.
    pub async fn update(
        &self,
        category: SettingsCategory,
        patch: SettingsBody,
    ) -> CmsResult<Document<SettingsBody>> {
        let patch: SettingsBody = patch
            .into_iter()
            .filter(|(field, _)| category.has_field(field))
            .collect();
        let document = self
            .db
            .upsert_singleton(
                category.collection(),
                &category.default_body(),
                move |mut body: SettingsBody| {
                    body.extend(patch);
                    category.validate(&body)?;
                    Ok(body)
                },
            )
            .await?;
        tracing::info!(category = %category, "settings updated");
        Ok(document)
    }

    pub async fn update_by_name(
        &self,
        name: &str,
        patch: SettingsBody,
    ) -> CmsResult<Document<SettingsBody>> {
        self.update(name.parse()?, patch).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn store() -> SettingsStore {
        let db = DocumentDb::open_in_memory().await.expect("open db");
        let store = SettingsStore::new(db);
        store.ensure_schema().await.expect("ensure schema");
        store
    }

    fn body(value: Value) -> SettingsBody {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn get_is_idempotent_per_category() {
        let store = store().await;
        for category in SettingsCategory::ALL {
            let first = store.get(category).await.expect("first get");
            let second = store.get(category).await.expect("second get");
            assert_eq!(first.id, second.id, "{category} must resolve to one document");
        }
    }

    #[tokio::test]
    async fn first_access_populates_defaults() {
        let store = store().await;
        let general = store.get(SettingsCategory::General).await.expect("general");
        assert_eq!(general.data["siteTitle"], "Portfolio & Blog");
        let footer = general.data["footerText"].as_str().expect("footer text");
        assert!(footer.starts_with("© ") && footer.ends_with("Portfolio. All rights reserved."));

        let preferences = store
            .get(SettingsCategory::Preferences)
            .await
            .expect("preferences");
        assert_eq!(preferences.data["enableAnalytics"], false);
        assert_eq!(preferences.data["enableBlog"], true);
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let store = store().await;
        let before = store.get(SettingsCategory::General).await.expect("general");
        let updated = store
            .update(
                SettingsCategory::General,
                body(json!({ "siteTitle": "Ada's Corner" })),
            )
            .await
            .expect("update");
        assert_eq!(updated.id, before.id);
        assert_eq!(updated.data["siteTitle"], "Ada's Corner");
        assert_eq!(updated.data["contactEmail"], before.data["contactEmail"]);
    }

    #[tokio::test]
    async fn update_creates_missing_document_with_defaults() {
        let store = store().await;
        let updated = store
            .update(
                SettingsCategory::Social,
                body(json!({ "github": "https://github.com/ada", "unknown": 1 })),
            )
            .await
            .expect("upsert");
        assert_eq!(updated.data["github"], "https://github.com/ada");
        assert_eq!(updated.data["linkedin"], "https://linkedin.com");
        assert!(updated.data.get("unknown").is_none());

        let fetched = store.get(SettingsCategory::Social).await.expect("get");
        assert_eq!(fetched.id, updated.id);
    }

    #[tokio::test]
    async fn type_mismatch_is_rejected_and_not_stored() {
        let store = store().await;
        let err = store
            .update(
                SettingsCategory::Preferences,
                body(json!({ "enableBlog": "yes" })),
            )
            .await
            .expect_err("string is not a flag");
        assert!(matches!(err, CmsError::Validation(_)));

        let stored = store
            .get(SettingsCategory::Preferences)
            .await
            .expect("preferences");
        assert_eq!(stored.data["enableBlog"], true);
    }

    #[tokio::test]
    async fn blank_required_field_is_rejected() {
        let store = store().await;
        let err = store
            .update(SettingsCategory::General, body(json!({ "siteTitle": "" })))
            .await
            .expect_err("required field");
        assert_eq!(
            err.to_string(),
            "GeneralSettings validation failed: siteTitle is required"
        );
    }

    #[tokio::test]
    async fn unknown_category_name_is_invalid() {
        let store = store().await;
        let err = store.get_by_name("theme").await.expect_err("no such category");
        assert!(matches!(err, CmsError::InvalidCategory(ref name) if name == "theme"));
        let err = store
            .update_by_name("theme", SettingsBody::new())
            .await
            .expect_err("no such category");
        assert!(matches!(err, CmsError::InvalidCategory(_)));
    }

    #[tokio::test]
    async fn concurrent_first_access_creates_one_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.db");
        let seed = DocumentDb::open(&path).await.expect("open seed");
        SettingsStore::new(seed).ensure_schema().await.expect("schema");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = DocumentDb::open(&path).await.expect("open connection");
            let store = SettingsStore::new(db);
            handles.push(tokio::spawn(async move {
                store.get(SettingsCategory::General).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            let document = handle.await.expect("join").expect("get settings");
            ids.push(document.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "every caller must observe the same document");

        let db = DocumentDb::open(&path).await.expect("reopen");
        let rows = db
            .count(SettingsCategory::General.collection(), vec![])
            .await
            .expect("count");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn concurrent_first_updates_merge_into_one_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.db");
        let seed = DocumentDb::open(&path).await.expect("open seed");
        SettingsStore::new(seed).ensure_schema().await.expect("schema");

        let patches = [
            ("github", "https://github.com/ada"),
            ("linkedin", "https://linkedin.com/in/ada"),
            ("twitter", "https://twitter.com/ada"),
            ("instagram", "https://instagram.com/ada"),
            ("facebook", "https://facebook.com/ada"),
            ("youtube", "https://youtube.com/@ada"),
        ];
        let mut handles = Vec::new();
        for (field, value) in patches {
            let db = DocumentDb::open(&path).await.expect("open connection");
            let store = SettingsStore::new(db);
            handles.push(tokio::spawn(async move {
                store
                    .update(SettingsCategory::Social, body(json!({ field: value })))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            let document = handle.await.expect("join").expect("update settings");
            ids.push(document.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "every update must land on the same document");

        let db = DocumentDb::open(&path).await.expect("reopen");
        let rows = db
            .count(SettingsCategory::Social.collection(), vec![])
            .await
            .expect("count");
        assert_eq!(rows, 1);

        let stored = SettingsStore::new(db)
            .get(SettingsCategory::Social)
            .await
            .expect("social");
        for (field, value) in patches {
            assert_eq!(stored.data[field], value, "{field} patch was lost");
        }
    }
}
