//! The create/read/update/delete contract shared by posts, projects, media and
//! users. Each model plugs its fields, defaults, filters and unique keys into
//! [`Resource`]; [`ResourceStore`] runs the common flow against the
//! [`DocumentDb`].

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{
    document_db::{CollectionSpec, Document, DocumentDb, FindQuery, Predicate, SortOrder},
    error::{CmsError, CmsResult},
};

/// Maximum number of items returned by a featured listing.
pub const FEATURED_LIMIT: u64 = 6;

/// Which duplicate error a unique key raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Slug,
    User,
    Email,
}

impl Conflict {
    /// The client-facing error for this conflict.
    pub fn error(self) -> CmsError {
        match self {
            Self::Slug => CmsError::DuplicateSlug,
            Self::User => CmsError::DuplicateUser,
            Self::Email => CmsError::DuplicateEmail,
        }
    }
}

/// A field that must be unique across a collection.
pub struct UniqueKey<R> {
    pub field: &'static str,
    pub conflict: Conflict,
    pub value: fn(&R) -> &str,
}

/// A document type managed through [`ResourceStore`].
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Singular model name used in messages ("Post not found").
    const MODEL: &'static str;
    /// Key of the list envelope (`{"posts": [...]}`).
    const PLURAL: &'static str;
    const COLLECTION: CollectionSpec;
    /// Checked in order before writes; the first hit decides the error.
    const UNIQUE_KEYS: &'static [UniqueKey<Self>];
    const SORT: SortOrder;
    const DEFAULT_LIMIT: u64;

    /// Create payload.
    type Draft: DeserializeOwned + Send;
    /// Partial update payload. Absent fields leave the document untouched.
    type Patch: DeserializeOwned + Send;
    /// List filter.
    type Filter: Default + Send + Sync;

    /// Builds a new record, filling defaults for unset optional fields.
    fn from_draft(draft: Self::Draft) -> Self;

    /// Merges the supplied fields of `patch` into `self`.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Checks required fields and value constraints.
    fn validate(&self) -> CmsResult<()>;

    /// Translates a list filter into store predicates.
    fn predicates(filter: &Self::Filter) -> Vec<Predicate>;
}

/// Slug-addressed models with a publication status and a featured flag.
pub trait Publishable: Resource {}

/// Fails with a validation error when a required text field is blank.
pub fn require(model: &str, field: &str, value: &str) -> CmsResult<()> {
    if value.trim().is_empty() {
        return Err(CmsError::validation(model, format!("{field} is required")));
    }
    Ok(())
}

/// Overwrites `slot` when the patch supplied a value.
pub(crate) fn replace_if_set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Overwrites an optional field when the patch supplied a value. An absent
/// value never clears the field.
pub(crate) fn replace_optional<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Decodes a JSON request body, reporting type and presence errors as
/// validation failures of `model`.
pub fn parse_body<T: DeserializeOwned>(model: &str, body: Value) -> CmsResult<T> {
    serde_json::from_value(body).map_err(|err| CmsError::validation(model, err))
}

/// Requested page of a list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Applies the resource default for a missing limit and rejects zero.
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> CmsResult<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page == 0 {
            return Err(CmsError::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 {
            return Err(CmsError::Validation("limit must be at least 1".to_string()));
        }
        Ok(Self { page, limit })
    }

    /// Number of documents to skip.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Documents matching the filter, ignoring pagination.
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

impl Pagination {
    fn new(total: u64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            pages: total.div_ceil(request.limit),
        }
    }
}

/// One page of documents plus pagination metadata. Serializes as
/// `{ "<plural>": [...], "pagination": {...} }`.
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub items: Vec<Document<R>>,
    pub pagination: Pagination,
}

impl<R: Resource> Serialize for Page<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(R::PLURAL, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

/// Runs the shared CRUD flow for one resource type.
pub struct ResourceStore<R> {
    db: DocumentDb,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceStore<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(db: DocumentDb) -> Self {
        Self {
            db,
            _resource: PhantomData,
        }
    }

    /// Creates the backing collection and its unique indexes.
    pub async fn ensure_schema(&self) -> CmsResult<()> {
        self.db.ensure_collection(R::COLLECTION).await
    }

    pub async fn count(&self) -> CmsResult<u64> {
        self.db.count(R::COLLECTION.name, vec![]).await
    }

    /// Filtered page ordered by the resource sort key. `total` always counts
    /// the whole filtered set.
    pub async fn list(&self, filter: &R::Filter, request: PageRequest) -> CmsResult<Page<R>> {
        let predicates = R::predicates(filter);
        let total = self.db.count(R::COLLECTION.name, predicates.clone()).await?;
        let items = self
            .db
            .find(
                R::COLLECTION.name,
                FindQuery {
                    predicates,
                    sort: R::SORT,
                    skip: request.skip(),
                    limit: Some(request.limit),
                },
            )
            .await?;
        Ok(Page {
            items,
            pagination: Pagination::new(total, request),
        })
    }

    pub async fn get_by_id(&self, id: &str) -> CmsResult<Document<R>> {
        self.db
            .find_by_id(R::COLLECTION.name, id)
            .await?
            .ok_or(CmsError::NotFound(R::MODEL))
    }

    /// Exact lookup on a top-level text field.
    pub async fn get_by_field(&self, field: &'static str, value: &str) -> CmsResult<Document<R>> {
        self.db
            .find_one(R::COLLECTION.name, vec![Predicate::Eq(field, value.to_string())])
            .await?
            .ok_or(CmsError::NotFound(R::MODEL))
    }

    /// Decodes a raw create body and stores it. Unique keys present in the
    /// body are checked before decoding, so a taken slug or email is reported
    /// even when other fields are missing or invalid.
    pub async fn create_from_body(&self, body: Value) -> CmsResult<Document<R>> {
        for key in R::UNIQUE_KEYS {
            if let Some(value) = body.get(key.field).and_then(Value::as_str) {
                self.ensure_value_unused(key, value, None).await?;
            }
        }
        self.create(parse_body(R::MODEL, body)?).await
    }

    /// Unique keys are checked in declaration order before the record is
    /// validated.
    pub async fn create(&self, draft: R::Draft) -> CmsResult<Document<R>> {
        let record = R::from_draft(draft);
        for key in R::UNIQUE_KEYS {
            self.ensure_value_unused(key, (key.value)(&record), None).await?;
        }
        record.validate()?;
        let created = self
            .db
            .insert(R::COLLECTION.name, &record)
            .await
            .map_err(translate_violation::<R>)?;
        tracing::info!(model = R::MODEL, id = %created.id, "document created");
        Ok(created)
    }

    /// Merges `patch` into the stored document. Unique keys whose value
    /// changed are re-checked against every other document.
    pub async fn update(&self, id: &str, patch: R::Patch) -> CmsResult<Document<R>> {
        let current = self.get_by_id(id).await?;
        let mut next = current.data.clone();
        next.apply_patch(patch);
        next.validate()?;
        for key in R::UNIQUE_KEYS {
            if (key.value)(&next) != (key.value)(&current.data) {
                self.ensure_value_unused(key, (key.value)(&next), Some(&current.id))
                    .await?;
            }
        }
        self.db
            .replace(R::COLLECTION.name, &current.id, &next)
            .await
            .map_err(translate_violation::<R>)?
            .ok_or(CmsError::NotFound(R::MODEL))
    }

    pub async fn delete(&self, id: &str) -> CmsResult<()> {
        if !self.db.delete(R::COLLECTION.name, id).await? {
            return Err(CmsError::NotFound(R::MODEL));
        }
        tracing::info!(model = R::MODEL, id, "document removed");
        Ok(())
    }

    async fn ensure_value_unused(
        &self,
        key: &UniqueKey<R>,
        value: &str,
        exclude_id: Option<&str>,
    ) -> CmsResult<()> {
        let mut predicates = vec![Predicate::Eq(key.field, value.to_string())];
        if let Some(id) = exclude_id {
            predicates.push(Predicate::NotId(id.to_string()));
        }
        if self.db.exists(R::COLLECTION.name, predicates).await? {
            return Err(key.conflict.error());
        }
        Ok(())
    }
}

impl<R: Publishable> ResourceStore<R> {
    pub async fn get_by_slug(&self, slug: &str) -> CmsResult<Document<R>> {
        self.get_by_field("slug", slug).await
    }

    /// Published, featured documents, newest first, capped at
    /// [`FEATURED_LIMIT`].
    pub async fn featured(&self) -> CmsResult<Vec<Document<R>>> {
        self.db
            .find(
                R::COLLECTION.name,
                FindQuery {
                    predicates: vec![
                        Predicate::Flag("featured", true),
                        Predicate::Eq("status", "published".to_string()),
                    ],
                    sort: SortOrder::Descending("date"),
                    skip: 0,
                    limit: Some(FEATURED_LIMIT),
                },
            )
            .await
    }
}

/// Maps a unique index violation raised by the store to the duplicate error
/// of the key that owns the index.
fn translate_violation<R: Resource>(err: CmsError) -> CmsError {
    match err {
        CmsError::UniqueViolation { index } => R::UNIQUE_KEYS
            .iter()
            .find(|key| R::COLLECTION.unique_index_name(key.field) == index)
            .map(|key| key.conflict.error())
            .unwrap_or(CmsError::UniqueViolation { index }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_skip() {
        let request = PageRequest::new(None, None, 10).expect("defaults");
        assert_eq!(request, PageRequest { page: 1, limit: 10 });
        assert_eq!(request.skip(), 0);

        let request = PageRequest::new(Some(3), Some(5), 10).expect("explicit");
        assert_eq!(request.skip(), 10);
    }

    #[test]
    fn page_request_rejects_zero() {
        assert!(matches!(
            PageRequest::new(Some(0), None, 10),
            Err(CmsError::Validation(_))
        ));
        assert!(matches!(
            PageRequest::new(None, Some(0), 10),
            Err(CmsError::Validation(_))
        ));
    }

    #[test]
    fn pages_round_up() {
        let request = PageRequest { page: 2, limit: 5 };
        assert_eq!(Pagination::new(11, request).pages, 3);
        assert_eq!(Pagination::new(10, request).pages, 2);
        assert_eq!(Pagination::new(0, request).pages, 0);
    }

    #[test]
    fn merge_helpers_only_overwrite_supplied_values() {
        let mut title = "Hello".to_string();
        replace_if_set(&mut title, None);
        assert_eq!(title, "Hello");
        replace_if_set(&mut title, Some("Renamed".to_string()));
        assert_eq!(title, "Renamed");

        let mut role = Some("Lead".to_string());
        replace_optional(&mut role, None);
        assert_eq!(role.as_deref(), Some("Lead"));
        replace_optional(&mut role, Some("Editor".to_string()));
        assert_eq!(role.as_deref(), Some("Editor"));
    }

    #[test]
    fn require_rejects_blank() {
        let err = require("Post", "title", "  ").expect_err("blank title");
        assert_eq!(err.to_string(), "Post validation failed: title is required");
        assert!(require("Post", "title", "Hello").is_ok());
    }
}
