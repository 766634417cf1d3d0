//! Embedded document database.
//!
//! Every collection is a SQLite table holding one JSON document per row next
//! to the store-assigned metadata (`id`, `created_at`, `updated_at`). Field
//! predicates, ordering and unique constraints are expressed with
//! `json_extract`, so uniqueness is enforced by the store itself and not by a
//! read-then-write in the caller.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{
    params, params_from_iter, types::Value as SqlValue, Connection, ErrorCode, OptionalExtension,
    TransactionBehavior,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CmsError, CmsResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Table name and unique fields of one document collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// Table name.
    pub name: &'static str,
    /// Top-level document fields carrying a unique index.
    pub unique_fields: &'static [&'static str],
}

impl CollectionSpec {
    /// Name of the unique index created for `field`.
    pub fn unique_index_name(&self, field: &str) -> String {
        format!("{}_{}_unique", self.name, field)
    }
}

/// A stored document together with its store-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub data: T,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One conjunct of a collection query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Text field equals the value.
    Eq(&'static str, String),
    /// Boolean field equals the value.
    Flag(&'static str, bool),
    /// Array field contains the value.
    Contains(&'static str, String),
    /// Document id differs from the value.
    NotId(String),
}

impl Predicate {
    fn push_sql(&self, table: &str, clauses: &mut Vec<String>, values: &mut Vec<SqlValue>) {
        match self {
            Self::Eq(field, value) => {
                clauses.push(format!("json_extract(doc, '$.{field}') = ?"));
                values.push(SqlValue::Text(value.clone()));
            },
            Self::Flag(field, value) => {
                clauses.push(format!("json_extract(doc, '$.{field}') = ?"));
                values.push(SqlValue::Integer(i64::from(*value)));
            },
            Self::Contains(field, value) => {
                clauses.push(format!(
                    "EXISTS (SELECT 1 FROM json_each({table}.doc, '$.{field}') WHERE \
                     json_each.value = ?)"
                ));
                values.push(SqlValue::Text(value.clone()));
            },
            Self::NotId(id) => {
                clauses.push("id <> ?".to_string());
                values.push(SqlValue::Text(id.clone()));
            },
        }
    }
}

/// Result ordering of a collection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Insertion order.
    Native,
    /// Descending by a top-level text field (ISO dates sort lexicographically).
    Descending(&'static str),
}

/// A filtered, ordered, paginated read.
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub predicates: Vec<Predicate>,
    pub sort: SortOrder,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    /// Unsorted, unbounded query over `predicates`.
    pub fn filter(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            sort: SortOrder::Native,
            skip: 0,
            limit: None,
        }
    }
}

struct RawDocument {
    id: String,
    doc: String,
    created_at: i64,
    updated_at: i64,
}

impl RawDocument {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            doc: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    fn decode<T: DeserializeOwned>(self) -> CmsResult<Document<T>> {
        let data = serde_json::from_str(&self.doc)
            .with_context(|| format!("failed to decode stored document {}", self.id))?;
        Ok(Document {
            id: self.id,
            data,
            created_at: ms_to_datetime(self.created_at)?,
            updated_at: ms_to_datetime(self.updated_at)?,
        })
    }
}

/// Handle to the document database. Cheap to clone; every clone shares the
/// same connection.
#[derive(Clone)]
pub struct DocumentDb {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentDb {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> CmsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> anyhow::Result<Connection> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let conn = Connection::open(&path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            configure(&conn)?;
            Ok(conn)
        })
        .await
        .context("database open task panicked")??;
        tracing::info!("document database opened");
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> CmsResult<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        configure(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<R, F>(&self, f: F) -> CmsResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> CmsResult<R> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .context("document store task panicked")?
    }

    /// Creates the collection table and its unique indexes if missing.
    pub async fn ensure_collection(&self, spec: CollectionSpec) -> CmsResult<()> {
        self.with_conn(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    id TEXT PRIMARY KEY,
                    doc TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
                name = spec.name
            ))
            .with_context(|| format!("failed to create collection {}", spec.name))?;
            for field in spec.unique_fields {
                conn.execute_batch(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {name} (json_extract(doc, \
                     '$.{field}'));",
                    index = spec.unique_index_name(field),
                    name = spec.name
                ))
                .with_context(|| format!("failed to index {}.{}", spec.name, field))?;
            }
            Ok(())
        })
        .await?;
        tracing::debug!(collection = spec.name, "collection ensured");
        Ok(())
    }

    /// Creates a collection that can hold at most one document.
    pub async fn ensure_singleton(&self, collection: &'static str) -> CmsResult<()> {
        self.with_conn(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {collection} (
                    singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
                    id TEXT NOT NULL UNIQUE,
                    doc TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );"
            ))
            .with_context(|| format!("failed to create singleton collection {collection}"))?;
            Ok(())
        })
        .await?;
        tracing::debug!(collection, "singleton collection ensured");
        Ok(())
    }

    /// Fetches one document by id.
    pub async fn find_by_id<T>(&self, collection: &'static str, id: &str) -> CmsResult<Option<Document<T>>>
    where
        T: DeserializeOwned,
    {
        let id = id.to_string();
        let raw = self
            .with_conn(move |conn| {
                let raw = conn
                    .query_row(
                        &format!(
                            "SELECT id, doc, created_at, updated_at FROM {collection} WHERE id = ?1"
                        ),
                        params![id],
                        RawDocument::from_row,
                    )
                    .optional()
                    .with_context(|| format!("failed to read {collection} by id"))?;
                Ok(raw)
            })
            .await?;
        raw.map(RawDocument::decode).transpose()
    }

    /// Fetches the first document matching every predicate.
    pub async fn find_one<T>(
        &self,
        collection: &'static str,
        predicates: Vec<Predicate>,
    ) -> CmsResult<Option<Document<T>>>
    where
        T: DeserializeOwned,
    {
        let mut query = FindQuery::filter(predicates);
        query.limit = Some(1);
        Ok(self.find(collection, query).await?.into_iter().next())
    }

    /// Whether any document matches every predicate.
    pub async fn exists(&self, collection: &'static str, predicates: Vec<Predicate>) -> CmsResult<bool> {
        Ok(self.count(collection, predicates).await? > 0)
    }

    /// Counts the documents matching every predicate.
    pub async fn count(&self, collection: &'static str, predicates: Vec<Predicate>) -> CmsResult<u64> {
        self.with_conn(move |conn| {
            let (where_sql, values) = where_clause(collection, &predicates);
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {collection}{where_sql}"),
                    params_from_iter(values),
                    |row| row.get(0),
                )
                .with_context(|| format!("failed to count {collection}"))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    /// Runs a filtered, ordered, paginated read.
    pub async fn find<T>(&self, collection: &'static str, query: FindQuery) -> CmsResult<Vec<Document<T>>>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(collection, ?query, "find");
        let rows = self
            .with_conn(move |conn| {
                let (where_sql, mut values) = where_clause(collection, &query.predicates);
                let order_sql = match query.sort {
                    SortOrder::Native => " ORDER BY rowid".to_string(),
                    SortOrder::Descending(field) => {
                        format!(" ORDER BY json_extract(doc, '$.{field}') DESC, rowid DESC")
                    },
                };
                values.push(SqlValue::Integer(
                    query.limit.map(clamp_i64).unwrap_or(-1),
                ));
                values.push(SqlValue::Integer(clamp_i64(query.skip)));
                let sql = format!(
                    "SELECT id, doc, created_at, updated_at FROM \
                     {collection}{where_sql}{order_sql} LIMIT ? OFFSET ?"
                );
                let mut stmt = conn
                    .prepare(&sql)
                    .with_context(|| format!("failed to prepare query on {collection}"))?;
                let rows = stmt
                    .query_map(params_from_iter(values), RawDocument::from_row)
                    .with_context(|| format!("failed to query {collection}"))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .with_context(|| format!("failed to read rows of {collection}"))?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(RawDocument::decode).collect()
    }

    /// Inserts a new document, assigning its id and timestamps.
    pub async fn insert<T>(&self, collection: &'static str, data: &T) -> CmsResult<Document<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let doc = encode(data)?;
        let raw = self
            .with_conn(move |conn| {
                let id = new_document_id();
                let now = now_ms();
                conn.execute(
                    &format!(
                        "INSERT INTO {collection} (id, doc, created_at, updated_at) VALUES (?1, \
                         ?2, ?3, ?3)"
                    ),
                    params![id, doc, now],
                )
                .map_err(|err| write_error(err, collection, "insert"))?;
                Ok(RawDocument {
                    id,
                    doc,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;
        raw.decode()
    }

    /// Overwrites the body of an existing document. Returns `None` when the
    /// id no longer resolves.
    pub async fn replace<T>(
        &self,
        collection: &'static str,
        id: &str,
        data: &T,
    ) -> CmsResult<Option<Document<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        let doc = encode(data)?;
        let id = id.to_string();
        let raw = self
            .with_conn(move |conn| {
                let changed = conn
                    .execute(
                        &format!("UPDATE {collection} SET doc = ?1, updated_at = ?2 WHERE id = ?3"),
                        params![doc, now_ms(), id],
                    )
                    .map_err(|err| write_error(err, collection, "update"))?;
                if changed == 0 {
                    return Ok(None);
                }
                let raw = conn
                    .query_row(
                        &format!(
                            "SELECT id, doc, created_at, updated_at FROM {collection} WHERE id = ?1"
                        ),
                        params![id],
                        RawDocument::from_row,
                    )
                    .optional()
                    .with_context(|| format!("failed to re-read {collection} after update"))?;
                Ok(raw)
            })
            .await?;
        raw.map(RawDocument::decode).transpose()
    }

    /// Removes a document. Returns whether anything was deleted.
    pub async fn delete(&self, collection: &'static str, id: &str) -> CmsResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn
                .execute(&format!("DELETE FROM {collection} WHERE id = ?1"), params![id])
                .with_context(|| format!("failed to delete from {collection}"))?;
            Ok(removed > 0)
        })
        .await
    }

    /// Returns the single document of `collection`, inserting `defaults`
    /// first when none exists. The insert is a conditional write inside one
    /// immediate transaction, so concurrent first calls converge on one row.
    /// The flag reports whether this call created the document.
    pub async fn find_or_insert_singleton<T>(
        &self,
        collection: &'static str,
        defaults: &T,
    ) -> CmsResult<(Document<T>, bool)>
    where
        T: Serialize + DeserializeOwned,
    {
        let defaults = encode(defaults)?;
        let (raw, created) = self
            .with_conn(move |conn| {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .context("failed to begin singleton transaction")?;
                let created = insert_singleton_if_absent(&tx, collection, &defaults)?;
                let raw = read_singleton(&tx, collection)?;
                tx.commit().context("failed to commit singleton transaction")?;
                Ok((raw, created))
            })
            .await?;
        Ok((raw.decode()?, created))
    }

    /// Atomically creates the singleton from `defaults` if absent, applies
    /// `merge` to its current body and writes the result back.
    pub async fn upsert_singleton<T, F>(
        &self,
        collection: &'static str,
        defaults: &T,
        merge: F,
    ) -> CmsResult<Document<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(T) -> CmsResult<T> + Send + 'static,
    {
        let defaults = encode(defaults)?;
        let raw = self
            .with_conn(move |conn| {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .context("failed to begin singleton transaction")?;
                insert_singleton_if_absent(&tx, collection, &defaults)?;
                let current = read_singleton(&tx, collection)?;
                let body: T = serde_json::from_str(&current.doc)
                    .with_context(|| format!("failed to decode {collection} document"))?;
                let merged = encode(&merge(body)?)?;
                let now = now_ms();
                tx.execute(
                    &format!("UPDATE {collection} SET doc = ?1, updated_at = ?2 WHERE singleton = 1"),
                    params![merged, now],
                )
                .map_err(|err| write_error(err, collection, "update"))?;
                tx.commit().context("failed to commit singleton transaction")?;
                Ok(RawDocument {
                    doc: merged,
                    updated_at: now,
                    ..current
                })
            })
            .await?;
        raw.decode()
    }
}

fn configure(conn: &Connection) -> anyhow::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("failed to set journal mode")?;
    tracing::debug!(journal_mode = %mode, "sqlite configured");
    Ok(())
}

fn insert_singleton_if_absent(
    conn: &Connection,
    collection: &str,
    defaults: &str,
) -> CmsResult<bool> {
    let now = now_ms();
    let inserted = conn
        .execute(
            &format!(
                "INSERT INTO {collection} (singleton, id, doc, created_at, updated_at) VALUES (1, \
                 ?1, ?2, ?3, ?3) ON CONFLICT(singleton) DO NOTHING"
            ),
            params![new_document_id(), defaults, now],
        )
        .with_context(|| format!("failed to seed {collection}"))?;
    Ok(inserted > 0)
}

fn read_singleton(conn: &Connection, collection: &str) -> CmsResult<RawDocument> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT id, doc, created_at, updated_at FROM {collection} WHERE singleton = 1"
            ),
            [],
            RawDocument::from_row,
        )
        .with_context(|| format!("failed to read {collection}"))?;
    Ok(raw)
}

fn where_clause(table: &str, predicates: &[Predicate]) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::with_capacity(predicates.len());
    let mut values = Vec::with_capacity(predicates.len() + 2);
    for predicate in predicates {
        predicate.push_sql(table, &mut clauses, &mut values);
    }
    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, values)
}

fn write_error(err: rusqlite::Error, collection: &str, action: &str) -> CmsError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if let Some(index) = violated_index(message) {
                return CmsError::UniqueViolation { index };
            }
        }
    }
    CmsError::Server(anyhow::Error::new(err).context(format!("failed to {action} {collection}")))
}

/// Extracts `posts_slug_unique` from
/// "UNIQUE constraint failed: index 'posts_slug_unique'".
fn violated_index(message: &str) -> Option<String> {
    let rest = message.split("index '").nth(1)?;
    rest.split('\'').next().map(ToOwned::to_owned)
}

fn encode<T: Serialize>(data: &T) -> CmsResult<String> {
    Ok(serde_json::to_string(data).context("failed to encode document")?)
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn ms_to_datetime(ms: i64) -> CmsResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CmsError::Server(anyhow!("stored timestamp {ms} out of range")))
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
