use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use folio_shared::{
    resource::{parse_body, Publishable},
    AllSettings, CmsError, ContentFilter, ContentStore, Document, Media, MediaFilter, Page,
    PageRequest, Post, Project, Resource, ResourceStore, SettingsBody, SettingsCategory, User,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error returned by every handler. Renders as `{ "message": ... }` with the
/// status implied by the wrapped [`CmsError`].
#[derive(Debug)]
pub struct ApiError(pub CmsError);

impl From<CmsError> for ApiError {
    fn from(err: CmsError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(CmsError::Server(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CmsError::NotFound(_) => StatusCode::NOT_FOUND,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {}", self.0);
        }
        let body = MessageResponse {
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Raw list query. Everything arrives as text so that malformed numbers are
/// reported as validation errors instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub featured: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    fn page_request(&self, default_limit: u64) -> ApiResult<PageRequest> {
        let page = parse_count("page", self.page.as_deref())?;
        let limit = parse_count("limit", self.limit.as_deref())?;
        Ok(PageRequest::new(page, limit, default_limit)?)
    }

    fn content_filter(&self) -> ContentFilter {
        ContentFilter {
            status: non_empty(&self.status),
            featured: non_empty(&self.featured).map(|value| value == "true"),
            tag: non_empty(&self.tag),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|value| !value.is_empty()).map(ToOwned::to_owned)
}

fn parse_count(name: &str, raw: Option<&str>) -> ApiResult<Option<u64>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            CmsError::Validation(format!("{name} must be a positive integer, got `{value}`"))
                .into()
        }),
    }
}

fn list_query(query: Result<Query<ListQuery>, QueryRejection>) -> ApiResult<ListQuery> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| CmsError::Validation(rejection.body_text()).into())
}

fn json_body(model: &str, payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| CmsError::validation(model, rejection.body_text()).into())
}

/// A resource exposed over HTTP: where its store lives and how list queries
/// map onto its filter.
pub trait ApiResource: Resource {
    fn store(content: &ContentStore) -> &ResourceStore<Self>;
    fn filter(query: &ListQuery) -> Self::Filter;
}

impl ApiResource for Post {
    fn store(content: &ContentStore) -> &ResourceStore<Self> {
        &content.posts
    }

    fn filter(query: &ListQuery) -> ContentFilter {
        query.content_filter()
    }
}

impl ApiResource for Project {
    fn store(content: &ContentStore) -> &ResourceStore<Self> {
        &content.projects
    }

    fn filter(query: &ListQuery) -> ContentFilter {
        query.content_filter()
    }
}

impl ApiResource for Media {
    fn store(content: &ContentStore) -> &ResourceStore<Self> {
        &content.media
    }

    fn filter(query: &ListQuery) -> MediaFilter {
        MediaFilter {
            kind: non_empty(&query.kind),
        }
    }
}

impl ApiResource for User {
    fn store(content: &ContentStore) -> &ResourceStore<Self> {
        &content.users
    }

    fn filter(_query: &ListQuery) {}
}

pub async fn health() -> &'static str {
    "API is running..."
}

pub async fn not_found() -> (StatusCode, Json<MessageResponse>) {
    let body = MessageResponse {
        message: "Not found".to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body))
}

pub async fn list_resources<R: ApiResource>(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<R>>> {
    let query = list_query(query)?;
    let request = query.page_request(R::DEFAULT_LIMIT)?;
    let page = R::store(&state.content).list(&R::filter(&query), request).await?;
    Ok(Json(page))
}

pub async fn get_resource<R: ApiResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document<R>>> {
    Ok(Json(R::store(&state.content).get_by_id(&id).await?))
}

pub async fn get_resource_by_slug<R: ApiResource + Publishable>(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Document<R>>> {
    Ok(Json(R::store(&state.content).get_by_slug(&slug).await?))
}

pub async fn featured_resources<R: ApiResource + Publishable>(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Document<R>>>> {
    Ok(Json(R::store(&state.content).featured().await?))
}

pub async fn create_resource<R: ApiResource>(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Document<R>>)> {
    let body = json_body(R::MODEL, payload)?;
    let created = R::store(&state.content).create_from_body(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_resource<R: ApiResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Document<R>>> {
    let patch = parse_body::<R::Patch>(R::MODEL, json_body(R::MODEL, payload)?)?;
    Ok(Json(R::store(&state.content).update(&id, patch).await?))
}

pub async fn delete_resource<R: ApiResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    R::store(&state.content).delete(&id).await?;
    Ok(Json(MessageResponse {
        message: format!("{} removed", R::MODEL),
    }))
}

pub async fn list_published_posts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Post>>> {
    let query = list_query(query)?;
    let request = query.page_request(Post::DEFAULT_LIMIT)?;
    let page = state
        .content
        .posts
        .list(&ContentFilter::published(), request)
        .await?;
    Ok(Json(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let post = state.content.posts.get_by_id(&id).await?;
    render_post(&state, &post).map(Json)
}

pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let post = state.content.posts.get_by_slug(&slug).await?;
    render_post(&state, &post).map(Json)
}

/// Serializes `post` with its markdown body replaced by the rendered form.
fn render_post(state: &AppState, post: &Document<Post>) -> ApiResult<Value> {
    let compiled = state
        .renderer
        .render(&post.data.content)
        .with_context(|| format!("failed to render post {}", post.id))?;
    let mut value = serde_json::to_value(post).context("failed to serialize post")?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("content".to_string(), compiled);
    }
    Ok(value)
}

pub async fn get_user_by_clerk_id(
    State(state): State<AppState>,
    Path(clerk_id): Path<String>,
) -> ApiResult<Json<Document<User>>> {
    Ok(Json(state.content.users.get_by_field("clerkId", &clerk_id).await?))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Document<User>>> {
    Ok(Json(state.content.users.get_by_field("email", &email).await?))
}

pub async fn get_all_settings(State(state): State<AppState>) -> ApiResult<Json<AllSettings>> {
    Ok(Json(state.content.settings.get_all().await?))
}

pub async fn get_settings(
    State(state): State<AppState>,
    category: SettingsCategory,
) -> ApiResult<Json<Document<SettingsBody>>> {
    Ok(Json(state.content.settings.get(category).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    category: SettingsCategory,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Document<SettingsBody>>> {
    let patch = match json_body(category.model(), payload)? {
        Value::Object(fields) => fields,
        other => {
            return Err(CmsError::validation(
                category.model(),
                format!("expected a JSON object, got {other}"),
            )
            .into())
        },
    };
    Ok(Json(state.content.settings.update(category, patch).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError(CmsError::NotFound("Post")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(CmsError::DuplicateSlug).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(CmsError::DuplicateEmail).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(CmsError::Validation("bad".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(CmsError::InvalidCategory("theme".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(CmsError::Server(anyhow::anyhow!("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn list_query_ignores_empty_filters() {
        let query = ListQuery {
            status: Some(String::new()),
            featured: Some("true".to_string()),
            tag: Some("rust".to_string()),
            ..ListQuery::default()
        };
        let filter = query.content_filter();
        assert_eq!(filter.status, None);
        assert_eq!(filter.featured, Some(true));
        assert_eq!(filter.tag.as_deref(), Some("rust"));

        let query = ListQuery {
            featured: Some("yes".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query.content_filter().featured, Some(false));
    }

    #[test]
    fn page_and_limit_must_be_positive_integers() {
        let query = ListQuery {
            page: Some("2".to_string()),
            limit: Some("5".to_string()),
            ..ListQuery::default()
        };
        let request = query.page_request(10).expect("valid paging");
        assert_eq!((request.page, request.limit), (2, 5));

        for (page, limit) in [("abc", "5"), ("1", "-3"), ("0", "5"), ("1", "0")] {
            let query = ListQuery {
                page: Some(page.to_string()),
                limit: Some(limit.to_string()),
                ..ListQuery::default()
            };
            let err = query.page_request(10).expect_err("invalid paging");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
