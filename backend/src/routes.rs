use std::any::Any;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use folio_shared::{Media, Post, Project, SettingsCategory, User};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
};

use crate::{
    handlers::{self, MessageResponse},
    request_context::request_context_middleware,
    state::AppState,
};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/", get(handlers::health))
        .nest("/api/posts", post_routes())
        .nest("/api/projects", project_routes())
        .nest("/api/media", media_routes())
        .nest("/api/users", user_routes())
        .nest("/api/settings", settings_routes())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(middleware::from_fn(request_context_middleware)),
        )
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<Post>).post(handlers::create_resource::<Post>),
        )
        .route("/published", get(handlers::list_published_posts))
        .route("/featured", get(handlers::featured_resources::<Post>))
        .route("/id/:id", get(handlers::get_post))
        .route("/slug/:slug", get(handlers::get_post_by_slug))
        .route(
            "/:id",
            axum::routing::put(handlers::update_resource::<Post>)
                .delete(handlers::delete_resource::<Post>),
        )
}

fn project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<Project>).post(handlers::create_resource::<Project>),
        )
        .route("/featured", get(handlers::featured_resources::<Project>))
        .route("/id/:id", get(handlers::get_resource::<Project>))
        .route("/slug/:slug", get(handlers::get_resource_by_slug::<Project>))
        .route(
            "/:id",
            axum::routing::put(handlers::update_resource::<Project>)
                .delete(handlers::delete_resource::<Project>),
        )
}

fn media_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<Media>).post(handlers::create_resource::<Media>),
        )
        .route(
            "/:id",
            get(handlers::get_resource::<Media>)
                .put(handlers::update_resource::<Media>)
                .delete(handlers::delete_resource::<Media>),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<User>).post(handlers::create_resource::<User>),
        )
        .route("/id/:id", get(handlers::get_resource::<User>))
        .route("/clerk/:clerk_id", get(handlers::get_user_by_clerk_id))
        .route("/email/:email", get(handlers::get_user_by_email))
        .route(
            "/:id",
            axum::routing::put(handlers::update_resource::<User>)
                .delete(handlers::delete_resource::<User>),
        )
}

/// One fixed route per category; there is no path parameter to mistype.
fn settings_routes() -> Router<AppState> {
    SettingsCategory::ALL.into_iter().fold(
        Router::new().route("/", get(handlers::get_all_settings)),
        |router, category| {
            router.route(
                &format!("/{category}"),
                get(move |state: State<AppState>| handlers::get_settings(state, category)).put(
                    move |state: State<AppState>, payload: Result<Json<Value>, JsonRejection>| {
                        handlers::update_settings(state, category, payload)
                    },
                ),
            )
        },
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("handler panicked: {detail}");
    let body = MessageResponse {
        message: "Server error".to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
