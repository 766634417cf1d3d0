//! HTTP API of the folio CMS.

pub mod config;
pub mod handlers;
pub mod markdown;
pub mod request_context;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
