//! Storage and domain layer of the folio CMS: typed models, the embedded
//! document database, the shared CRUD contract and the settings singletons.

pub mod content_store;
pub mod document_db;
pub mod error;
pub mod media;
pub mod post;
pub mod project;
pub mod resource;
pub mod settings_store;
pub mod user;

pub use content_store::ContentStore;
pub use document_db::{Document, DocumentDb};
pub use error::{CmsError, CmsResult};
pub use media::{Dimensions, Media, MediaFilter, MediaPatch, NewMedia};
pub use post::{Author, ContentFilter, Post, PostPatch, PublishStatus};
pub use project::{Project, ProjectPatch};
pub use resource::{Page, PageRequest, Pagination, Resource, ResourceStore};
pub use settings_store::{AllSettings, SettingsBody, SettingsCategory, SettingsStore};
pub use user::{NewUser, User, UserPatch};
