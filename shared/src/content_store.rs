use crate::{
    document_db::DocumentDb,
    error::CmsResult,
    media::Media,
    post::Post,
    project::Project,
    resource::ResourceStore,
    settings_store::SettingsStore,
    user::User,
};

/// Every store of the site, sharing one database handle.
#[derive(Clone)]
pub struct ContentStore {
    pub posts: ResourceStore<Post>,
    pub projects: ResourceStore<Project>,
    pub media: ResourceStore<Media>,
    pub users: ResourceStore<User>,
    pub settings: SettingsStore,
}

impl ContentStore {
    pub fn new(db: DocumentDb) -> Self {
        Self {
            posts: ResourceStore::new(db.clone()),
            projects: ResourceStore::new(db.clone()),
            media: ResourceStore::new(db.clone()),
            users: ResourceStore::new(db.clone()),
            settings: SettingsStore::new(db),
        }
    }

    /// Creates missing collections and unique indexes. Safe to run on every
    /// start.
    pub async fn ensure_schema(&self) -> CmsResult<()> {
        self.posts.ensure_schema().await?;
        self.projects.ensure_schema().await?;
        self.media.ensure_schema().await?;
        self.users.ensure_schema().await?;
        self.settings.ensure_schema().await?;
        tracing::info!("schema ensured");
        Ok(())
    }

    /// Document count per resource collection.
    pub async fn collection_counts(&self) -> CmsResult<Vec<(&'static str, u64)>> {
        Ok(vec![
            ("posts", self.posts.count().await?),
            ("projects", self.projects.count().await?),
            ("media", self.media.count().await?),
            ("users", self.users.count().await?),
        ])
    }
}
