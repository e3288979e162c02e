use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bookshelf_authz::JwtKeys;
use bookshelf_cache::TagCache;
use bookshelf_kernel::settings::Settings;
use sqlx::SqlitePool;

use crate::modules::authors::repository::AuthorRepository;
use crate::modules::books::repository::BookRepository;
use crate::modules::users::repository::UserRepository;

/// Tag shared by every cached page of the author listing
pub const AUTHORS_CACHE_TAG: &str = "authorsCache";
/// Tag shared by every cached page of the book listing
pub const BOOKS_CACHE_TAG: &str = "booksCache";

/// Shared handles passed to every module router
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: SqlitePool,
    pub cache: TagCache,
    pub http: reqwest::Client,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(settings: Settings, db: SqlitePool) -> anyhow::Result<Self> {
        let cache = TagCache::new(
            settings.cache.max_capacity,
            settings.cache.ttl_secs.map(Duration::from_secs),
        );
        let http = reqwest::Client::builder()
            .user_agent(settings.external.user_agent.clone())
            .build()
            .context("failed to build outbound HTTP client")?;
        let jwt = Arc::new(JwtKeys::from_settings(&settings.auth));

        Ok(Self {
            settings: Arc::new(settings),
            db,
            cache,
            http,
            jwt,
        })
    }

    pub fn authors(&self) -> AuthorRepository {
        AuthorRepository::new(self.db.clone())
    }

    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.db.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    /// Author pages embed books and book pages embed authors, so a write to
    /// either resource evicts both listings.
    pub async fn invalidate_catalogue(&self) {
        self.cache
            .invalidate_tags(&[AUTHORS_CACHE_TAG, BOOKS_CACHE_TAG])
            .await;
    }
}
