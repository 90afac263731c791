//! Postgres-backed store implementations.

mod articles;
mod statuses;
mod util;

pub use articles::PostgresContentStore;
pub use statuses::PostgresStatusStore;
pub use util::map_sqlx_error;

use sqlx::{
    query,
    postgres::{PgPool, PgPoolOptions},
};

/// Connection pool shared by the Postgres stores.
#[derive(Clone)]
pub struct PostgresRepositories {
    pool: PgPool,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    pub fn status_store(&self) -> PostgresStatusStore {
        PostgresStatusStore::new(self.pool.clone())
    }

    pub fn content_store(&self) -> PostgresContentStore {
        PostgresContentStore::new(self.pool.clone(), self.status_store())
    }
}
