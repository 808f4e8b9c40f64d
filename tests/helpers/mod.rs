#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pooch_palace::cats::{CatFacts, FactProvider};
use pooch_palace::db;
use pooch_palace::dogs::repository::{DogRepository, SqliteDogRepository};
use pooch_palace::dogs::types::Dog;
use pooch_palace::error::UpstreamError;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Repository over a fresh in-memory database.
pub fn test_repo() -> Arc<SqliteDogRepository> {
    Arc::new(SqliteDogRepository::new(Arc::new(Mutex::new(test_db()))))
}

/// Repository seeded with the given dogs.
pub fn seeded_repo(dogs: &[Dog]) -> Arc<SqliteDogRepository> {
    let repo = test_repo();
    for dog in dogs {
        repo.save(dog).unwrap();
    }
    repo
}

pub fn rex() -> Dog {
    Dog::new(1, "Rex", "", "friendly")
}

/// Provider that records how many calls are in flight at once.
#[derive(Default)]
pub struct CountingProvider {
    pub current: AtomicUsize,
    pub high_water: AtomicUsize,
    pub calls: AtomicUsize,
    pub latency: Duration,
}

impl CountingProvider {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }
}

#[async_trait]
impl FactProvider for CountingProvider {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(CatFacts::from_strings(["counted"]))
    }
}

/// Provider that always fails the same way.
pub struct FailingProvider(pub UpstreamError);

#[async_trait]
impl FactProvider for FailingProvider {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError> {
        Err(self.0.clone())
    }
}
