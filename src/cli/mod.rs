pub mod doctor;
pub mod dogs;

use std::sync::{Arc, Mutex};

use anyhow::Result;

use pooch_palace::config::PoochConfig;
use pooch_palace::db;
use pooch_palace::dogs::repository::SqliteDogRepository;

/// Open the configured database as a repository for one-shot commands.
fn open_repository(config: &PoochConfig) -> Result<Arc<SqliteDogRepository>> {
    let conn = db::open_database(config.resolved_db_path())?;
    Ok(Arc::new(SqliteDogRepository::new(Arc::new(Mutex::new(conn)))))
}
