//! Storage collaborator for dogs.
//!
//! [`DogRepository`] is the narrow interface the adoption workflow and the
//! listings depend on; [`SqliteDogRepository`] implements it on the shared
//! SQLite connection. All methods are synchronous — callers in async contexts
//! should use `tokio::task::spawn_blocking`.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::types::Dog;

pub trait DogRepository: Send + Sync {
    fn find_all(&self) -> Result<Vec<Dog>>;

    fn find_by_id(&self, id: i64) -> Result<Option<Dog>>;

    /// Upsert by id: the stored record is replaced as a whole.
    fn save(&self, dog: &Dog) -> Result<Dog>;

    /// Save `dog` after an owner change from `previous_owner`, together with
    /// its audit entry. Either both are stored or neither is. Stores without
    /// an audit trail only save.
    fn save_adoption(&self, dog: &Dog, _previous_owner: &str) -> Result<Dog> {
        self.save(dog)
    }
}

#[derive(Clone)]
pub struct SqliteDogRepository {
    db: Arc<Mutex<Connection>>,
}

impl SqliteDogRepository {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }
}

fn row_to_dog(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dog> {
    Ok(Dog {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        description: row.get(3)?,
    })
}

impl DogRepository for SqliteDogRepository {
    fn find_all(&self) -> Result<Vec<Dog>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, owner, description FROM dogs ORDER BY id")?;
        let dogs = stmt
            .query_map([], row_to_dog)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dogs)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Dog>> {
        let conn = self.conn()?;
        let dog = conn
            .query_row(
                "SELECT id, name, owner, description FROM dogs WHERE id = ?1",
                params![id],
                row_to_dog,
            )
            .optional()?;
        Ok(dog)
    }

    fn save(&self, dog: &Dog) -> Result<Dog> {
        let conn = self.conn()?;
        upsert_dog(&conn, dog)?;
        Ok(dog.clone())
    }

    fn save_adoption(&self, dog: &Dog, previous_owner: &str) -> Result<Dog> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        upsert_dog(&tx, dog)?;
        tx.execute(
            "INSERT INTO adoption_log (dog_id, previous_owner, new_owner, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![dog.id, previous_owner, dog.owner, chrono::Utc::now().to_rfc3339()],
        )?;

        tx.commit()?;
        Ok(dog.clone())
    }
}

fn upsert_dog(conn: &Connection, dog: &Dog) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO dogs (id, name, owner, description) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            owner = excluded.owner,
            description = excluded.description",
        params![dog.id, dog.name, dog.owner, dog.description],
    )
}
