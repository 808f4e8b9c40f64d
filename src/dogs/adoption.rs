//! Adoption workflow: replace a dog's owner.
//!
//! [`Adoptions::adopt`] reads the dog, rebuilds the full record with the new
//! owner and saves it as a whole. An unknown id is ignored (logged, no error).
//! Adoptions of the same dog are serialized so two concurrent requests cannot
//! interleave their read and write; different dogs proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::repository::DogRepository;
use super::types::Dog;

#[derive(Debug, thiserror::Error)]
pub enum AdoptionError {
    #[error("owner must not be empty")]
    InvalidOwner,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct Adoptions {
    repo: Arc<dyn DogRepository>,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Adoptions {
    pub fn new(repo: Arc<dyn DogRepository>) -> Self {
        Self {
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` holding the lock for `dog_id`. The lock entry is dropped from
    /// the map once no other caller holds or waits on it.
    fn with_dog_lock<T>(&self, dog_id: i64, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(dog_id).or_default())
        };

        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(&dog_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&dog_id);
        }
        out
    }

    /// Give `dog_id` to `owner`.
    ///
    /// Returns the stored record, or `None` when no dog has that id. Repeating
    /// the same call leaves the stored record and the audit log unchanged.
    pub fn adopt(&self, dog_id: i64, owner: &str) -> Result<Option<Dog>, AdoptionError> {
        if owner.trim().is_empty() {
            return Err(AdoptionError::InvalidOwner);
        }
        self.with_dog_lock(dog_id, || self.adopt_locked(dog_id, owner))
    }

    fn adopt_locked(&self, dog_id: i64, owner: &str) -> Result<Option<Dog>, AdoptionError> {
        let Some(dog) = self.repo.find_by_id(dog_id)? else {
            tracing::warn!(dog_id, "adoption requested for unknown dog, ignoring");
            return Ok(None);
        };

        if dog.owner == owner {
            tracing::debug!(dog_id, owner, "dog already belongs to owner");
            return Ok(Some(dog));
        }

        let updated = self.repo.save_adoption(
            &Dog {
                owner: owner.to_string(),
                ..dog.clone()
            },
            &dog.owner,
        )?;

        tracing::info!(
            dog_id = updated.id,
            name = %updated.name,
            owner = %updated.owner,
            previous_owner = %dog.owner,
            "adopted"
        );
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::dogs::repository::SqliteDogRepository;

    fn adoptions() -> (Adoptions, Arc<SqliteDogRepository>) {
        let conn = crate::db::open_memory_database().unwrap();
        let repo = Arc::new(SqliteDogRepository::new(Arc::new(Mutex::new(conn))));
        repo.save(&Dog::new(1, "Rex", "", "friendly")).unwrap();
        (Adoptions::new(repo.clone()), repo)
    }

    /// Counts read-modify-write cycles that overlap: a cycle opens on
    /// `find_by_id` and closes on the save that follows it.
    struct SlowRepo {
        inner: Arc<SqliteDogRepository>,
        active: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl DogRepository for SlowRepo {
        fn find_all(&self) -> anyhow::Result<Vec<Dog>> {
            self.inner.find_all()
        }

        fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Dog>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);
            let dog = self.inner.find_by_id(id);
            std::thread::sleep(Duration::from_millis(20));
            dog
        }

        fn save(&self, dog: &Dog) -> anyhow::Result<Dog> {
            self.inner.save(dog)
        }

        fn save_adoption(&self, dog: &Dog, previous_owner: &str) -> anyhow::Result<Dog> {
            let saved = self.inner.save_adoption(dog, previous_owner);
            self.active.fetch_sub(1, Ordering::SeqCst);
            saved
        }
    }

    fn lock_count(adoptions: &Adoptions) -> usize {
        adoptions.locks.lock().unwrap().len()
    }

    #[test]
    fn blank_owner_is_rejected() {
        let (adoptions, repo) = adoptions();
        assert!(matches!(
            adoptions.adopt(1, "   "),
            Err(AdoptionError::InvalidOwner)
        ));
        assert_eq!(repo.find_by_id(1).unwrap().unwrap().owner, "");
    }

    #[test]
    fn adopt_replaces_owner_only() {
        let (adoptions, _repo) = adoptions();
        let saved = adoptions.adopt(1, "Alice").unwrap().unwrap();
        assert_eq!(saved, Dog::new(1, "Rex", "Alice", "friendly"));
    }

    #[test]
    fn adoptions_of_one_dog_do_not_interleave() {
        let (_, inner) = adoptions();
        let repo = Arc::new(SlowRepo {
            inner: Arc::clone(&inner),
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        });
        let adoptions = Arc::new(Adoptions::new(repo.clone()));

        let owners = ["Alice", "Bob", "Carol", "Dave"];
        let handles: Vec<_> = owners
            .into_iter()
            .map(|owner| {
                let adoptions = Arc::clone(&adoptions);
                std::thread::spawn(move || adoptions.adopt(1, owner).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(repo.high_water.load(Ordering::SeqCst), 1);
        assert_eq!(repo.active.load(Ordering::SeqCst), 0);
        let dog = inner.find_by_id(1).unwrap().unwrap();
        assert!(owners.contains(&dog.owner.as_str()));
        assert_eq!(lock_count(&adoptions), 0);
    }

    #[test]
    fn unknown_ids_leave_no_locks_behind() {
        let (adoptions, _repo) = adoptions();
        for id in 100..1_100 {
            assert!(adoptions.adopt(id, "Alice").unwrap().is_none());
        }
        adoptions.adopt(1, "Alice").unwrap();
        assert_eq!(lock_count(&adoptions), 0);
    }
}
