mod helpers;

use std::sync::{Arc, Mutex};

use helpers::{rex, seeded_repo, test_repo};
use pooch_palace::db;
use pooch_palace::dogs::adoption::{AdoptionError, Adoptions};
use pooch_palace::dogs::repository::{DogRepository, SqliteDogRepository};
use tempfile::TempDir;
use pooch_palace::dogs::types::Dog;

#[test]
fn adopt_rex_end_to_end() {
    let repo = seeded_repo(&[rex()]);
    let adoptions = Adoptions::new(repo.clone());

    adoptions.adopt(1, "Alice").unwrap();

    assert_eq!(
        repo.find_by_id(1).unwrap(),
        Some(Dog::new(1, "Rex", "Alice", "friendly"))
    );
}

#[test]
fn adopt_is_idempotent() {
    let once = seeded_repo(&[rex()]);
    Adoptions::new(once.clone()).adopt(1, "Alice").unwrap();

    let twice = seeded_repo(&[rex()]);
    let adoptions = Adoptions::new(twice.clone());
    let first = adoptions.adopt(1, "Alice").unwrap();
    let second = adoptions.adopt(1, "Alice").unwrap();

    assert_eq!(first, second);
    assert_eq!(once.find_all().unwrap(), twice.find_all().unwrap());
}

#[test]
fn adopt_unknown_dog_is_a_silent_no_op() {
    let repo = seeded_repo(&[rex()]);
    let before = repo.find_all().unwrap();

    let outcome = Adoptions::new(repo.clone()).adopt(99, "Alice").unwrap();

    assert!(outcome.is_none());
    assert_eq!(repo.find_all().unwrap(), before);
    assert!(repo.find_by_id(99).unwrap().is_none());
}

#[test]
fn adopt_on_empty_store_changes_nothing() {
    let repo = test_repo();
    assert!(Adoptions::new(repo.clone()).adopt(1, "Alice").unwrap().is_none());
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn readoption_keeps_identity_fields() {
    let repo = seeded_repo(&[rex(), Dog::new(2, "Luna", "", "shy")]);
    let adoptions = Adoptions::new(repo.clone());

    adoptions.adopt(1, "Alice").unwrap();
    adoptions.adopt(1, "Bob").unwrap();

    assert_eq!(repo.find_by_id(1).unwrap(), Some(Dog::new(1, "Rex", "Bob", "friendly")));
    assert_eq!(repo.find_by_id(2).unwrap(), Some(Dog::new(2, "Luna", "", "shy")));
}

#[test]
fn empty_owner_is_rejected_without_touching_storage() {
    let repo = seeded_repo(&[rex()]);
    let err = Adoptions::new(repo.clone()).adopt(1, "").unwrap_err();
    assert!(matches!(err, AdoptionError::InvalidOwner));
    assert_eq!(repo.find_by_id(1).unwrap(), Some(rex()));
}

#[test]
fn adoptions_are_audited() {
    let db = Arc::new(Mutex::new(helpers::test_db()));
    let repo = Arc::new(SqliteDogRepository::new(Arc::clone(&db)));
    repo.save(&rex()).unwrap();

    let adoptions = Adoptions::new(repo);
    adoptions.adopt(1, "Alice").unwrap();
    adoptions.adopt(1, "Bob").unwrap();
    // same owner again: nothing to audit
    adoptions.adopt(1, "Bob").unwrap();
    adoptions.adopt(42, "Nobody").unwrap();

    let conn = db.lock().unwrap();
    let rows: Vec<(i64, String, String)> = conn
        .prepare("SELECT dog_id, previous_owner, new_owner FROM adoption_log ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            (1, String::new(), "Alice".to_string()),
            (1, "Alice".to_string(), "Bob".to_string()),
        ]
    );
}

#[test]
fn failed_audit_leaves_the_dog_with_its_previous_owner() {
    let db = Arc::new(Mutex::new(helpers::test_db()));
    let repo = Arc::new(SqliteDogRepository::new(Arc::clone(&db)));
    repo.save(&rex()).unwrap();
    db.lock()
        .unwrap()
        .execute_batch("DROP TABLE adoption_log")
        .unwrap();

    let result = Adoptions::new(repo.clone()).adopt(1, "Alice");

    assert!(matches!(result, Err(AdoptionError::Storage(_))));
    assert_eq!(repo.find_by_id(1).unwrap(), Some(rex()));
}

#[test]
fn adoption_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("pooch.db");

    {
        let conn = db::open_database(&db_path).unwrap();
        let repo = Arc::new(SqliteDogRepository::new(Arc::new(Mutex::new(conn))));
        repo.save(&rex()).unwrap();
        Adoptions::new(repo).adopt(1, "Alice").unwrap();
    }

    let conn = db::open_database(&db_path).unwrap();
    let repo = SqliteDogRepository::new(Arc::new(Mutex::new(conn)));
    assert_eq!(
        repo.find_by_id(1).unwrap(),
        Some(Dog::new(1, "Rex", "Alice", "friendly"))
    );
}
