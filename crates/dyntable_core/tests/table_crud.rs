use dyntable_core::db::{open_db, open_db_in_memory};
use dyntable_core::{
    Item, RepoError, SqliteStore, SqliteTableClient, StoreClient, TableRepository,
    BATCH_MAX_ITEMS,
};
use rusqlite::Connection;
use tempfile::tempdir;
use uuid::Uuid;

fn users_repo(conn: &Connection) -> TableRepository<SqliteTableClient<'_>> {
    let store = SqliteStore::new(conn);
    store.create_table("users").unwrap();
    TableRepository::bind(&store, "users").unwrap()
}

#[test]
fn insert_then_find_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut item = Item::with_id("u1");
    item.set("status", "active");
    repo.insert(&item).unwrap();

    let loaded = repo.find_by_id("u1").unwrap();
    assert_eq!(loaded, item);
}

#[test]
fn insert_overwrites_item_with_same_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut first = Item::with_id("u1");
    first.set("status", "active");
    first.set("age", 30i64);
    repo.insert(&first).unwrap();

    let mut second = Item::with_id("u1");
    second.set("status", "disabled");
    repo.insert(&second).unwrap();

    let loaded = repo.find_by_id("u1").unwrap();
    assert_eq!(loaded, second);
    assert_eq!(loaded.get("age"), None);
}

#[test]
fn find_by_id_on_never_written_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let missing = Uuid::new_v4().to_string();
    let err = repo.find_by_id(&missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { table, id } if table == "users" && id == missing
    ));
}

#[test]
fn find_by_id_after_delete_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut item = Item::with_id("u1");
    item.set("status", "active");
    repo.insert(&item).unwrap();
    repo.delete("u1").unwrap();

    let err = repo.find_by_id("u1").unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    repo.insert(&Item::with_id("u1")).unwrap();
    repo.delete("u1").unwrap();
    repo.delete("u1").unwrap();

    // Deleting an id that never existed succeeds as well.
    repo.delete("ghost").unwrap();
}

#[test]
fn insert_many_makes_every_item_retrievable() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let items: Vec<Item> = (0..5)
        .map(|index| {
            let mut item = Item::with_id(format!("u{index}"));
            item.set("index", index as i64);
            item
        })
        .collect();
    repo.insert_many(&items).unwrap();

    for item in &items {
        let loaded = repo.find_by_id(item.id().unwrap()).unwrap();
        assert_eq!(&loaded, item);
    }
}

#[test]
fn insert_many_beyond_batch_ceiling_is_chunked() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let total = BATCH_MAX_ITEMS * 2 + 3;
    let items: Vec<Item> = (0..total)
        .map(|index| Item::with_id(format!("u{index:03}")))
        .collect();
    repo.insert_many(&items).unwrap();

    for item in &items {
        repo.find_by_id(item.id().unwrap()).unwrap();
    }
}

#[test]
fn insert_rejects_items_without_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut item = Item::new();
    item.set("status", "active");

    assert!(matches!(
        repo.insert(&item).unwrap_err(),
        RepoError::InvalidItem(_)
    ));
    assert!(matches!(
        repo.insert_many(&[Item::with_id("ok"), item]).unwrap_err(),
        RepoError::InvalidItem(_)
    ));
    // The valid item from the rejected batch was not written either.
    assert!(matches!(
        repo.find_by_id("ok").unwrap_err(),
        RepoError::NotFound { .. }
    ));
}

#[test]
fn binding_an_unknown_table_fails_at_construction() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    store.create_table("users").unwrap();

    let err = TableRepository::bind(&store, "orders").unwrap_err();
    match err {
        RepoError::Store(store_err) => {
            assert_eq!(store_err.code(), "ResourceNotFoundException");
        }
        other => panic!("expected store error, got {other}"),
    }
}

#[test]
fn items_survive_reopening_a_file_backed_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let conn = open_db(&path).unwrap();
        let repo = users_repo(&conn);
        let mut item = Item::with_id("u1");
        item.set("status", "active");
        repo.insert(&item).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let store = SqliteStore::new(&conn);
    let repo = TableRepository::new(store.bind_table("users").unwrap());
    let loaded = repo.find_by_id("u1").unwrap();
    assert_eq!(loaded.get("status").unwrap().as_text(), Some("active"));
}
