use dyntable_core::db::open_db_in_memory;
use dyntable_core::store::sqlite::QUERY_PAGE_ITEMS;
use dyntable_core::{
    Item, SqliteStore, SqliteTableClient, TableRepository, DEFAULT_PAGE_LIMIT,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn users_repo(conn: &Connection) -> TableRepository<SqliteTableClient<'_>> {
    let store = SqliteStore::new(conn);
    store.create_table("users").unwrap();
    TableRepository::bind(&store, "users").unwrap()
}

fn seed(repo: &TableRepository<SqliteTableClient<'_>>, count: usize) {
    let items: Vec<Item> = (0..count)
        .map(|index| {
            let mut item = Item::with_id(format!("u{index:04}"));
            item.set("index", index as i64);
            item
        })
        .collect();
    repo.insert_many(&items).unwrap();
}

#[test]
fn find_all_on_empty_table_returns_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn find_all_accumulates_items_across_pages() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let total = DEFAULT_PAGE_LIMIT as usize * 2 + 50;
    seed(&repo, total);

    let items = repo.find_all().unwrap();
    assert_eq!(items.len(), total);

    let ids: HashSet<&str> = items.iter().filter_map(Item::id).collect();
    assert_eq!(ids.len(), total, "no duplicates and no omissions");
}

#[test]
fn find_all_with_page_limit_matching_table_size_exactly() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    seed(&repo, 10);
    // The final page fills up exactly; the trailing empty page must not
    // duplicate or drop anything.
    let items = repo.find_all_with_limit(5).unwrap();
    assert_eq!(items.len(), 10);
}

#[test]
fn find_all_with_small_limit_still_returns_everything() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    seed(&repo, 23);
    let items = repo.find_all_with_limit(7).unwrap();
    assert_eq!(items.len(), 23);
}

#[test]
fn search_matches_substrings_on_text_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut south = Item::with_id("u1");
    south.set("region", "south-east");
    let mut north = Item::with_id("u2");
    north.set("region", "north-west");
    let mut missing = Item::with_id("u3");
    missing.set("zone", "south");
    repo.insert_many(&[south, north, missing]).unwrap();

    let hits = repo.search("region", "south").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), Some("u1"));

    // Items where the field is absent are excluded.
    let west = repo.search("region", "west").unwrap();
    assert_eq!(west.len(), 1);
    assert_eq!(west[0].id(), Some("u2"));
}

#[test]
fn search_matches_membership_on_list_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut tagged = Item::with_id("u1");
    tagged.set("tags", vec!["alpha", "beta"]);
    let mut other = Item::with_id("u2");
    other.set("tags", vec!["gamma"]);
    repo.insert_many(&[tagged, other]).unwrap();

    let hits = repo.search("tags", "beta").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), Some("u1"));

    // List matching is member equality, not substring.
    assert!(repo.search("tags", "bet").unwrap().is_empty());
}

#[test]
fn search_ignores_non_containable_field_shapes() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    let mut item = Item::with_id("u1");
    item.set("age", 42i64);
    repo.insert(&item).unwrap();

    assert!(repo.search("age", "42").unwrap().is_empty());
}

#[test]
fn search_stops_after_one_page() {
    let conn = open_db_in_memory().unwrap();
    let repo = users_repo(&conn);

    // Every item matches, but more exist than one query page examines.
    let total = QUERY_PAGE_ITEMS + 20;
    let items: Vec<Item> = (0..total)
        .map(|index| {
            let mut item = Item::with_id(format!("u{index:04}"));
            item.set("status", "active");
            item
        })
        .collect();
    repo.insert_many(&items).unwrap();

    // Documented contract: matches beyond the first page are dropped.
    let hits = repo.search("status", "active").unwrap();
    assert_eq!(hits.len(), QUERY_PAGE_ITEMS);
}
