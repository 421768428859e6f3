//! End-to-end scenarios driven entirely through the GraphQL surface.

use serde_json::{json, Value as Json};
use strata_sdk::{Database, QueryParams};

fn user_db() -> Database {
    Database::in_memory("type User { name: String }").unwrap()
}

fn run(db: &Database, query: &str) -> Json {
    let response = db.execute(&QueryParams::new(query));
    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    response.data.expect("data")
}

#[test]
fn create_and_read() {
    let db = user_db();
    let created = run(
        &db,
        r#"mutation { createUser(data: {name: "Bob"}) { id name } }"#,
    );
    assert_eq!(created["createUser"]["name"], json!("Bob"));
    let id = created["createUser"]["id"].as_str().unwrap();

    let found = run(&db, &format!(r#"query {{ findUser(id: "{id}") {{ name }} }}"#));
    assert_eq!(found, json!({"findUser": {"name": "Bob"}}));
}

#[test]
fn patch_set_renames() {
    let db = user_db();
    run(&db, r#"mutation { createUser(data: {name: "Bob"}) { id } }"#);
    run(
        &db,
        r#"mutation { updateUser(filter: {name: {eq: "Bob"}}, patch: {name: {set: "Alice"}}) { id } }"#,
    );
    let listed = run(&db, "{ listUser { name } }");
    assert_eq!(listed, json!({"listUser": [{"name": "Alice"}]}));
}

#[test]
fn append_extends_list_in_order() {
    let db = Database::in_memory("type User { name: String, tags: [String] }").unwrap();
    run(
        &db,
        r#"mutation { createUser(data: {name: "Bob", tags: ["a"]}) { id } }"#,
    );
    run(
        &db,
        r#"mutation { updateUser(filter: {name: {eq: "Bob"}}, patch: {tags: {append: ["b", "c"]}}) { id } }"#,
    );
    let listed = run(&db, "{ listUser { tags } }");
    assert_eq!(listed, json!({"listUser": [{"tags": ["a", "b", "c"]}]}));
}

#[test]
fn append_is_monotonic() {
    let db = Database::in_memory("type User { name: String, tags: [String] }").unwrap();
    run(
        &db,
        r#"mutation { createUser(data: {name: "B", tags: ["x", "y"]}) { id } }"#,
    );
    for round in 0..3 {
        run(
            &db,
            &format!(
                r#"mutation {{ updateUser(filter: {{name: {{eq: "B"}}}}, patch: {{tags: {{append: ["r{round}"]}}}}) {{ id }} }}"#
            ),
        );
    }
    let listed = run(&db, "{ listUser { tags } }");
    // The first elements never move; each append lands at the tail.
    assert_eq!(
        listed["listUser"][0]["tags"],
        json!(["x", "y", "r0", "r1", "r2"])
    );
}

#[test]
fn merge_base_fast_forward_via_empty_commit() {
    let db = user_db();
    let h0 = db.head().unwrap();
    // An empty mutation still commits and advances head.
    run(&db, "mutation { __typename }");
    let h1 = db.head().unwrap();
    assert_ne!(h0, h1);
    let commit = db.repository().get_commit(&h1).unwrap();
    assert_eq!(commit.parents, vec![h0]);
}

#[test]
fn divergent_merge_theirs_wins() {
    let db = user_db();
    run(&db, r#"mutation { createUser(data: {name: "Bob"}) { id } }"#);
    let h0 = db.head().unwrap();

    // Two updates pinned to the same revision produce sibling commits;
    // each mutation merges its own commit into head as it lands.
    run(
        &db,
        &format!(
            r#"mutation M @revision(hash: "{h0}") {{ updateUser(filter: {{}}, patch: {{name: {{set: "Bob2"}}}}) {{ id }} }}"#
        ),
    );
    run(
        &db,
        &format!(
            r#"mutation M @revision(hash: "{h0}") {{ updateUser(filter: {{}}, patch: {{name: {{set: "Chad"}}}}) {{ id }} }}"#
        ),
    );

    let head_commit = db.repository().get_commit(&db.head().unwrap()).unwrap();
    assert!(head_commit.is_merge());
    let listed = run(&db, "{ listUser { name } }");
    assert_eq!(listed, json!({"listUser": [{"name": "Chad"}]}));
}

#[test]
fn filter_composition_or() {
    let db = Database::in_memory("type User { age: Int }").unwrap();
    for age in [10, 20, 30] {
        run(&db, &format!("mutation {{ createUser(data: {{age: {age}}}) {{ id }} }}"));
    }
    let listed = run(
        &db,
        "{ listUser(filter: {or: [{age: {lt: 15}}, {age: {gt: 25}}]}) { age } }",
    );
    let mut ages: Vec<i64> = listed["listUser"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["age"].as_i64().unwrap())
        .collect();
    ages.sort_unstable();
    assert_eq!(ages, vec![10, 30]);
}

#[test]
fn relation_reference_reuses_document() {
    let db = Database::in_memory("type User { name: String, boss: User }").unwrap();
    let created = run(&db, r#"mutation { createUser(data: {name: "Boss"}) { id } }"#);
    let boss_id = created["createUser"]["id"].as_str().unwrap();
    run(
        &db,
        &format!(r#"mutation {{ createUser(data: {{name: "A", boss: {{id: "{boss_id}"}}}}) {{ id }} }}"#),
    );
    // Two documents total: the reference created nothing new.
    assert_eq!(db.dump().unwrap()["User"].len(), 2);
    let listed = run(
        &db,
        r#"{ listUser(filter: {name: {eq: "A"}}) { boss { id name } } }"#,
    );
    assert_eq!(listed["listUser"][0]["boss"]["id"], json!(boss_id));
    assert_eq!(listed["listUser"][0]["boss"]["name"], json!("Boss"));
}

#[test]
fn schema_closure_after_init() {
    let db = Database::in_memory(
        "type Author { name: String } type Book { title: String } type Tag { label: String }",
    )
    .unwrap();
    let dump = db.dump().unwrap();
    assert_eq!(
        dump.keys().collect::<Vec<_>>(),
        vec!["Author", "Book", "Tag"]
    );
    assert!(dump.values().all(Vec::is_empty));
}

#[test]
fn commit_loads_are_immutable() {
    let db = user_db();
    run(&db, r#"mutation { createUser(data: {name: "X"}) { id } }"#);
    let head = db.head().unwrap();
    let first = db.repository().get_commit(&head).unwrap();
    run(&db, "{ listUser { id } }");
    let second = db.repository().get_commit(&head).unwrap();
    assert_eq!(first, second);
}
