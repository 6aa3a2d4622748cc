//! JSON helpers over the store trait.
//!
//! GREEN when:
//! - get_json reads absence and malformed payloads as None without error.
//! - list_json returns documents in key order and silently skips non-JSON
//!   keys and corrupt objects.
//! - put_json_if_absent loses against an existing object.

use serde::{Deserialize, Serialize};
use sfb_store::{get_json, list_json, put_json, put_json_if_absent, StoreError};
use sfb_testkit::MemoryStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Doc {
    name: String,
    value: i64,
}

#[tokio::test]
async fn absent_and_malformed_read_as_none() {
    let store = MemoryStore::new();

    let missing: Option<Doc> = get_json(&store, "prefix/missing.json").await.unwrap();
    assert!(missing.is_none());

    store.put_raw("prefix/corrupt.json", b"{not json".to_vec());
    let corrupt: Option<Doc> = get_json(&store, "prefix/corrupt.json").await.unwrap();
    assert!(corrupt.is_none());
}

#[tokio::test]
async fn list_json_skips_corruption_and_keeps_order() {
    let store = MemoryStore::new();
    for (name, value) in [("b", 2), ("a", 1), ("c", 3)] {
        let doc = Doc {
            name: name.to_string(),
            value,
        };
        put_json(&store, &format!("docs/{name}.json"), &doc).await.unwrap();
    }
    store.put_raw("docs/broken.json", b"]".to_vec());
    store.put_raw("docs/not-a-doc.txt", b"ignored".to_vec());

    let docs: Vec<(String, Doc)> = list_json(&store, "docs/").await.unwrap();
    let names: Vec<&str> = docs.iter().map(|(_, d)| d.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn conditional_create_is_first_writer_wins() {
    let store = MemoryStore::new();
    let doc = Doc {
        name: "first".to_string(),
        value: 1,
    };
    put_json_if_absent(&store, "one.json", &doc).await.unwrap();

    let rival = Doc {
        name: "second".to_string(),
        value: 2,
    };
    let err = put_json_if_absent(&store, "one.json", &rival).await.unwrap_err();
    assert!(matches!(err, StoreError::PreconditionFailed { .. }));

    let kept: Doc = get_json(&store, "one.json").await.unwrap().unwrap();
    assert_eq!(kept.name, "first");
}
