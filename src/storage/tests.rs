//! Storage Module Tests
//!
//! ## Test Scopes
//! - **Store / Bucket**: plain and conditional reads and writes, bucket lifecycle.
//! - **Operators**: built-in conditions, comparators and update functions, and
//!   failures for names nobody registered.
//! - **Queries**: range and predicate queries.
//! - **Backups**: export/import through the filesystem.

#[cfg(test)]
mod tests {
    use crate::storage::backup::BackupManager;
    use crate::storage::error::StoreError;
    use crate::storage::memory::MemoryStore;
    use crate::storage::operators::Operators;
    use crate::storage::types::{Key, Parameters, Predicate, Range, Update, Value};
    use crate::storage::Store;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> (Arc<MemoryStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(Operators::with_defaults(), BackupManager::new(dir.path()));
        (store, dir)
    }

    fn json(raw: &str) -> Value {
        Value::new(raw)
    }

    fn update(function: &str, timeout_ms: u64, parameters: &[(&str, &str)]) -> Update {
        Update {
            function: function.to_string(),
            timeout_ms,
            parameters: parameters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Parameters>(),
        }
    }

    // ============================================================
    // TEST 1: Store / Bucket basics
    // ============================================================

    #[test]
    fn test_buckets_are_created_on_demand_and_removable() {
        // ARRANGE
        let (store, _dir) = store();
        assert!(store.get_bucket("docs").is_none());

        // ACT
        store.get_or_create_bucket("docs").put(Key::new("a"), json("1"));
        store.get_or_create_bucket("other");

        // ASSERT
        let names: Vec<String> = store.buckets().into_iter().collect();
        assert_eq!(names, vec!["docs".to_string(), "other".to_string()]);
        assert!(store.remove_bucket("docs"));
        assert!(!store.remove_bucket("docs"));
        assert_eq!(store.bucket_count(), 1);
    }

    #[test]
    fn test_put_get_remove() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");

        bucket.put(Key::new("a"), json("1"));
        bucket.put(Key::new("a"), json("2"));

        assert_eq!(bucket.get(&Key::new("a")), Some(json("2")));
        assert_eq!(bucket.remove(&Key::new("a")), Some(json("2")));
        assert_eq!(bucket.get(&Key::new("a")), None);
        assert_eq!(bucket.remove(&Key::new("a")), None);
    }

    #[test]
    fn test_conditional_get_filters_by_predicate() {
        // ARRANGE
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json(r#"{"status":"open"}"#));

        // ACT
        let open: Predicate = "json:status=open".parse().unwrap();
        let closed: Predicate = "json:status=closed".parse().unwrap();

        // ASSERT
        assert!(bucket.conditional_get(&Key::new("a"), &open).unwrap().is_some());
        assert!(bucket.conditional_get(&Key::new("a"), &closed).unwrap().is_none());
        assert!(bucket.conditional_get(&Key::new("b"), &open).unwrap().is_none());
    }

    #[test]
    fn test_unregistered_condition_is_unsatisfiable() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("{}"));

        let predicate: Predicate = "notfound:true".parse().unwrap();
        let result = bucket.conditional_get(&Key::new("a"), &predicate);

        assert_eq!(
            result,
            Err(StoreError::UnsatisfiableCondition {
                condition: "notfound".to_string()
            })
        );
    }

    #[test]
    fn test_conditional_put() {
        // ARRANGE
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        let predicate: Predicate = "json:version=1".parse().unwrap();

        // ACT + ASSERT: absent key is written
        bucket
            .conditional_put(Key::new("a"), json(r#"{"version":1}"#), &predicate)
            .unwrap();

        // ACT + ASSERT: current value matches
        bucket
            .conditional_put(Key::new("a"), json(r#"{"version":2}"#), &predicate)
            .unwrap();
        assert_eq!(bucket.get(&Key::new("a")), Some(json(r#"{"version":2}"#)));

        // ACT + ASSERT: current value no longer matches
        let result = bucket.conditional_put(Key::new("a"), json(r#"{"version":3}"#), &predicate);
        assert!(matches!(result, Err(StoreError::ConditionFailed { .. })));
        assert_eq!(bucket.get(&Key::new("a")), Some(json(r#"{"version":2}"#)));
    }

    #[test]
    fn test_predicate_parsing() {
        let predicate: Predicate = "json:a=b:c".parse().unwrap();
        assert_eq!(predicate.condition, "json");
        assert_eq!(predicate.expression, "a=b:c");
        assert_eq!(predicate.to_string(), "json:a=b:c");

        assert!("no-separator".parse::<Predicate>().is_err());
        assert!(":expr".parse::<Predicate>().is_err());
    }

    // ============================================================
    // TEST 2: Updates
    // ============================================================

    #[test]
    fn test_update_with_builtin_functions() {
        // ARRANGE
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json(r#"{"title":"draft"}"#));

        // ACT
        let merged = bucket
            .update(&Key::new("a"), &update("merge", 1000, &[("owner", "ana")]))
            .unwrap();

        // ASSERT
        let document = merged.to_json().unwrap();
        assert_eq!(document["title"], "draft");
        assert_eq!(document["owner"], "ana");
        assert_eq!(bucket.get(&Key::new("a")), Some(merged));

        // ACT
        let replaced = bucket
            .update(&Key::new("a"), &update("replace", 1000, &[("title", "final")]))
            .unwrap();

        // ASSERT
        assert_eq!(replaced.to_json().unwrap(), serde_json::json!({"title": "final"}));
    }

    #[test]
    fn test_update_failures() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("{}"));

        let missing = bucket.update(&Key::new("b"), &update("merge", 1000, &[]));
        assert!(matches!(missing, Err(StoreError::KeyNotFound { .. })));

        let unknown = bucket.update(&Key::new("a"), &update("explode", 1000, &[]));
        assert!(matches!(unknown, Err(StoreError::UnknownFunction { .. })));
    }

    #[test]
    fn test_update_exceeding_timeout_is_rejected() {
        // ARRANGE: a function slower than its timeout
        let dir = tempfile::tempdir().unwrap();
        let operators = Operators::with_defaults();
        operators.register_function("slow", |_key, value, _params, _deadline| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(value.clone())
        });
        let store = MemoryStore::new(operators, BackupManager::new(dir.path()));
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("{}"));

        // ACT
        let result = bucket.update(&Key::new("a"), &update("slow", 10, &[]));

        // ASSERT
        assert_eq!(
            result,
            Err(StoreError::Timeout {
                function: "slow".to_string()
            })
        );
    }

    // ============================================================
    // TEST 3: Queries
    // ============================================================

    #[test]
    fn test_range_query_lexical_with_limit() {
        // ARRANGE
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        for key in ["a", "b", "c", "d", "e"] {
            bucket.put(Key::new(key), json("{}"));
        }

        // ACT
        let bounded = bucket
            .range(&Range::new("b", Some(Key::new("d"))), None)
            .unwrap();
        let limited = bucket.range(&Range::new("b", None).with_limit(2), None).unwrap();

        // ASSERT
        let keys = |entries: Vec<(Key, Value)>| -> Vec<String> {
            entries.into_iter().map(|(k, _)| k.to_string()).collect()
        };
        assert_eq!(keys(bounded), vec!["b", "c", "d"]);
        assert_eq!(keys(limited), vec!["b", "c"]);
    }

    #[test]
    fn test_range_query_numeric_comparator() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        for key in ["1", "2", "10", "20"] {
            bucket.put(Key::new(key), json("{}"));
        }

        let range = Range::new("2", Some(Key::new("10"))).with_comparator("numeric");
        let keys: Vec<String> = bucket
            .range(&range, None)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect();

        assert_eq!(keys, vec!["2", "10"]);
    }

    #[test]
    fn test_range_query_with_predicate_and_unknown_comparator() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json(r#"{"kind":"x"}"#));
        bucket.put(Key::new("b"), json(r#"{"kind":"y"}"#));

        let predicate: Predicate = "json:kind=y".parse().unwrap();
        let filtered = bucket.range(&Range::new("a", None), Some(&predicate)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].0, Key::new("b"));

        let unknown = bucket.range(&Range::new("a", None).with_comparator("reverse"), None);
        assert!(matches!(unknown, Err(StoreError::UnknownComparator { .. })));
    }

    #[test]
    fn test_predicate_query() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json(r#"{"tag":"red"}"#));
        bucket.put(Key::new("b"), json(r#"{"tag":"blue"}"#));
        bucket.put(Key::new("c"), json("not json"));

        let matched = bucket.query(&"json:tag=red".parse().unwrap()).unwrap();

        assert_eq!(matched.len(), 1);
        assert!(matched.contains_key(&Key::new("a")));
    }

    // ============================================================
    // TEST 4: Backups
    // ============================================================

    #[test]
    fn test_export_then_import_into_another_store() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let source = MemoryStore::new(Operators::with_defaults(), BackupManager::new(dir.path()));
        let bucket = source.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("1"));
        bucket.put(Key::new("b"), json("2"));

        // ACT
        let exported = bucket.export_backup("docs.bak").unwrap();
        let target = MemoryStore::new(Operators::with_defaults(), BackupManager::new(dir.path()));
        let imported = target
            .get_or_create_bucket("docs")
            .import_backup("docs.bak")
            .unwrap();

        // ASSERT
        assert_eq!(exported, 2);
        assert_eq!(imported, 2);
        let restored = target.get_bucket("docs").unwrap();
        assert_eq!(restored.get(&Key::new("a")), Some(json("1")));
        assert_eq!(restored.get(&Key::new("b")), Some(json("2")));
        assert!(!dir.path().join("docs.bak.partial").exists());
    }

    #[test]
    fn test_import_overwrites_existing_keys() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("old"));
        bucket.export_backup("snapshot").unwrap();

        bucket.put(Key::new("a"), json("new"));
        bucket.put(Key::new("b"), json("extra"));
        bucket.import_backup("snapshot").unwrap();

        assert_eq!(bucket.get(&Key::new("a")), Some(json("old")));
        assert_eq!(bucket.get(&Key::new("b")), Some(json("extra")));
    }

    #[test]
    fn test_backup_names_cannot_escape_backup_dir() {
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");

        for name in ["", ".", "..", "../escape", "nested/file"] {
            assert!(
                matches!(bucket.export_backup(name), Err(StoreError::Backup { .. })),
                "name '{}' should be rejected",
                name
            );
        }
        assert!(matches!(
            bucket.import_backup("missing"),
            Err(StoreError::Backup { .. })
        ));
    }

    #[test]
    fn test_exports_sharing_a_stem_use_distinct_temp_files() {
        // ARRANGE: a leftover temp entry for "snap.json" blocks only that name
        let (store, dir) = store();
        std::fs::create_dir_all(dir.path().join("snap.json.partial")).unwrap();
        let bucket = store.get_or_create_bucket("docs");
        bucket.put(Key::new("a"), json("1"));

        // ACT
        let bak = bucket.export_backup("snap.bak");
        let json_backup = bucket.export_backup("snap.json");

        // ASSERT
        assert_eq!(bak, Ok(1));
        assert!(matches!(json_backup, Err(StoreError::Backup { .. })));
        assert!(dir.path().join("snap.bak").exists());
        assert!(!dir.path().join("snap.partial").exists());
    }

    #[test]
    fn test_backup_keeps_non_utf8_keys_intact() {
        // ARRANGE
        let (store, _dir) = store();
        let bucket = store.get_or_create_bucket("docs");
        let raw = Key::from_bytes(vec![0xff, 0xfe, 0x00]);
        let other = Key::from_bytes(vec![0xfe, 0xff, 0x00]);
        bucket.put(raw.clone(), json("1"));
        bucket.put(other.clone(), json("2"));
        bucket.put(Key::new("plain"), json("3"));

        // ACT
        bucket.export_backup("raw.bak").unwrap();
        let restored = store.get_or_create_bucket("restored");
        let imported = restored.import_backup("raw.bak").unwrap();

        // ASSERT
        assert_eq!(imported, 3);
        assert_eq!(restored.get(&raw), Some(json("1")));
        assert_eq!(restored.get(&other), Some(json("2")));
        assert_eq!(restored.get(&Key::new("plain")), Some(json("3")));
    }

    #[test]
    fn test_key_serialization_is_lossless() {
        let raw = Key::from_bytes(vec![0xff, 0x00, 0x41]);

        // Binary: raw bytes.
        let encoded = bincode::serialize(&raw).unwrap();
        assert_eq!(bincode::deserialize::<Key>(&encoded).unwrap(), raw);

        // JSON: plain string for UTF-8 keys, byte array otherwise.
        assert_eq!(serde_json::to_string(&Key::new("a")).unwrap(), r#""a""#);
        let text = serde_json::to_string(&raw).unwrap();
        assert_eq!(text, "[255,0,65]");
        assert_eq!(serde_json::from_str::<Key>(&text).unwrap(), raw);
        assert_eq!(serde_json::from_str::<Key>(r#""a""#).unwrap(), Key::new("a"));
    }
}
