//! Directory hashes must not depend on the order the filesystem lists entries.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use strata_cache::{DefaultFileHashCache, FileHashCache};
use strata_fs::InMemoryFilesystem;

fn tree_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::btree_map("[a-z]{1,6}(/[a-z]{1,6})?", prop::collection::vec(any::<u8>(), 0..32), 1..12)
        .prop_map(|files: BTreeMap<String, Vec<u8>>| files.into_iter().collect())
}

/// Drops files whose path is also used as a directory by another file.
fn without_conflicts(files: Vec<(String, Vec<u8>)>) -> Vec<(String, Vec<u8>)> {
    let dirs: Vec<String> = files
        .iter()
        .filter_map(|(p, _)| p.split_once('/').map(|(d, _)| d.to_string()))
        .collect();
    files
        .into_iter()
        .filter(|(p, _)| !dirs.contains(p))
        .collect()
}

fn hash_tree(files: &[(String, Vec<u8>)]) -> strata_cache::HashRecord {
    let fs = Arc::new(InMemoryFilesystem::new());
    for (path, contents) in files {
        fs.write(format!("root/{path}"), contents);
    }
    DefaultFileHashCache::new(fs).get(Path::new("root")).unwrap()
}

proptest! {
    #[test]
    fn shuffled_insertion_order_hashes_identically(
        (files, shuffled) in tree_strategy()
            .prop_map(without_conflicts)
            .prop_flat_map(|files| (Just(files.clone()), Just(files).prop_shuffle()))
    ) {
        prop_assert_eq!(hash_tree(&files), hash_tree(&shuffled));
    }

    #[test]
    fn changing_one_byte_changes_the_hash(files in tree_strategy().prop_map(without_conflicts)) {
        let before = hash_tree(&files);
        let mut changed = files.clone();
        changed[0].1.push(0xff);
        prop_assert_ne!(before, hash_tree(&changed));
    }
}

#[test]
fn on_disk_directory_hash_matches_in_memory_hash() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("root/sub")).unwrap();
    std::fs::write(dir.path().join("root/b.txt"), "b").unwrap();
    std::fs::write(dir.path().join("root/a.txt"), "a").unwrap();
    std::fs::write(dir.path().join("root/sub/c.txt"), "c").unwrap();

    let disk = Arc::new(strata_fs::DiskFilesystem::new(dir.path()).unwrap());
    let on_disk = DefaultFileHashCache::new(disk).get(Path::new("root")).unwrap();

    let in_memory = hash_tree(&[
        ("sub/c.txt".to_string(), b"c".to_vec()),
        ("a.txt".to_string(), b"a".to_vec()),
        ("b.txt".to_string(), b"b".to_vec()),
    ]);
    assert_eq!(on_disk, in_memory);
}
