// Folder placeholder invariant across mixed file operations

use std::collections::BTreeSet;
use std::sync::Arc;

use fiacloud_lib::services::storage::{build_tree, FileManager, MemoryStorage};
use fiacloud_lib::utils::object_key;

/// Every folder that appears in a key holds a placeholder iff it holds
/// nothing else
fn assert_sentinel_invariant(keys: &[String]) {
    let mut folders = BTreeSet::new();
    for key in keys {
        let mut current = object_key::parent_folder(key);
        while let Some(folder) = current {
            folders.insert(folder.to_string());
            current = object_key::parent_folder(folder);
        }
    }

    for folder in folders {
        let prefix = object_key::folder_prefix(&folder);
        let placeholder = object_key::placeholder_key(&folder);
        let has_placeholder = keys.contains(&placeholder);
        let others = keys
            .iter()
            .filter(|k| k.starts_with(&prefix) && **k != placeholder)
            .count();
        assert_eq!(
            has_placeholder,
            others == 0,
            "folder {} placeholder={} others={} in {:?}",
            folder,
            has_placeholder,
            others,
            keys
        );
    }
}

#[tokio::test]
async fn test_documented_readme_example() {
    let storage = Arc::new(MemoryStorage::new());
    let files = FileManager::new(storage.clone());

    files.create_folder("docs", None).await.unwrap();
    assert_eq!(storage.keys(), vec!["docs/new.fiacloud"]);

    files
        .upload_file("readme.txt", b"read me".to_vec(), Some("docs"), None)
        .await
        .unwrap();
    assert_eq!(storage.keys(), vec!["docs/readme.txt"]);

    files.delete_file("docs/readme.txt").await.unwrap();
    assert_eq!(storage.keys(), vec!["docs/new.fiacloud"]);
}

#[tokio::test]
async fn test_invariant_over_operation_sequence() {
    let storage = Arc::new(MemoryStorage::new());
    let files = FileManager::new(storage.clone());

    files.create_folder("/projects/", None).await.unwrap();
    assert_sentinel_invariant(&storage.keys());

    files.create_folder("rust", Some("projects")).await.unwrap();
    assert_sentinel_invariant(&storage.keys());

    files
        .create_text_file("main.rs", Some("projects/rust"), "fn main() {}")
        .await
        .unwrap();
    assert_sentinel_invariant(&storage.keys());

    files.create_folder("archive", None).await.unwrap();
    files
        .rename_file("projects/rust/main.rs", "archive/main.rs")
        .await
        .unwrap();
    assert_sentinel_invariant(&storage.keys());
    assert!(storage.contains("projects/rust/new.fiacloud"));
    assert!(!storage.contains("archive/new.fiacloud"));

    files
        .upload_file("logo.png", vec![0x89, 0x50], Some("projects"), None)
        .await
        .unwrap();
    files.delete_folder("projects/rust").await.unwrap();
    assert_sentinel_invariant(&storage.keys());
    assert!(!storage.contains("projects/new.fiacloud"));

    files.delete_file("projects/logo.png").await.unwrap();
    assert_sentinel_invariant(&storage.keys());
    assert!(storage.contains("projects/new.fiacloud"));

    // Writes deep below an existing folder clear every enclosing placeholder
    files
        .upload_file("spec.md", b"# spec".to_vec(), Some("archive/2024/q1"), None)
        .await
        .unwrap();
    assert_sentinel_invariant(&storage.keys());

    files.create_folder("drafts/notes", None).await.unwrap();
    files.create_folder("drafts/notes/old", None).await.unwrap();
    assert_sentinel_invariant(&storage.keys());
    assert!(!storage.contains("drafts/notes/new.fiacloud"));

    files.create_folder("inbox", None).await.unwrap();
    files
        .rename_file("archive/2024/q1/spec.md", "inbox/2024/spec.md")
        .await
        .unwrap();
    assert_sentinel_invariant(&storage.keys());
    assert!(!storage.contains("inbox/new.fiacloud"));
    assert!(storage.contains("archive/2024/q1/new.fiacloud"));

    files.delete_folder("drafts").await.unwrap();
    files.delete_folder("inbox").await.unwrap();
    files.delete_folder("archive/2024").await.unwrap();
    assert_sentinel_invariant(&storage.keys());

    let tree = build_tree(&files.list_files().await.unwrap());
    let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "projects"]);
    assert!(tree[1].children.is_empty());
}
