//! Integration tests for path-based project mutation and lookup

use projtree::tree::Project;
use projtree::TreeError;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[test]
fn test_normalized_lookup_after_create() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();

    for raw in ["docs", "/docs/api/", "docs//api/v1", "./notes"] {
        let node = project.create_dir(raw).unwrap();
        let normalized = Project::normalize_path(raw);
        assert_eq!(node.path(), normalized);
        assert_eq!(project.find_node(raw).unwrap().path(), normalized);
    }

    let file = project.create_file("docs/api/index.md").unwrap();
    assert_eq!(file.path(), "/docs/api/index.md");
    assert!(!file.is_dir());
}

#[test]
fn test_write_file_creates_missing_directories() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();

    project.write_file("/a/b/c.txt", "payload").unwrap();

    assert!(project.find_node("/a").unwrap().is_dir());
    assert!(project.find_node("/a/b").unwrap().is_dir());
    let file = project.find_node("/a/b/c.txt").unwrap();
    assert_eq!(file.read_content().unwrap(), b"payload");
    assert!(file.is_modified());
    assert_eq!(project.get_total_nodes(), 4);

    // Directories exist on disk immediately; the file waits for save
    assert!(temp_dir.path().join("a").join("b").is_dir());
    assert!(!temp_dir.path().join("a").join("b").join("c.txt").exists());
}

#[test]
fn test_write_file_overwrites_existing() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();
    let first = project.write_file("/f.txt", "one").unwrap();
    let second = project.write_file("f.txt", "two").unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(project.read_file("/f.txt").unwrap(), b"two");
    assert_eq!(project.get_total_nodes(), 2);
}

#[test]
fn test_write_file_through_a_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();
    project.write_file("/f.txt", "x").unwrap();

    assert!(matches!(
        project.write_file("/f.txt/inner.txt", "y"),
        Err(TreeError::NotADirectory(p)) if p == "/f.txt"
    ));
    assert!(matches!(
        project.write_file("/", "y"),
        Err(TreeError::CannotWriteDirectory(_))
    ));
}

#[test]
fn test_delete_directory_removes_subtree() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("dir1")).unwrap();
    fs::write(temp_dir.path().join("dir1").join("file.txt"), "x").unwrap();
    let project = Project::load(temp_dir.path()).unwrap();

    project.delete_node("/dir1").unwrap();

    assert!(matches!(project.find_node("/dir1"), Err(TreeError::NotFound(_))));
    assert!(matches!(
        project.find_node("/dir1/file.txt"),
        Err(TreeError::NotFound(_))
    ));
    assert!(project.is_empty());
    assert!(!temp_dir.path().join("dir1").exists());
}

#[test]
fn test_delete_errors() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();

    assert!(matches!(project.delete_node("/"), Err(TreeError::CannotDeleteRoot)));
    assert!(matches!(project.delete_node(""), Err(TreeError::CannotDeleteRoot)));
    assert!(matches!(
        project.delete_node("/ghost"),
        Err(TreeError::NotFound(p)) if p == "/ghost"
    ));
}

#[test]
fn test_create_requires_existing_parent() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();

    assert!(matches!(
        project.create_file("/missing/f.txt"),
        Err(TreeError::NotFound(p)) if p == "/missing"
    ));
    assert!(matches!(
        project.create_dir("/missing/sub"),
        Err(TreeError::NotFound(_))
    ));
    // Failed creates leave nothing behind
    assert!(project.is_empty());
}

#[test]
fn test_directory_content_operations_fail() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();
    let dir = project.create_dir("/d").unwrap();

    assert!(matches!(
        dir.read_content(),
        Err(TreeError::CannotReadDirectory(_))
    ));
    assert!(matches!(
        dir.write_content("x"),
        Err(TreeError::CannotWriteDirectory(_))
    ));
}

#[test]
fn test_lazy_file_node_loads_on_read() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("existing.txt"), "on disk").unwrap();
    let project = Project::new(temp_dir.path()).unwrap();

    let node = project.create_file_node("/existing.txt").unwrap();
    assert!(!node.is_content_loaded());
    assert_eq!(node.read_content().unwrap(), b"on disk");
    assert!(node.is_content_loaded());
    assert!(!node.is_modified());

    // Placeholder written when nothing exists yet
    let fresh = project.create_file_node("/fresh.txt").unwrap();
    assert!(temp_dir.path().join("fresh.txt").is_file());
    assert!(fresh.read_content().unwrap().is_empty());
}

#[test]
fn test_list_paths_and_counts() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();
    project.create_dir("/b").unwrap();
    project.create_file_with_content("/b/two.txt", "2").unwrap();
    project.create_file_with_content("/a.txt", "1").unwrap();

    assert_eq!(project.list_paths(), vec!["/", "/a.txt", "/b", "/b/two.txt"]);
    assert_eq!(project.get_total_nodes(), 4);
    assert_eq!(project.root().count_nodes(), 4);
    assert_eq!(project.root().list_files(), vec!["a.txt"]);
    assert_eq!(
        project.get_node_path(&project.find_node("/b/two.txt").unwrap()),
        "/b/two.txt"
    );
}

#[test]
fn test_write_file_never_lands_on_deleted_node() {
    for _ in 0..200 {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::new(temp_dir.path()).unwrap();
        let seed = project.write_file("/race.txt", "seed").unwrap();
        project.save_to_fs().unwrap();
        assert!(!seed.is_modified());

        let barrier = Arc::new(Barrier::new(2));
        let writer = {
            let project = Arc::clone(&project);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                project.write_file("/race.txt", "fresh").unwrap()
            })
        };
        let deleter = {
            let project = Arc::clone(&project);
            let barrier = Arc::clone(&barrier);
            let seed = Arc::clone(&seed);
            thread::spawn(move || {
                barrier.wait();
                project.delete_node("/race.txt").unwrap();
                seed.is_modified()
            })
        };

        let written = writer.join().unwrap();
        let modified_when_deleted = deleter.join().unwrap();

        if Arc::ptr_eq(&written, &seed) {
            // The write hit the seed node, so it must have finished before the delete
            assert!(modified_when_deleted);
            assert!(project.find_node("/race.txt").is_err());
        } else {
            // The delete came first and the write recreated the file
            assert!(!seed.is_modified());
            let current = project.find_node("/race.txt").unwrap();
            assert!(Arc::ptr_eq(&current, &written));
            assert_eq!(current.read_content().unwrap(), b"fresh");
        }
    }
}
