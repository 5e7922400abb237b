//! Integration tests for filesystem sync and save

use crate::integration::{sample_project, write_tree};
use projtree::tree::walker::WalkerConfig;
use projtree::tree::Project;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Relative path -> content for every file below `root`
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_empty_directory_yields_root_only() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::load(temp_dir.path()).unwrap();
    assert_eq!(project.get_total_nodes(), 1);
    assert!(project.is_empty());
}

#[test]
fn test_sync_mirrors_disk_layout() {
    let (_dir, project) = sample_project();
    assert_eq!(
        project.list_paths(),
        vec![
            "/",
            "/README.md",
            "/docs",
            "/docs/guide.md",
            "/src",
            "/src/a.rs",
            "/src/lib.rs",
            "/src/nested",
            "/src/nested/deep.rs",
        ]
    );
    // Nothing is read until asked for
    for path in project.list_paths() {
        let node = project.find_node(&path).unwrap();
        assert!(!node.is_content_loaded());
    }
    assert_eq!(project.read_file("/src/nested/deep.rs").unwrap(), b"// deep");
}

#[test]
fn test_sync_then_save_leaves_disk_unchanged() {
    let (dir, project) = sample_project();
    let before = snapshot(dir.path());

    assert_eq!(project.save_to_fs().unwrap(), 0);
    assert_eq!(snapshot(dir.path()), before);

    // Loading content does not make it dirty
    project.read_file("/README.md").unwrap();
    assert_eq!(project.save_to_fs().unwrap(), 0);
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_save_then_resync_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let project = Project::new(temp_dir.path()).unwrap();
    project.write_file("/src/main.rs", "fn main() {}").unwrap();
    project.write_file("/src/util/mod.rs", "").unwrap();
    project.create_dir("/empty").unwrap();
    project.create_file_with_content("/bin.dat", vec![0u8, 159, 255, 10]).unwrap();
    let hash_before = project.calculate_hash().unwrap();

    assert_eq!(project.save_to_fs().unwrap(), 3);
    assert!(temp_dir.path().join("empty").is_dir());

    let reloaded = Project::load(temp_dir.path()).unwrap();
    assert_eq!(reloaded.list_paths(), project.list_paths());
    assert_eq!(reloaded.read_file("/bin.dat").unwrap(), vec![0u8, 159, 255, 10]);
    assert_eq!(reloaded.calculate_hash().unwrap(), hash_before);
}

#[test]
fn test_ignore_patterns_skip_subtrees() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(
        temp_dir.path(),
        &[
            (".git/HEAD", "ref"),
            ("target/debug/out", "bin"),
            ("src/lib.rs", "lib"),
        ],
    );
    let config = WalkerConfig {
        ignore_patterns: vec![".git".to_string(), "target".to_string()],
        ..WalkerConfig::default()
    };
    let project = Project::load_with_walker_config(temp_dir.path(), config).unwrap();
    assert_eq!(project.list_paths(), vec!["/", "/src", "/src/lib.rs"]);
}

#[test]
fn test_resync_picks_up_external_changes() {
    let (dir, project) = sample_project();
    let hash_before = project.calculate_hash().unwrap();

    fs::write(dir.path().join("docs").join("guide.md"), "rewritten").unwrap();
    fs::write(dir.path().join("NEW.md"), "new").unwrap();
    let stats = project.sync_from_fs().unwrap();

    assert_eq!(stats.files, 6);
    assert_eq!(stats.directories, 3);
    assert!(project.find_node("/NEW.md").is_ok());
    assert_ne!(project.calculate_hash().unwrap(), hash_before);
}

#[test]
fn test_load_rejects_missing_root() {
    let temp_dir = TempDir::new().unwrap();
    assert!(Project::load(temp_dir.path().join("nope")).is_err());
}

/// Sorted entry names directly below `dir`
fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_decomposed_names_keep_their_disk_entries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let decomposed = "cafe\u{301}";
    let on_disk = format!("{}/x.txt", decomposed);
    write_tree(root, &[(on_disk.as_str(), "x")]);

    let project = Project::load(root).unwrap();
    let dir_path = Project::normalize_path(decomposed);
    assert_eq!(dir_path, "/caf\u{e9}");
    assert_eq!(project.absolute_path(&dir_path), project.root_path().join(decomposed));
    let before = entry_names(root);

    // Nothing modified: saving must not create a second spelling
    assert_eq!(project.save_to_fs().unwrap(), 0);
    assert_eq!(entry_names(root), before);

    // Writes land in the original entry, new children go beside it
    project.write_file(&format!("{}/x.txt", dir_path), "y").unwrap();
    project.write_file(&format!("{}/new.txt", dir_path), "n").unwrap();
    assert_eq!(project.save_to_fs().unwrap(), 2);
    assert_eq!(entry_names(root), before);
    assert_eq!(fs::read(root.join(decomposed).join("x.txt")).unwrap(), b"y");
    assert_eq!(fs::read(root.join(decomposed).join("new.txt")).unwrap(), b"n");

    project.delete_node(&dir_path).unwrap();
    assert!(entry_names(root).is_empty());
    assert!(project.is_empty());
}

#[test]
fn test_sync_skips_names_colliding_after_normalization() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    // The decomposed spelling sorts first and wins
    write_tree(
        root,
        &[("caf\u{e9}/composed.txt", "c"), ("cafe\u{301}/decomposed.txt", "d")],
    );

    let project = Project::new(root).unwrap();
    let stats = project.sync_from_fs().unwrap();

    assert_eq!(stats.directories, 1);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(
        project.list_paths(),
        vec!["/", "/caf\u{e9}", "/caf\u{e9}/decomposed.txt"]
    );
    assert_eq!(project.read_file("/caf\u{e9}/decomposed.txt").unwrap(), b"d");

    // Both spellings survive an unmodified save
    assert_eq!(project.save_to_fs().unwrap(), 0);
    assert_eq!(entry_names(root).len(), 2);
}
