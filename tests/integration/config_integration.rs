//! Integration tests for configuration-driven setup

use projtree::concurrency::WorkerPool;
use projtree::config::{ConfigLoader, EngineConfig};
use projtree::traverse::{TraversalOptions, TraversalOrder};
use projtree::tree::walker::WalkerConfig;
use projtree::tree::Project;
use projtree::TreeError;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_project_file_drives_components() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("projtree.toml"),
        r#"
[pool]
workers = 2

[traversal]
order = "in_order"
max_concurrency = 5
timeout_ms = 750

[sync]
ignore_patterns = ["node_modules"]
"#,
    )
    .unwrap();
    fs::create_dir_all(temp_dir.path().join("node_modules").join("dep")).unwrap();
    fs::write(temp_dir.path().join("index.js"), "main").unwrap();

    let config = ConfigLoader::load_from_file(&temp_dir.path().join("projtree.toml")).unwrap();

    assert_eq!(WorkerPool::from_config(&config.pool).workers(), 2);

    let options = TraversalOptions::from_config(&config.traversal);
    assert_eq!(options.order, TraversalOrder::InOrder);
    assert_eq!(options.max_concurrency, 5);
    assert_eq!(options.timeout, Some(Duration::from_millis(750)));

    let project =
        Project::load_with_walker_config(temp_dir.path(), WalkerConfig::from(&config.sync)).unwrap();
    assert!(project.find_node("/node_modules").is_err());
    assert!(project.find_node("/index.js").is_ok());
    assert!(project.find_node("/projtree.toml").is_ok());
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("projtree.toml");
    fs::write(&path, "[traversal]\norder = \"sideways\"\n").unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&path),
        Err(TreeError::Config(_))
    ));
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")),
        Err(TreeError::Config(_))
    ));
}

#[test]
fn test_defaults_validate() {
    assert!(EngineConfig::default().validate().is_ok());
}
