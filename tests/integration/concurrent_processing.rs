//! Integration tests for the worker pool and tree processors

use crate::integration::{sample_project, wide_project};
use projtree::concurrency::{
    process_concurrent_files, process_tree, process_tree_bfs, ExecContext, WorkerPool,
};
use projtree::config::PoolConfig;
use projtree::tree::Node;
use projtree::TreeError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_pool_defaults_to_cpu_count() {
    assert_eq!(WorkerPool::new(0).workers(), num_cpus::get().max(1));
    assert_eq!(WorkerPool::default().workers(), num_cpus::get().max(1));
    assert_eq!(WorkerPool::from_config(&PoolConfig { workers: 7 }).workers(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_tree_reaches_every_node_once() {
    let (_dir, project) = sample_project();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let results = process_tree(
        &ExecContext::background(),
        &WorkerPool::new(3),
        Arc::clone(project.root()),
        move |node: &Arc<Node>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(node.is_dir())
        },
    )
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), project.get_total_nodes());
    assert_eq!(results.len(), project.get_total_nodes());
    assert!(*results["/src"].as_ref().unwrap());
    assert!(!*results["/src/a.rs"].as_ref().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bfs_levels_complete_in_order() {
    let (_dir, project) = wide_project(5, 4);
    let finished = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = Arc::clone(&finished);

    let results = process_tree_bfs(
        &ExecContext::background(),
        &WorkerPool::new(4),
        Arc::clone(project.root()),
        move |node: &Arc<Node>| {
            let depth = node.path().matches('/').count() - usize::from(node.path() == "/");
            std::thread::sleep(Duration::from_millis(1));
            log.lock().push(depth);
            Ok(depth)
        },
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 26);
    let depths = finished.lock().clone();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*results["/dir_004/file_003.txt"].as_ref().unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_node_failures_stay_in_their_slot() {
    let (_dir, project) = sample_project();
    let results = process_concurrent_files(
        &ExecContext::background(),
        &WorkerPool::new(2),
        project.root(),
        |node: &Arc<Node>| {
            if node.name() == "lib.rs" {
                panic!("cannot parse");
            }
            if node.name() == "guide.md" {
                return Err(TreeError::InvalidPath(node.path()));
            }
            Ok(node.read_content()?.len())
        },
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 5);
    assert!(matches!(results["/src/lib.rs"], Err(TreeError::WorkerPanic { .. })));
    assert!(matches!(results["/docs/guide.md"], Err(TreeError::InvalidPath(_))));
    assert_eq!(*results["/README.md"].as_ref().unwrap(), 8);
    assert_eq!(*results["/src/nested/deep.rs"].as_ref().unwrap(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_file_reads_share_one_load() {
    let (_dir, project) = sample_project();
    let node = project.find_node("/src/a.rs").unwrap();
    let pool = WorkerPool::new(8);

    let work: Vec<_> = (0..32)
        .map(|_| {
            let node = Arc::clone(&node);
            move || node.read_content()
        })
        .collect();
    let results = pool.execute(&ExecContext::background(), work).await.unwrap();

    assert!(results
        .iter()
        .all(|r| r.as_ref().map(|c| c.as_slice() == b"pub fn a() {}").unwrap_or(false)));
    assert!(node.is_content_loaded());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_canceled_processing_reports_context_error() {
    let (_dir, project) = wide_project(2, 2);
    let ctx = ExecContext::background();
    ctx.cancel();

    let result = process_tree(&ctx, &WorkerPool::new(2), Arc::clone(project.root()), |_: &Arc<Node>| {
        Ok(())
    })
    .await;
    assert!(matches!(result, Err(TreeError::Canceled)));
}
