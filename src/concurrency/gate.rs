//! Process-wide traversal gate
//!
//! A counting semaphore capping how many visitor calls run at once across all
//! parallel traversals, independent of any per-call budget.

use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;

/// Permits available when the gate is not configured explicitly
pub const DEFAULT_TRAVERSAL_GATE: usize = 256;

static GATE: OnceLock<Arc<Semaphore>> = OnceLock::new();

/// Size the gate before the first traversal runs
///
/// Returns false if the gate already exists (sized earlier or by first use).
pub fn init_traversal_gate(permits: usize) -> bool {
    GATE.set(Arc::new(Semaphore::new(permits.max(1)))).is_ok()
}

pub(crate) fn traversal_gate() -> Arc<Semaphore> {
    Arc::clone(GATE.get_or_init(|| Arc::new(Semaphore::new(DEFAULT_TRAVERSAL_GATE))))
}

/// Permits currently free in the gate
pub fn available_traversal_permits() -> usize {
    traversal_gate().available_permits()
}
