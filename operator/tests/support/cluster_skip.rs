//! Skip policy for suites that need an embedded PostgreSQL cluster.
//!
//! Setting `SKIP_TEST_CLUSTER` to a truthy value turns cluster start-up
//! failures into a logged skip instead of a test failure.

/// Whether `SKIP_TEST_CLUSTER` is `1`, `true` or `yes` (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Report a cluster set-up failure.
///
/// Prints a `SKIP-TEST-CLUSTER` marker and returns `None` when skipping is
/// enabled; panics otherwise so CI breakage stays visible.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
