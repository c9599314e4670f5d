//! Polling assertions for async tests.

use std::time::Duration;

use tokio::time::{Instant, sleep};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition held. The condition is evaluated once more
/// after the deadline so a final state change is not missed.
///
/// # Example
///
/// ```no_run
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use std::time::Duration;
/// use catalog_test_utils::assert_eventually;
///
/// # async fn demo() {
/// let passes = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&passes);
/// tokio::spawn(async move {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
/// assert!(assert_eventually(Duration::from_secs(1), || passes.load(Ordering::SeqCst) > 0).await);
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return condition();
        }
        sleep(POLL_INTERVAL).await;
    }
}
