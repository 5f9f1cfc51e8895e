//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password authentication (argon2id)
//! - `enrollment` - Order reconciliation and batch course enrollment
//! - `suspension` - WordPress account suspension via role stripping

pub mod auth;
pub mod enrollment;
pub mod suspension;

pub use auth::{AuthError, AuthService, hash_new_password};
pub use enrollment::{
    BatchEnrollRequest, BatchItem, BatchOutcome, EnrollmentError, ReconcileOutcome, batch_enroll,
    pending_enrollment, reconcile_order_status,
};
pub use suspension::{SuspensionOutcome, SuspensionResult, suspend_users, unsuspend_users};

use std::future::Future;

use futures::future::join_all;

/// Run `f` over `items` in chunks of `size`, awaiting each chunk concurrently.
///
/// Results come back in input order, one per item.
pub(crate) async fn run_in_chunks<T, R, F, Fut>(items: &[T], size: usize, f: F) -> Vec<R>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(size.max(1)) {
        results.extend(join_all(chunk.iter().map(&f)).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_run_in_chunks_preserves_order() {
        let items = (0..25).collect::<Vec<u32>>();
        let results = run_in_chunks(&items, 10, |n| {
            let n = *n;
            async move { n * 2 }
        })
        .await;

        assert_eq!(results.len(), 25);
        assert_eq!(results[0], 0);
        assert_eq!(results[24], 48);
    }

    #[tokio::test]
    async fn test_run_in_chunks_bounds_concurrency() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items = vec![(); 23];

        run_in_chunks(&items, 5, |_| async {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_run_in_chunks_zero_size_is_sequential() {
        let items = vec![1, 2, 3];
        let results = run_in_chunks(&items, 0, |n| {
            let n = *n;
            async move { n }
        })
        .await;
        assert_eq!(results, vec![1, 2, 3]);
    }
}
