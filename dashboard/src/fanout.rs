use std::future::Future;
use tokio::task::JoinSet;

/// Run one task per item concurrently and return the outputs in input order.
///
/// All tasks are spawned before any is awaited, so N independent upstream
/// calls take one round trip instead of N. A task that panics leaves `None`
/// in its slot.
pub async fn join_in_order<I, F, Fut, T>(items: Vec<I>, f: F) -> Vec<Option<T>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut join_set = JoinSet::new();
    let len = items.len();

    for (index, item) in items.into_iter().enumerate() {
        let task = f(item);
        join_set.spawn(async move { (index, task.await) });
    }

    let mut results: Vec<Option<T>> = (0..len).map(|_| None).collect();
    while let Some(join_result) = join_set.join_next().await {
        match join_result {
            Ok((index, output)) => results[index] = Some(output),
            Err(e) => tracing::error!("Task panicked: {}", e),
        }
    }
    results
}
