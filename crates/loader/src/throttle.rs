use std::future::Future;

use tokio::task::JoinSet;

/// Runs `result_processor` over `inputs` with at most `concurrency` futures
/// in flight at once, returning results in input order regardless of
/// completion order. Adapted from the teacher's
/// `unused_finder::throttled_async_map`.
pub async fn throttled_async_map<T, Fut, R>(
    concurrency: usize,
    inputs: Vec<T>,
    result_processor: impl Fn(T) -> Fut,
) -> Vec<R>
where
    T: Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let total = inputs.len();
    let limit = concurrency.clamp(1, total.max(1));
    if total == 0 {
        return Vec::new();
    }

    let mut remaining = inputs.into_iter().enumerate();
    let mut join_set: JoinSet<(usize, R)> = JoinSet::new();

    for (idx, input) in remaining.by_ref().take(limit) {
        let fut = result_processor(input);
        join_set.spawn(async move { (idx, fut.await) });
    }

    let mut output: Vec<Option<R>> = (0..total).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (idx, value) = joined.expect("load task panicked");
        output[idx] = Some(value);

        if let Some((next_idx, next_input)) = remaining.next() {
            let fut = result_processor(next_input);
            join_set.spawn(async move { (next_idx, fut.await) });
        }
    }

    output
        .into_iter()
        .map(|slot| slot.expect("every index filled before join_set drains"))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn preserves_order_under_throttling() {
        let inputs = vec![5u32, 1, 4, 1, 5];
        let results = throttled_async_map(2, inputs.clone(), |n| async move {
            tokio::time::sleep(std::time::Duration::from_millis(n as u64)).await;
            n * 2
        })
        .await;
        assert_eq!(results, inputs.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_input_returns_empty_output() {
        let results: Vec<u32> = throttled_async_map(4, vec![], |n: u32| async move { n }).await;
        assert!(results.is_empty());
    }
}
