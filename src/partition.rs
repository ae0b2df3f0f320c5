//! Even, contiguous distribution of combinatorial work among a fixed number of workers.

/// Split `items` into at most `worker_count` contiguous, nearly-equal chunks.
///
/// At step `k` (starting at `worker_count` and decreasing by one), `ceil(remaining / k)`
/// items are taken off the front. The loop stops when `worker_count` chunks exist or
/// the items are exhausted.
///
/// Arguments
/// -----------------
/// * `items` – ordered work items (e.g. image-index triplets).
/// * `worker_count` – number of workers sharing the load.
///
/// Return
/// ----------
/// * Non-empty chunks with non-increasing sizes whose concatenation is `items`.
///   Fewer than `worker_count` chunks are returned when there are fewer items than
///   workers; no chunk at all for an empty input or `worker_count == 0`.
pub fn partition<T>(items: Vec<T>, worker_count: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(worker_count.min(items.len()));
    let mut remaining = items.into_iter();
    let mut slots = worker_count;

    while chunks.len() != worker_count && remaining.len() != 0 {
        let size = remaining.len().div_ceil(slots);
        chunks.push(remaining.by_ref().take(size).collect());
        slots -= 1;
    }

    chunks
}
