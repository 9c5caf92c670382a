// src/process/split.rs
use crate::error::LoadError;

/// Split `items` into at most `n` contiguous chunks whose sizes differ by at most one.
///
/// The first `len % n` chunks carry the extra element. Fewer than `n` items give one
/// chunk per item, and an empty input gives no chunks at all.
pub fn divide_into_chunks<T>(items: Vec<T>, n: usize) -> Result<Vec<Vec<T>>, LoadError> {
    if n == 0 {
        return Err(LoadError::Partition(n));
    }

    let len = items.len();
    let n_chunks = n.min(len);
    let mut chunks = Vec::with_capacity(n_chunks);
    if n_chunks == 0 {
        return Ok(chunks);
    }

    let base = len / n_chunks;
    let extra = len % n_chunks;
    let mut rest = items.into_iter();
    for i in 0..n_chunks {
        let size = base + usize::from(i < extra);
        chunks.push(rest.by_ref().take(size).collect());
    }
    Ok(chunks)
}
