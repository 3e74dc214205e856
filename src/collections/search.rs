//! Half-interval search over externally sorted sequences.

use std::cmp::Ordering;

/// Returns the index of the first element ordered `>=` the target, or `None`
/// if every element is smaller.
///
/// `compare(i)` must report how element `i` orders relative to the target
/// (`Less` means the element is smaller). The sequence must be sorted so that
/// all `Less` results precede the others. Runs of equal elements resolve to
/// the first element of the run.
pub fn find_first_ge_by<F>(len: usize, mut compare: F) -> Option<usize>
where
    F: FnMut(usize) -> Ordering,
{
    let (mut lo, mut hi) = (0usize, len);

    while lo + 1 < hi {
        let mid = (lo + hi) >> 1;
        if compare(mid) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    // The interval collapses onto [lo, hi) with hi - lo <= 1, but `lo` itself
    // was never probed when it is the lower bound of a fresh interval.
    if lo < len && compare(lo) != Ordering::Less {
        return Some(lo);
    }
    if hi < len && compare(hi) != Ordering::Less {
        return Some(hi);
    }
    None
}

/// Convenience wrapper: searches `items` with a comparator of the form
/// `cmp(items, index, target)`.
pub fn find_first_ge<T, Q, F>(target: &Q, items: &[T], mut cmp: F) -> Option<usize>
where
    Q: ?Sized,
    F: FnMut(&[T], usize, &Q) -> Ordering,
{
    find_first_ge_by(items.len(), |i| cmp(items, i, target))
}
