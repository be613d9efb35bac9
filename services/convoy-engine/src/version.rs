//! Engine API version comparison.
//!
//! API versions are dotted decimal strings (`"1.43"`). Comparison is
//! segment-by-segment numeric; missing segments count as zero.

/// Returns true if version `a` is strictly lower than version `b`.
#[must_use]
pub fn less_than(a: &str, b: &str) -> bool {
    compare(a, b) == std::cmp::Ordering::Less
}

fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    let mut left = a.split('.').map(|s| s.parse::<u64>().unwrap_or(0));
    let mut right = b.split('.').map(|s| s.parse::<u64>().unwrap_or(0));
    loop {
        match (left.next(), right.next()) {
            (None, None) => return std::cmp::Ordering::Equal,
            (l, r) => {
                let l = l.unwrap_or(0);
                let r = r.unwrap_or(0);
                if l != r {
                    return l.cmp(&r);
                }
            }
        }
    }
}
