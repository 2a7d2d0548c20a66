//! Step sequencing that skips locked steps.
//!
//! Both functions are pure. When nothing navigable exists in the scan
//! direction the current index is returned, clamped into `0..step_count`.

use std::collections::BTreeSet;

/// Smallest index `> current` not in `locked`, or `current` if none.
pub fn next_step(current: usize, locked: &BTreeSet<usize>, step_count: usize) -> usize {
    if step_count == 0 {
        return 0;
    }
    let last = step_count - 1;
    let current = current.min(last);

    (current + 1..step_count)
        .find(|i| !locked.contains(i))
        .unwrap_or(current)
}

/// Largest index `< current` not in `locked`, or `current` if none.
pub fn prev_step(current: usize, locked: &BTreeSet<usize>) -> usize {
    (0..current)
        .rev()
        .find(|i| !locked.contains(i))
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_next_without_locks_advances_by_one() {
        assert_eq!(next_step(0, &locked(&[]), 5), 1);
        assert_eq!(next_step(3, &locked(&[]), 5), 4);
    }

    #[test]
    fn test_next_skips_locked_step() {
        assert_eq!(next_step(0, &locked(&[1]), 5), 2);
        assert_eq!(next_step(0, &locked(&[1, 2, 3]), 5), 4);
    }

    #[test]
    fn test_next_at_last_step_stays() {
        assert_eq!(next_step(4, &locked(&[]), 5), 4);
    }

    #[test]
    fn test_next_with_everything_ahead_locked_stays() {
        assert_eq!(next_step(2, &locked(&[3, 4]), 5), 2);
    }

    #[test]
    fn test_next_from_locked_current_scans_outward() {
        assert_eq!(next_step(0, &locked(&[0, 1]), 5), 2);
    }

    #[test]
    fn test_next_clamps_out_of_range_current() {
        assert_eq!(next_step(9, &locked(&[]), 5), 4);
        assert_eq!(next_step(0, &locked(&[]), 0), 0);
        assert_eq!(next_step(0, &locked(&[]), 1), 0);
    }

    #[test]
    fn test_prev_skips_locked_step() {
        assert_eq!(prev_step(3, &locked(&[2])), 1);
        assert_eq!(prev_step(3, &locked(&[])), 2);
    }

    #[test]
    fn test_prev_at_zero_stays() {
        assert_eq!(prev_step(0, &locked(&[])), 0);
    }

    #[test]
    fn test_prev_with_everything_behind_locked_stays() {
        assert_eq!(prev_step(2, &locked(&[0, 1])), 2);
    }

    #[test]
    fn test_next_property_over_small_domain() {
        for step_count in 1..6 {
            for current in 0..step_count {
                for mask in 0u32..(1 << step_count) {
                    let locks: BTreeSet<usize> =
                        (0..step_count).filter(|i| mask & (1 << i) != 0).collect();
                    let next = next_step(current, &locks, step_count);
                    assert!(next < step_count);
                    let expected = (current + 1..step_count).find(|i| !locks.contains(i));
                    match expected {
                        Some(e) => assert_eq!(next, e),
                        None => assert_eq!(next, current),
                    }
                }
            }
        }
    }

    #[test]
    fn test_prev_property_over_small_domain() {
        for current in 0..6usize {
            for mask in 0u32..(1 << 6) {
                let locks: BTreeSet<usize> = (0..6).filter(|i| mask & (1 << i) != 0).collect();
                let prev = prev_step(current, &locks);
                assert!(prev <= current);
                match (0..current).rev().find(|i| !locks.contains(i)) {
                    Some(e) => assert_eq!(prev, e),
                    None => assert_eq!(prev, current),
                }
            }
        }
    }
}
