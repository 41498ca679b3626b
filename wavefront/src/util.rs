//! Small helpers shared by resources

use std::collections::{HashMap, HashSet};

/// Multiset difference of two string slices, ignoring order.
///
/// Returns the items only in `left` and the items only in `right`, each
/// occurrence counted separately.
pub fn compare_string_slice_any_order(left: &[String], right: &[String]) -> (Vec<String>, Vec<String>) {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for item in left {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    for item in right {
        *counts.entry(item.as_str()).or_default() -= 1;
    }

    let mut only_left = Vec::new();
    let mut only_right = Vec::new();
    // Walk the inputs rather than the map to keep first-seen order
    let mut emitted: HashSet<&str> = HashSet::new();
    for item in left.iter().chain(right.iter()) {
        if !emitted.insert(item.as_str()) {
            continue;
        }
        let count = counts.get(item.as_str()).copied().unwrap_or(0);
        if count > 0 {
            only_left.extend(std::iter::repeat(item.clone()).take(count as usize));
        } else if count < 0 {
            only_right.extend(std::iter::repeat(item.clone()).take((-count) as usize));
        }
    }

    (only_left, only_right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn multiset_difference() {
        let (left, right) =
            compare_string_slice_any_order(&strings(&["a", "a", "b"]), &strings(&["a", "b", "b"]));
        assert_eq!(left, strings(&["a"]));
        assert_eq!(right, strings(&["b"]));
    }

    #[test]
    fn order_is_ignored() {
        let (left, right) =
            compare_string_slice_any_order(&strings(&["x", "y"]), &strings(&["y", "x"]));
        assert!(left.is_empty());
        assert!(right.is_empty());
    }

    #[test]
    fn disjoint_inputs() {
        let (left, right) = compare_string_slice_any_order(&strings(&["x"]), &strings(&[]));
        assert_eq!(left, strings(&["x"]));
        assert!(right.is_empty());
    }
}
