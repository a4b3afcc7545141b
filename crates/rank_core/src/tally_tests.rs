use super::*;
use proptest::prelude::*;

fn keys(tally: &Tally<&'static str>) -> Vec<&'static str> {
    tally.iter().map(|(key, _)| *key).collect()
}

#[test]
fn test_iterates_descending() {
    let mut tally = Tally::new();
    tally.put("low", 1.0);
    tally.put("high", 9.0);
    tally.put("mid", 5.0);

    assert_eq!(keys(&tally), vec!["high", "mid", "low"]);
    assert_eq!(tally.first(), Some((&"high", 9.0)));
}

#[test]
fn test_ties_keep_insertion_order() {
    let mut tally = Tally::new();
    tally.put("b", 2.0);
    tally.put("a", 2.0);
    tally.put("c", 2.0);
    assert_eq!(keys(&tally), vec!["b", "a", "c"]);

    // Overwriting does not move a key behind later arrivals
    tally.put("b", 1.0);
    tally.put("b", 2.0);
    assert_eq!(keys(&tally), vec!["b", "a", "c"]);
}

#[test]
fn test_put_returns_previous() {
    let mut tally = Tally::new();
    assert_eq!(tally.put("x", 3.0), None);
    assert_eq!(tally.put("x", 4.5), Some(3.0));
    assert_eq!(tally.get(&"x"), Some(4.5));
    assert_eq!(tally.len(), 1);
}

#[test]
fn test_sum_starts_at_zero() {
    let mut tally = Tally::new();
    assert_eq!(tally.sum("x", 2.0), 2.0);
    assert_eq!(tally.sum("x", -0.5), 1.5);
    assert_eq!(tally.get(&"y"), None);
}

#[test]
fn test_balanced_add_frequency() {
    let mut tally = Tally::new();
    tally.balanced_add(&["a", "b"], &Frequency);
    tally.balanced_add(&["a"], &Frequency);

    assert_eq!(tally.get(&"a"), Some(2.0));
    assert_eq!(tally.get(&"b"), Some(1.0));
}

#[test]
fn test_balanced_add_split() {
    let mut tally = Tally::new();
    tally.balanced_add(&["a", "b", "c", "d"], &Split);
    tally.balanced_add(&["a"], &Split);

    assert_eq!(tally.get(&"a"), Some(1.25));
    assert_eq!(tally.get(&"d"), Some(0.25));
    let total: f64 = tally.iter().map(|(_, value)| value).sum();
    assert!((total - 2.0).abs() < 1e-12);
}

#[test]
fn test_remove_and_clear() {
    let mut tally: Tally<&str> = [("a", 1.0), ("b", 2.0)].into_iter().collect();
    assert_eq!(tally.remove(&"a"), Some(1.0));
    assert_eq!(tally.remove(&"a"), None);
    assert_eq!(keys(&tally), vec!["b"]);

    tally.clear();
    assert!(tally.is_empty());
    assert_eq!(tally.first(), None);
}

#[test]
fn test_top_two() {
    let mut tally = Tally::new();
    assert_eq!(tally.top_two(), (None, None));

    tally.sum("a", 1.0);
    assert_eq!(tally.top_two(), (Some((&"a", 1.0)), None));

    tally.sum("b", 3.0);
    tally.sum("c", 2.0);
    assert_eq!(tally.top_two(), (Some((&"b", 3.0)), Some((&"c", 2.0))));
}

proptest! {
    #[test]
    fn prop_iteration_is_sorted(ops in prop::collection::vec((0u8..16, -100.0f64..100.0), 0..128)) {
        let mut tally = Tally::new();
        for (key, delta) in ops {
            tally.sum(key, delta);
        }

        let values: Vec<f64> = tally.iter().map(|(_, value)| value).collect();
        prop_assert_eq!(values.len(), tally.len());
        for pair in values.windows(2) {
            prop_assert!(pair[0] >= pair[1]);
        }
    }
}
