//! # Ledger Arithmetic
//!
//! Pure stock computations shared by the recorders. The database crate owns
//! the rows; this module decides what to write and whether it is allowed.
//!
//! ## Purchase Update as Net Deltas
//! ```text
//! old receipts              new receipts              net delta
//! ─────────────────         ─────────────────         ─────────────────
//! (P1, Main)  +10           (P1, Main)   +6           (P1, Main)    -4
//! (P1, Back)   +5           (P1, Back)   +5           (skipped: 0)
//! (P2, Main)   +3                                     (P2, Main)    -3
//!                           (P3, Back)   +2           (P3, Back)    +2
//! ```
//! Only rows with a non-zero delta are touched, in key order.

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::StockPolicy;

/// `(product_id, location_id)`: one ledger row.
pub type StockKey = (String, String);

/// Sums receipts into per-row totals.
pub fn sum_by_row<I>(receipts: I) -> BTreeMap<StockKey, i64>
where
    I: IntoIterator<Item = (String, String, i64)>,
{
    let mut totals = BTreeMap::new();
    for (product_id, location_id, quantity) in receipts {
        *totals.entry((product_id, location_id)).or_insert(0) += quantity;
    }
    totals
}

/// Net per-row change from `old` receipts to `new` receipts.
///
/// ## Example
/// ```rust
/// use stockbook_core::ledger::net_deltas;
///
/// let old = vec![("P1".to_string(), "L1".to_string(), 10)];
/// let new = vec![("P1".to_string(), "L1".to_string(), 6)];
///
/// let deltas = net_deltas(old, new);
/// assert_eq!(deltas.get(&("P1".to_string(), "L1".to_string())), Some(&-4));
/// ```
pub fn net_deltas<O, N>(old: O, new: N) -> BTreeMap<StockKey, i64>
where
    O: IntoIterator<Item = (String, String, i64)>,
    N: IntoIterator<Item = (String, String, i64)>,
{
    let mut deltas = sum_by_row(new);
    for (key, quantity) in sum_by_row(old) {
        *deltas.entry(key).or_insert(0) -= quantity;
    }
    deltas.retain(|_, delta| *delta != 0);
    deltas
}

/// Decides whether an applied adjustment may stand.
///
/// `new_quantity` is the row after adding `delta`. A decrement that leaves
/// the row below zero is rejected under [`StockPolicy::Enforce`]; increments
/// are always accepted, even onto a row that is already negative.
///
/// Returns `true` when the row ends up negative and was allowed to.
pub fn check_adjustment(
    policy: StockPolicy,
    product_id: &str,
    location_id: &str,
    new_quantity: i64,
    delta: i64,
) -> CoreResult<bool> {
    if new_quantity >= 0 || delta >= 0 {
        return Ok(new_quantity < 0);
    }

    if policy.is_enforcing() {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            location_id: location_id.to_string(),
            available: new_quantity - delta,
            requested: -delta,
        });
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(p: &str, l: &str, q: i64) -> (String, String, i64) {
        (p.to_string(), l.to_string(), q)
    }

    fn key(p: &str, l: &str) -> StockKey {
        (p.to_string(), l.to_string())
    }

    #[test]
    fn test_net_deltas_matches_module_example() {
        let old = vec![row("P1", "Main", 10), row("P1", "Back", 5), row("P2", "Main", 3)];
        let new = vec![row("P1", "Main", 6), row("P1", "Back", 5), row("P3", "Back", 2)];

        let deltas = net_deltas(old, new);

        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[&key("P1", "Main")], -4);
        assert_eq!(deltas[&key("P2", "Main")], -3);
        assert_eq!(deltas[&key("P3", "Back")], 2);
        assert!(!deltas.contains_key(&key("P1", "Back")));
    }

    #[test]
    fn test_same_row_from_two_lines_is_summed() {
        // the same product bought twice on one purchase, both into Main
        let new = vec![row("P1", "Main", 4), row("P1", "Main", 6)];
        let deltas = net_deltas(Vec::new(), new);
        assert_eq!(deltas[&key("P1", "Main")], 10);
    }

    #[test]
    fn test_empty_new_reverses_everything() {
        let old = vec![row("P1", "Main", 4), row("P2", "Back", 1)];
        let deltas = net_deltas(old, Vec::new());
        assert_eq!(deltas[&key("P1", "Main")], -4);
        assert_eq!(deltas[&key("P2", "Back")], -1);
    }

    #[test]
    fn test_check_adjustment_enforce() {
        // had 3, asked for 5
        let err = check_adjustment(StockPolicy::Enforce, "P1", "L1", -2, -5).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // exactly zero is fine
        assert!(!check_adjustment(StockPolicy::Enforce, "P1", "L1", 0, -3).unwrap());
    }

    #[test]
    fn test_check_adjustment_allow_negative() {
        assert!(check_adjustment(StockPolicy::AllowNegative, "P1", "L1", -2, -5).unwrap());
    }

    #[test]
    fn test_increment_onto_negative_row_is_accepted() {
        assert!(check_adjustment(StockPolicy::Enforce, "P1", "L1", -1, 4).unwrap());
    }
}
