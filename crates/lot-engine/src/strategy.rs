//! Accounting Method Strategies
//!
//! Each method is a total order over the open lots of one asset.
//! Selection consumes lot-by-lot in that order until the disposal
//! quantity is satisfied.

use crate::lot::Lot;
use fiscal_core::AccountingMethod;

/// Indices of `lots` in the order the given method consumes them.
/// Exhausted lots are excluded.
///
/// - FIFO: oldest acquisition first
/// - LIFO: newest acquisition first
/// - HIFO: highest unit cost first, ties broken oldest-first
/// - SpecificSource: lots whose source matches `counterpart_source`,
///   oldest-first; falls back to FIFO over all lots when none match
pub fn candidate_order(
    method: AccountingMethod,
    lots: &[Lot],
    counterpart_source: Option<&str>,
) -> Vec<usize> {
    let open = |i: &usize| lots[*i].remaining_quantity > rust_decimal::Decimal::ZERO;
    let mut indices: Vec<usize> = (0..lots.len()).filter(open).collect();

    match method {
        AccountingMethod::Fifo => {
            indices.sort_by_key(|&i| (lots[i].acquired_at, i));
        }
        AccountingMethod::Lifo => {
            indices.sort_by_key(|&i| (std::cmp::Reverse(lots[i].acquired_at), i));
        }
        AccountingMethod::Hifo => {
            indices.sort_by_key(|&i| (std::cmp::Reverse(lots[i].unit_cost), lots[i].acquired_at, i));
        }
        AccountingMethod::SpecificSource => {
            let matching: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&i| {
                    counterpart_source.is_some()
                        && lots[i].source_id.as_deref() == counterpart_source
                })
                .collect();
            if matching.is_empty() {
                // No lot from the disposing exchange: FIFO across the
                // full remaining inventory
                indices.sort_by_key(|&i| (lots[i].acquired_at, i));
            } else {
                indices = matching;
                indices.sort_by_key(|&i| (lots[i].acquired_at, i));
            }
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn lot(id: &str, cost: Decimal, day: i64, source: Option<&str>) -> Lot {
        Lot {
            id: id.to_string(),
            asset: "BTC".to_string(),
            remaining_quantity: dec!(1),
            unit_cost: cost,
            acquired_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            acquiring_tx_id: format!("tx-{}", id),
            source_id: source.map(|s| s.to_string()),
            synthetic: false,
        }
    }

    #[test]
    fn test_fifo_oldest_first() {
        let lots = vec![lot("b", dec!(200), 10, None), lot("a", dec!(100), 0, None)];
        assert_eq!(candidate_order(AccountingMethod::Fifo, &lots, None), vec![1, 0]);
    }

    #[test]
    fn test_lifo_newest_first() {
        let lots = vec![lot("a", dec!(100), 0, None), lot("b", dec!(200), 10, None)];
        assert_eq!(candidate_order(AccountingMethod::Lifo, &lots, None), vec![1, 0]);
    }

    #[test]
    fn test_hifo_ties_broken_oldest_first() {
        let lots = vec![
            lot("newer", dec!(200), 10, None),
            lot("older", dec!(200), 0, None),
            lot("cheap", dec!(50), 5, None),
        ];
        assert_eq!(
            candidate_order(AccountingMethod::Hifo, &lots, None),
            vec![1, 0, 2]
        );
    }

    #[test]
    fn test_specific_source_restricts_candidates() {
        let lots = vec![
            lot("a", dec!(100), 0, Some("kraken")),
            lot("b", dec!(200), 5, Some("binance")),
            lot("c", dec!(300), 10, Some("binance")),
        ];
        assert_eq!(
            candidate_order(AccountingMethod::SpecificSource, &lots, Some("binance")),
            vec![1, 2]
        );
    }

    #[test]
    fn test_specific_source_falls_back_to_fifo() {
        let lots = vec![
            lot("b", dec!(200), 5, Some("binance")),
            lot("a", dec!(100), 0, Some("kraken")),
        ];
        assert_eq!(
            candidate_order(AccountingMethod::SpecificSource, &lots, Some("coinbase")),
            vec![1, 0]
        );
    }

    #[test]
    fn test_exhausted_lots_excluded() {
        let mut lots = vec![lot("a", dec!(100), 0, None), lot("b", dec!(200), 10, None)];
        lots[0].remaining_quantity = Decimal::ZERO;
        assert_eq!(candidate_order(AccountingMethod::Fifo, &lots, None), vec![1]);
    }
}
