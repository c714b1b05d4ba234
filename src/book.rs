//! Order book materialization and ladder rendering.
//!
//! [`BookView`] folds one snapshot's per-side level lists into sorted
//! price→quantity maps. Level lists arrive in feed order and may repeat a
//! price; a later entry for an already-seen price overwrites the earlier
//! value. [`Ladder`] is the depth-limited, best-first view used for display.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::record::Snapshot;

/// f64 wrapper with a total order, usable as a `BTreeMap` key. Prices from
/// the feed are finite; `partial_cmp` only falls back for NaN.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct OrderedFloat(pub f64);

impl Eq for OrderedFloat {}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Price→quantity maps for both sides, derived from exactly one snapshot.
/// Iteration order is best-first on each side.
#[derive(Debug, Default)]
pub struct BookView {
    /// Bids, highest price first.
    pub bids: BTreeMap<Reverse<OrderedFloat>, f64>,
    /// Asks, lowest price first.
    pub asks: BTreeMap<OrderedFloat, f64>,
}

/// Depth-limited rows for display, best price first on each side.
#[derive(Debug, PartialEq)]
pub struct Ladder {
    pub asks: Vec<(f64, f64)>,
    pub bids: Vec<(f64, f64)>,
}

impl BookView {
    /// Fold a snapshot's level lists into per-side maps, last write wins.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut view = Self::default();
        for l in &snapshot.bids {
            view.bids.insert(Reverse(OrderedFloat(l.price)), l.quantity);
        }
        for l in &snapshot.asks {
            view.asks.insert(OrderedFloat(l.price), l.quantity);
        }
        view
    }

    /// Up to `depth` rows per side; fewer if a side has fewer distinct prices.
    pub fn ladder(&self, depth: usize) -> Ladder {
        Ladder {
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(OrderedFloat(p), q)| (*p, *q))
                .collect(),
            bids: self
                .bids
                .iter()
                .take(depth)
                .map(|(Reverse(OrderedFloat(p)), q)| (*p, *q))
                .collect(),
        }
    }
}

/// Fixed four-decimal two-section table, asks first.
pub fn render(ladder: &Ladder) -> String {
    let mut out = String::new();
    out.push_str("------------- Asks -------------\n");
    out.push_str("Price\t\tQuantity\n");
    for (price, qty) in &ladder.asks {
        let _ = writeln!(out, "{price:.4}\t{qty:.4}");
    }
    out.push_str("------------- Bids -------------\n");
    out.push_str("Price\t\tQuantity\n");
    for (price, qty) in &ladder.bids {
        let _ = writeln!(out, "{price:.4}\t{qty:.4}");
    }
    out
}
