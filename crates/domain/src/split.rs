//! Groups validated cart lines into one order per vendor.

use std::collections::BTreeMap;

use common::{Money, VendorId};

use crate::validation::ValidatedLine;

/// The lines of one future order, all belonging to a single vendor.
#[derive(Debug, Clone)]
pub struct VendorGroup {
    pub vendor_id: VendorId,
    pub lines: Vec<ValidatedLine>,
}

impl VendorGroup {
    /// Group total over the snapshotted prices.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|v| v.line.subtotal()).sum()
    }
}

/// Splits validated lines by vendor, in deterministic vendor-id order.
pub fn split_by_vendor(lines: Vec<ValidatedLine>) -> Vec<VendorGroup> {
    let mut groups: BTreeMap<VendorId, Vec<ValidatedLine>> = BTreeMap::new();
    for validated in lines {
        groups
            .entry(validated.product.vendor_id)
            .or_default()
            .push(validated);
    }

    groups
        .into_iter()
        .map(|(vendor_id, lines)| VendorGroup { vendor_id, lines })
        .collect()
}
