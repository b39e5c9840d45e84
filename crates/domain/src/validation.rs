//! The validation engine: classifies every cart line against live catalog
//! state.
//!
//! The classification is advisory for cart review screens and blocking for
//! checkout; either way the write-time check inside the store remains
//! authoritative.

use chrono::NaiveDate;
use serde::Serialize;

use common::{Money, ProductId, Week};
use market_store::{CartLine, Product};

/// Why a cart line cannot be checked out as-is.
///
/// A line reports exactly one kind: the most severe applicable one.
/// Severity order is inactivity, expiry, stock, price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// Product (or its vendor) was deactivated, or the product row is gone.
    ProductInactive,
    /// Product is past its weekly validity window or expiry date.
    ProductExpired,
    /// Live stock is below the line quantity.
    InsufficientStock { available: u32 },
    /// Live price diverged from the snapshot beyond tolerance.
    PriceChanged { snapshot: Money, live: Money },
}

/// One failing cart line, with enough context to re-render the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineIssue {
    pub product_id: ProductId,
    /// Live product name, if the product row still exists.
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(flatten)]
    pub kind: IssueKind,
}

/// A cart line that passed every check, paired with the live product it
/// was checked against.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedLine {
    pub line: CartLine,
    pub product: Product,
}

/// Outcome of validating a whole cart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub valid: Vec<ValidatedLine>,
    pub problems: Vec<LineIssue>,
}

impl ValidationReport {
    /// True when every line passed.
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Classifies each line into `valid` or exactly one problem.
///
/// `today` and `current_week` are passed in rather than read from the
/// clock so callers near a week boundary (and tests) control the moment
/// validity is evaluated at.
pub fn validate_lines(
    pairs: &[(CartLine, Option<Product>)],
    today: NaiveDate,
    current_week: Week,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (line, product) in pairs {
        match classify(line, product.as_ref(), today, current_week) {
            Some(kind) => report.problems.push(LineIssue {
                product_id: line.product_id,
                product_name: product.as_ref().map(|p| p.name.clone()),
                quantity: line.quantity,
                kind,
            }),
            None => report.valid.push(ValidatedLine {
                line: line.clone(),
                product: product.clone().expect("classified valid without product"),
            }),
        }
    }

    report
}

fn classify(
    line: &CartLine,
    product: Option<&Product>,
    today: NaiveDate,
    current_week: Week,
) -> Option<IssueKind> {
    let Some(product) = product else {
        return Some(IssueKind::ProductInactive);
    };
    if !product.active {
        return Some(IssueKind::ProductInactive);
    }
    if product.week != current_week || product.expires_on < today {
        return Some(IssueKind::ProductExpired);
    }
    if product.stock < line.quantity {
        return Some(IssueKind::InsufficientStock {
            available: product.stock,
        });
    }
    if line.unit_price.diverges_from(product.price) {
        return Some(IssueKind::PriceChanged {
            snapshot: line.unit_price,
            live: product.price,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ConsumerId, VendorId};

    const TODAY: fn() -> NaiveDate = || NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();

    fn week() -> Week {
        Week::of(TODAY())
    }

    fn product(price_cents: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(),
            vendor_id: VendorId::new(),
            name: "Mel silvestre".to_string(),
            image_url: None,
            price: Money::from_cents(price_cents),
            stock,
            active: true,
            week: week(),
            expires_on: TODAY(),
        }
    }

    fn line_for(product: &Product, quantity: u32, snapshot_cents: i64) -> CartLine {
        CartLine::new(
            ConsumerId::new(),
            product.id,
            quantity,
            Money::from_cents(snapshot_cents),
        )
    }

    fn only_issue(line: CartLine, product: Product) -> IssueKind {
        let report = validate_lines(&[(line, Some(product))], TODAY(), week());
        assert!(report.valid.is_empty());
        assert_eq!(report.problems.len(), 1);
        report.problems[0].kind.clone()
    }

    #[test]
    fn clean_line_validates() {
        let p = product(1000, 5);
        let report = validate_lines(&[(line_for(&p, 2, 1000), Some(p))], TODAY(), week());
        assert!(report.is_clean());
        assert_eq!(report.valid.len(), 1);
    }

    #[test]
    fn missing_product_reports_inactive() {
        let p = product(1000, 5);
        let report = validate_lines(&[(line_for(&p, 1, 1000), None)], TODAY(), week());
        assert_eq!(report.problems[0].kind, IssueKind::ProductInactive);
        assert_eq!(report.problems[0].product_name, None);
    }

    #[test]
    fn inactive_wins_over_every_other_problem() {
        // Inactive, expired, out of stock and repriced all at once:
        // only inactivity is reported.
        let mut p = product(9999, 0);
        p.active = false;
        p.week = Week::new(2025, 1);
        assert_eq!(only_issue(line_for(&p, 3, 1000), p), IssueKind::ProductInactive);
    }

    #[test]
    fn expiry_wins_over_stock_and_price() {
        let mut p = product(9999, 0);
        p.expires_on = TODAY().pred_opt().unwrap();
        assert_eq!(only_issue(line_for(&p, 3, 1000), p), IssueKind::ProductExpired);
    }

    #[test]
    fn stale_week_classifies_as_expired() {
        let mut p = product(1000, 5);
        p.week = Week::new(week().year, week().week - 1);
        assert_eq!(only_issue(line_for(&p, 1, 1000), p), IssueKind::ProductExpired);
    }

    #[test]
    fn stock_wins_over_price() {
        let p = product(9999, 1);
        assert_eq!(
            only_issue(line_for(&p, 3, 1000), p),
            IssueKind::InsufficientStock { available: 1 }
        );
    }

    #[test]
    fn price_drift_beyond_tolerance_is_reported() {
        let p = product(1002, 10);
        assert_eq!(
            only_issue(line_for(&p, 1, 1000), p),
            IssueKind::PriceChanged {
                snapshot: Money::from_cents(1000),
                live: Money::from_cents(1002),
            }
        );
    }

    #[test]
    fn one_cent_drift_is_tolerated() {
        let p = product(1001, 10);
        let report = validate_lines(&[(line_for(&p, 1, 1000), Some(p))], TODAY(), week());
        assert!(report.is_clean());
    }

    #[test]
    fn mixed_cart_splits_into_valid_and_problems() {
        let good = product(500, 10);
        let bad = product(500, 0);
        let report = validate_lines(
            &[
                (line_for(&good, 2, 500), Some(good.clone())),
                (line_for(&bad, 1, 500), Some(bad)),
            ],
            TODAY(),
            week(),
        );
        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.problems.len(), 1);
        assert_eq!(report.valid[0].product.id, good.id);
    }

    #[test]
    fn issue_serializes_with_wire_kind_names() {
        let p = product(500, 0);
        let report = validate_lines(&[(line_for(&p, 2, 500), Some(p))], TODAY(), week());
        let json = serde_json::to_value(&report.problems[0]).unwrap();
        assert_eq!(json["kind"], "insufficient_stock");
        assert_eq!(json["available"], 0);
    }
}
