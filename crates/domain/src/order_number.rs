//! Human-readable order number generation.

use chrono::Utc;
use uuid::Uuid;

/// Generates an order number like `FEI-20260824-1A2B3C4D`.
///
/// The suffix is 8 hex chars of a fresh v4 UUID, independent of any other
/// order's number; the unique index on `orders.number` is the backstop.
pub fn generate() -> String {
    let date = Utc::now().format("%Y%m%d");
    let uuid = Uuid::new_v4().simple().to_string();
    format!("FEI-{date}-{}", uuid[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn has_expected_shape() {
        let number = generate();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "FEI");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn numbers_do_not_collide_in_practice() {
        let numbers: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(numbers.len(), 10_000);
    }
}
