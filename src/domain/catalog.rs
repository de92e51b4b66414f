//! Catalog rules: draft product naming and promotion pricing.

use super::DomainError;

/// Name prefix given to products created without a name.
pub const DRAFT_PREFIX: &str = "Nuovo prodotto ";

/// Highest discount a promotion may apply, in percent.
pub const MAX_DISCOUNT_PERCENT: i32 = 90;

/// Next free draft name given the names already in the catalog.
///
/// Only names made of `prefix` followed by a plain integer count; anything
/// else (`"Nuovo prodotto speciale"`, `"Nuovo prodotto 3b"`) is ignored.
/// A numeric suffix too large to continue from is a validation error.
pub fn next_draft_name<S: AsRef<str>>(prefix: &str, existing: &[S]) -> Result<String, DomainError> {
    let too_large = || DomainError::Validation("draft numbering is exhausted".to_string());

    let mut highest: Option<u128> = None;
    for suffix in existing
        .iter()
        .filter_map(|name| name.as_ref().strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
    {
        let n = suffix.parse::<u128>().map_err(|_| too_large())?;
        highest = highest.max(Some(n));
    }

    let next = match highest {
        Some(n) => n.checked_add(1).ok_or_else(too_large)?,
        None => 1,
    };
    Ok(format!("{}{}", prefix, next))
}

/// True if the name is still an auto-generated draft name.
pub fn is_draft_name(name: &str) -> bool {
    name.strip_prefix(DRAFT_PREFIX)
        .map(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Price after applying a percentage discount, rounded down to the cent.
pub fn discounted_price(price_cents: i64, discount_percent: i32) -> i64 {
    let discount = discount_percent.clamp(0, MAX_DISCOUNT_PERCENT) as i64;
    price_cents * (100 - discount) / 100
}

/// Validate a promotion discount.
pub fn validate_discount(discount_percent: i32) -> Result<(), String> {
    if (1..=MAX_DISCOUNT_PERCENT).contains(&discount_percent) {
        Ok(())
    } else {
        Err(format!(
            "discount_percent must be between 1 and {}",
            MAX_DISCOUNT_PERCENT
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_draft_is_numbered_one() {
        let names: Vec<String> = vec!["Martello".into(), "Cacciavite".into()];
        assert_eq!(next_draft_name(DRAFT_PREFIX, &names).unwrap(), "Nuovo prodotto 1");
    }

    #[test]
    fn draft_number_follows_highest_existing() {
        let names = ["Nuovo prodotto 2", "Nuovo prodotto 7", "Nuovo prodotto 3"];
        assert_eq!(next_draft_name(DRAFT_PREFIX, &names).unwrap(), "Nuovo prodotto 8");
    }

    #[test]
    fn non_numeric_suffixes_are_ignored() {
        let names = [
            "Nuovo prodotto speciale",
            "Nuovo prodotto 4b",
            "Nuovo prodotto -2",
            "Nuovo prodotto +5",
            "nuovo prodotto 9",
        ];
        assert_eq!(next_draft_name(DRAFT_PREFIX, &names).unwrap(), "Nuovo prodotto 1");
    }

    #[test]
    fn large_suffixes_keep_counting() {
        let names = ["Nuovo prodotto 4294967295", "Nuovo prodotto 12"];
        assert_eq!(
            next_draft_name(DRAFT_PREFIX, &names).unwrap(),
            "Nuovo prodotto 4294967296"
        );
    }

    #[test]
    fn exhausted_numbering_is_rejected() {
        let max = format!("{}{}", DRAFT_PREFIX, u128::MAX);
        assert!(matches!(
            next_draft_name(DRAFT_PREFIX, &[max]),
            Err(DomainError::Validation(_))
        ));
        let huge = format!("{}{}", DRAFT_PREFIX, "9".repeat(60));
        assert!(next_draft_name(DRAFT_PREFIX, &[huge]).is_err());
    }

    #[test]
    fn draft_name_detection() {
        assert!(is_draft_name("Nuovo prodotto 12"));
        assert!(!is_draft_name("Nuovo prodotto"));
        assert!(!is_draft_name("Trapano 12"));
    }

    #[test]
    fn discount_rounds_down() {
        assert_eq!(discounted_price(999, 10), 899);
        assert_eq!(discounted_price(1000, 25), 750);
        assert_eq!(discounted_price(1000, 0), 1000);
    }

    #[test]
    fn discount_is_capped() {
        assert_eq!(discounted_price(1000, 150), 100);
        assert!(validate_discount(0).is_err());
        assert!(validate_discount(91).is_err());
        assert!(validate_discount(90).is_ok());
    }
}
