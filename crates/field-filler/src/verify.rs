//! Read-back verification and price parsing. Verification is relaxed on
//! purpose: sites reformat what gets typed (phone masks, uppercased
//! postcodes, autocompleted addresses), so literal equality would reject
//! fills that actually worked.

use cartflow_core_types::FieldKind;
use cartflow_keywords::normalize;

/// Does the field's current value count as "the value we meant to put
/// there"?
pub fn values_match(expected: &str, actual: &str, kind: FieldKind) -> bool {
    if actual.trim().is_empty() {
        return expected.trim().is_empty();
    }

    if kind == FieldKind::Phone {
        return phone_match(expected, actual);
    }

    let exp = normalize(expected);
    let act = normalize(actual);
    if exp == act {
        return true;
    }
    // Containment either way: the site may append ", USA" to an address
    // or truncate a long value.
    if exp.len() >= 3 && (act.contains(&exp) || exp.contains(&act)) {
        return true;
    }
    // Shared prefix: an autocomplete pick that expands "1 Main St" into
    // "1 Main Street, Austin TX" still starts the same way.
    let prefix_len = exp.chars().count().min(5);
    prefix_len > 0
        && act.chars().count() >= prefix_len
        && exp.chars().take(prefix_len).eq(act.chars().take(prefix_len))
}

/// Phones compare digits only, tolerating a country-code prefix that one
/// side has and the other lacks.
fn phone_match(expected: &str, actual: &str) -> bool {
    let exp: String = expected.chars().filter(|c| c.is_ascii_digit()).collect();
    let act: String = actual.chars().filter(|c| c.is_ascii_digit()).collect();
    if exp.is_empty() || act.is_empty() {
        return false;
    }
    exp == act || exp.ends_with(&act) || act.ends_with(&exp)
}

/// Parse a shipping-rate price out of label text. "Free" is zero; a
/// currency-marked amount wins over bare numbers so "(5-7 days) $4.99"
/// parses as 4.99, not 5.
pub fn parse_price(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    if lower.contains("free") {
        return Some(0.0);
    }

    let chars: Vec<char> = lower.chars().collect();
    let mut after_currency: Option<f64> = None;
    let mut with_decimal: Option<f64> = None;

    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == ',')
            {
                i += 1;
            }
            let token: String = chars[start..i]
                .iter()
                .collect::<String>()
                .trim_end_matches(['.', ','])
                .replace(',', "");
            if let Ok(value) = token.parse::<f64>() {
                let preceded_by_currency = chars[..start]
                    .iter()
                    .rev()
                    .find(|c| !c.is_whitespace())
                    .map(|c| matches!(c, '$' | '€' | '£'))
                    .unwrap_or(false);
                if preceded_by_currency && after_currency.is_none() {
                    after_currency = Some(value);
                }
                if token.contains('.') && with_decimal.is_none() {
                    with_decimal = Some(value);
                }
            }
        } else {
            i += 1;
        }
    }
    after_currency.or(with_decimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_normalized_equality() {
        assert!(values_match("Austin", "Austin", FieldKind::City));
        assert!(values_match("78701", " 78701 ", FieldKind::PostalCode));
        assert!(values_match("jo@example.com", "JO@EXAMPLE.COM", FieldKind::Email));
    }

    #[test]
    fn containment_and_prefix_are_accepted() {
        assert!(values_match(
            "1 Main St",
            "1 Main Street, Austin TX",
            FieldKind::AddressLine1
        ));
        assert!(values_match("United States", "United States of America", FieldKind::Country));
    }

    #[test]
    fn mismatch_is_rejected() {
        assert!(!values_match("Austin", "Dallas", FieldKind::City));
        assert!(!values_match("jo@example.com", "", FieldKind::Email));
    }

    #[test]
    fn phone_compares_digits_only() {
        assert!(values_match("555-010-0100", "(555) 010-0100", FieldKind::Phone));
        assert!(values_match("5550100100", "+1 555 010 0100", FieldKind::Phone));
        assert!(!values_match("5550100100", "5550100199", FieldKind::Phone));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price("Free shipping"), Some(0.0));
        assert_eq!(parse_price("Standard (5-7 days) $4.99"), Some(4.99));
        assert_eq!(parse_price("Express — £12.50"), Some(12.5));
        assert_eq!(parse_price("Economy 3.95"), Some(3.95));
        assert_eq!(parse_price("Pick up in store"), None);
        assert_eq!(parse_price("$1,299.00 white glove"), Some(1299.0));
    }
}
