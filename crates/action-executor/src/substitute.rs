//! `{{customer.…}}` placeholder substitution over JSON parameter trees.
//! Plans reference profile data symbolically; the concrete values are
//! spliced in at execution time only.

use cartflow_core_types::Customer;
use serde_json::Value;

/// Replace every `{{customer.<path>}}` occurrence in string values,
/// recursing through arrays and objects. An unknown path is an error so
/// a mistyped plan fails loudly instead of typing the placeholder text
/// into a form.
pub fn substitute_placeholders(params: &Value, customer: &Customer) -> Result<Value, String> {
    match params {
        Value::String(s) => substitute_str(s, customer).map(Value::String),
        Value::Array(items) => items
            .iter()
            .map(|item| substitute_placeholders(item, customer))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), substitute_placeholders(value, customer)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str(input: &str, customer: &Customer) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        let Some(end_rel) = rest[start..].find("}}") else {
            break;
        };
        let end = start + end_rel;
        out.push_str(&rest[..start]);
        let token = rest[start + 2..end].trim();
        if let Some(path) = token.strip_prefix("customer.") {
            let value = customer
                .lookup(path)
                .ok_or_else(|| format!("unknown customer path: {path}"))?;
            out.push_str(&value);
        } else {
            // Not our namespace; leave it untouched.
            out.push_str(&rest[start..end + 2]);
        }
        rest = &rest[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::{Contact, ShippingAddress};
    use serde_json::json;

    fn customer() -> Customer {
        Customer {
            contact: Contact {
                email: "jo@example.com".into(),
                first_name: "Jo".into(),
                last_name: "Doe".into(),
                phone: Some("555-0100".into()),
            },
            shipping_address: ShippingAddress {
                address_line1: "1 Main St".into(),
                address_line2: None,
                city: "Austin".into(),
                province: "Texas".into(),
                postal_code: "78701".into(),
                country: "United States".into(),
            },
        }
    }

    #[test]
    fn replaces_nested_placeholders() {
        let params = json!({
            "value": "{{customer.contact.email}}",
            "list": ["{{customer.shipping_address.city}}", "plain"],
        });
        let result = substitute_placeholders(&params, &customer()).expect("substitute");
        assert_eq!(result["value"], "jo@example.com");
        assert_eq!(result["list"][0], "Austin");
        assert_eq!(result["list"][1], "plain");
    }

    #[test]
    fn unknown_path_is_an_error() {
        let params = json!({"value": "{{customer.contact.ssn}}"});
        assert!(substitute_placeholders(&params, &customer()).is_err());
    }

    #[test]
    fn foreign_braces_pass_through() {
        let params = json!({"value": "literal {{something_else}} stays"});
        let result = substitute_placeholders(&params, &customer()).expect("substitute");
        assert_eq!(result["value"], "literal {{something_else}} stays");
    }

    #[test]
    fn mixed_text_and_placeholder() {
        let params = json!({"value": "Hello {{customer.contact.first_name}}!"});
        let result = substitute_placeholders(&params, &customer()).expect("substitute");
        assert_eq!(result["value"], "Hello Jo!");
    }
}
