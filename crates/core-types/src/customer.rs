use crate::Task;
use serde::{Deserialize, Serialize};

/// Contact details collected before the shipping form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Shipping destination. Province doubles as the US state for domestic
/// orders; `country` is the human-readable name, not an ISO code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub contact: Contact,
    pub shipping_address: ShippingAddress,
}

impl Customer {
    /// Contact stage can only run once an email and at least one name part
    /// are present.
    pub fn contact_ready(&self) -> bool {
        !self.contact.email.is_empty()
            && (!self.contact.first_name.is_empty() || !self.contact.last_name.is_empty())
    }

    /// Shipping stage needs the full destination.
    pub fn address_ready(&self) -> bool {
        let a = &self.shipping_address;
        !a.address_line1.is_empty()
            && !a.city.is_empty()
            && !a.postal_code.is_empty()
            && !a.country.is_empty()
    }

    /// Resolve a dotted path such as `contact.email` or
    /// `shipping_address.city` to its value. Used for `{{customer.…}}`
    /// placeholder substitution.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let value = match path {
            "contact.email" => self.contact.email.clone(),
            "contact.first_name" => self.contact.first_name.clone(),
            "contact.last_name" => self.contact.last_name.clone(),
            "contact.phone" => self.contact.phone.clone().unwrap_or_default(),
            "shipping_address.address_line1" => self.shipping_address.address_line1.clone(),
            "shipping_address.address_line2" => {
                self.shipping_address.address_line2.clone().unwrap_or_default()
            }
            "shipping_address.city" => self.shipping_address.city.clone(),
            "shipping_address.province" => self.shipping_address.province.clone(),
            "shipping_address.postal_code" => self.shipping_address.postal_code.clone(),
            "shipping_address.country" => self.shipping_address.country.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// Top-level input shape: one customer profile and the list of products to
/// push through checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Customer {
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
    fn readiness_checks() {
        let customer = sample();
        assert!(customer.contact_ready());
        assert!(customer.address_ready());

        let mut missing_email = customer.clone();
        missing_email.contact.email.clear();
        assert!(!missing_email.contact_ready());

        let mut missing_zip = customer;
        missing_zip.shipping_address.postal_code.clear();
        assert!(!missing_zip.address_ready());
    }

    #[test]
    fn lookup_resolves_known_paths() {
        let customer = sample();
        assert_eq!(customer.lookup("contact.email").as_deref(), Some("jo@example.com"));
        assert_eq!(
            customer.lookup("shipping_address.province").as_deref(),
            Some("Texas")
        );
        assert_eq!(customer.lookup("shipping_address.address_line2").as_deref(), Some(""));
        assert!(customer.lookup("contact.password").is_none());
    }
}
