use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque reference to an element that was tagged with a marker attribute
/// during the most recent harvest. Handles are only valid until the next
/// navigation or re-harvest; they are never cached across actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ElementHandle {
    fn default() -> Self {
        ElementHandle(String::new())
    }
}

/// Structural description of a clickable control, harvested without any
/// site-specific selectors. Empty strings mean the attribute was absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ButtonInfo {
    pub handle: ElementHandle,
    pub tag: String,
    pub text: String,
    pub aria_label: String,
    pub id: String,
    pub classes: String,
    pub data_testid: String,
    pub href: String,
    pub disabled: bool,
    pub visible: bool,
    /// True when the control sits inside a modal, drawer, or other
    /// high-z-index container.
    pub in_overlay: bool,
}

/// Structural description of a form field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldInfo {
    pub handle: ElementHandle,
    pub tag: String,
    /// The `type` attribute for inputs (`text`, `email`, `tel`, …).
    pub input_type: String,
    pub id: String,
    pub name: String,
    pub autocomplete: String,
    pub placeholder: String,
    pub label: String,
    pub aria_label: String,
    pub data_testid: String,
    pub current_value: String,
    pub visible: bool,
}

impl FieldInfo {
    pub fn is_filled(&self) -> bool {
        !self.current_value.trim().is_empty()
    }

    pub fn is_select(&self) -> bool {
        self.tag.eq_ignore_ascii_case("select")
    }
}

/// One `<option>` of a native select.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// One radio choice in a shipping-method group, with whatever price text
/// the page renders next to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadioOption {
    pub handle: ElementHandle,
    pub label: String,
    pub price_text: String,
    pub checked: bool,
}

/// The semantic slots a checkout form can ask for. Everything the locator
/// and filler do is keyed off one of these, never off raw selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Email,
    FirstName,
    LastName,
    Phone,
    AddressLine1,
    AddressLine2,
    City,
    Province,
    PostalCode,
    Country,
    Company,
    Quantity,
    Password,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::FirstName => "first_name",
            FieldKind::LastName => "last_name",
            FieldKind::Phone => "phone",
            FieldKind::AddressLine1 => "address_line1",
            FieldKind::AddressLine2 => "address_line2",
            FieldKind::City => "city",
            FieldKind::Province => "province",
            FieldKind::PostalCode => "postal_code",
            FieldKind::Country => "country",
            FieldKind::Company => "company",
            FieldKind::Quantity => "quantity",
            FieldKind::Password => "password",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = UnknownFieldKind;

    /// Accepts the canonical snake_case names plus the loose aliases a
    /// language model tends to emit (`zip`, `state`, `address`, …).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "email" | "email_address" => FieldKind::Email,
            "first_name" | "firstname" | "given_name" => FieldKind::FirstName,
            "last_name" | "lastname" | "surname" | "family_name" => FieldKind::LastName,
            "phone" | "telephone" | "phone_number" | "tel" => FieldKind::Phone,
            "address" | "address1" | "address_line1" | "street" | "street_address" => {
                FieldKind::AddressLine1
            }
            "address2" | "address_line2" | "apartment" | "unit" => FieldKind::AddressLine2,
            "city" | "town" => FieldKind::City,
            "state" | "province" | "region" => FieldKind::Province,
            "zip" | "zipcode" | "zip_code" | "postal_code" | "postcode" => FieldKind::PostalCode,
            "country" => FieldKind::Country,
            "company" | "organization" => FieldKind::Company,
            "quantity" | "qty" => FieldKind::Quantity,
            "password" => FieldKind::Password,
            other => return Err(UnknownFieldKind(other.to_string())),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field kind: {0}")]
pub struct UnknownFieldKind(pub String);

/// How a field match was established, most-specific first. Recorded in the
/// match result so failures can be diagnosed from logs alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    AutocompletePostal,
    Id,
    Name,
    DataTestId,
    Autocomplete,
    Label,
    Placeholder,
    Text,
    Structural,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::AutocompletePostal => "autocomplete_postal",
            MatchMethod::Id => "id",
            MatchMethod::Name => "name",
            MatchMethod::DataTestId => "data_testid",
            MatchMethod::Autocomplete => "autocomplete",
            MatchMethod::Label => "label",
            MatchMethod::Placeholder => "placeholder",
            MatchMethod::Text => "text",
            MatchMethod::Structural => "structural",
        }
    }
}

/// Result of a locator query. `NotFound` is an ordinary value, not an
/// error: callers decide whether a missing element is fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    Found {
        handle: ElementHandle,
        matched_text: String,
        score: i64,
        method: MatchMethod,
    },
    NotFound,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found { .. })
    }

    pub fn handle(&self) -> Option<&ElementHandle> {
        match self {
            MatchResult::Found { handle, .. } => Some(handle),
            MatchResult::NotFound => None,
        }
    }
}
