//! Keyword vocabulary for duck-typed page inspection.
//!
//! Every table in this crate encodes knowledge about how e-commerce sites
//! label things, not about any single site. Matching is always done on
//! normalized text (see [`normalize`]) so `Ship-First-Name`,
//! `ship_first_name`, and `shipFirstName` all collapse to the same token
//! stream.

mod geo;

pub use geo::{country_candidates, state_abbreviation};

use cartflow_core_types::FieldKind;

/// Canonical form used for all keyword comparisons: lowercase with every
/// hyphen, underscore, and whitespace character removed.
pub fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// True when `haystack` contains `needle` after both are normalized.
pub fn normalized_contains(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }
    normalize(haystack).contains(&needle)
}

/// Attribute keywords for each semantic field slot. Matched by containment
/// against id, name, data-testid, label, and placeholder attributes.
pub fn keywords_for(kind: FieldKind) -> &'static [&'static str] {
    match kind {
        FieldKind::Email => &["email", "emailaddress"],
        FieldKind::FirstName => &["firstname", "givenname", "fname"],
        FieldKind::LastName => &["lastname", "surname", "familyname", "lname"],
        FieldKind::Phone => &["phone", "telephone", "mobile", "tel"],
        FieldKind::AddressLine1 => &[
            "addressline1",
            "address1",
            "streetaddress",
            "street",
            "addr1",
            "address",
        ],
        FieldKind::AddressLine2 => &[
            "addressline2",
            "address2",
            "apartment",
            "suite",
            "unit",
            "addr2",
            "apt",
        ],
        FieldKind::City => &["city", "town", "locality"],
        FieldKind::Province => &["state", "province", "region", "county"],
        FieldKind::PostalCode => &["zipcode", "postalcode", "postcode", "zip", "postal"],
        FieldKind::Country => &["country", "nation"],
        FieldKind::Company => &["company", "organization", "organisation", "business"],
        FieldKind::Quantity => &["quantity", "qty"],
        FieldKind::Password => &["password"],
    }
}

/// `autocomplete` attribute tokens recognized for each slot, per the WHATWG
/// autofill vocabulary. These are matched exactly, not by containment.
pub fn autocomplete_tokens_for(kind: FieldKind) -> &'static [&'static str] {
    match kind {
        FieldKind::Email => &["email"],
        FieldKind::FirstName => &["given-name"],
        FieldKind::LastName => &["family-name"],
        FieldKind::Phone => &["tel", "tel-national"],
        FieldKind::AddressLine1 => &["address-line1", "street-address"],
        FieldKind::AddressLine2 => &["address-line2"],
        FieldKind::City => &["address-level2"],
        FieldKind::Province => &["address-level1"],
        FieldKind::PostalCode => &["postal-code"],
        FieldKind::Country => &["country", "country-name"],
        FieldKind::Company => &["organization"],
        FieldKind::Quantity => &[],
        FieldKind::Password => &["current-password", "new-password"],
    }
}

/// Veto terms: an attribute that matched a slot keyword is still rejected
/// if it also contains one of these. This is what keeps `ship-last-name`
/// out of the first-name slot and `email` out of the street-address slot.
pub fn exclusions_for(kind: FieldKind) -> &'static [&'static str] {
    match kind {
        FieldKind::Email => &["street", "address1", "addressline1", "confirm"],
        FieldKind::FirstName => &["last", "surname", "family"],
        FieldKind::LastName => &["first", "given"],
        FieldKind::Phone => &["email"],
        FieldKind::AddressLine1 => &[
            "email",
            "phone",
            "city",
            "state",
            "zip",
            "postal",
            "country",
            "address2",
            "addressline2",
            "line2",
        ],
        FieldKind::AddressLine2 => &["address1", "addressline1", "line1"],
        FieldKind::City => &["state", "country", "zip", "postal"],
        FieldKind::Province => &["city", "country", "zip", "postal"],
        FieldKind::PostalCode => &["city", "state", "country"],
        FieldKind::Country => &["city", "state", "zip", "postal"],
        FieldKind::Company => &[],
        FieldKind::Quantity => &[],
        FieldKind::Password => &["confirm"],
    }
}

/// Third-party express-payment buttons that must never be treated as the
/// checkout button.
pub const PAYMENT_PROVIDERS: &[&str] = &[
    "paypal",
    "applepay",
    "googlepay",
    "gpay",
    "shoppay",
    "amazonpay",
    "klarna",
    "afterpay",
    "affirm",
    "venmo",
    "alipay",
    "wechatpay",
];

/// Dismiss/close vocabulary. Single glyphs cover the ubiquitous `×` close
/// buttons that carry no text.
pub const CLOSE_CONTROL_TERMS: &[&str] = &[
    "close",
    "dismiss",
    "nothanks",
    "notnow",
    "maybelater",
    "skip",
    "×",
    "✕",
    "✖",
    "x",
];

/// Controls the dismisser must never click even when they match a close
/// term by class name (e.g. a `modal-action` checkout button).
pub const PRIMARY_ACTION_TERMS: &[&str] = &[
    "checkout",
    "addto",
    "buy",
    "pay",
    "placeorder",
    "continue",
    "submit",
    "signin",
    "login",
    "apply",
    "search",
    "accept",
    "subscribe",
];

/// Consent-banner acceptance vocabulary, clicked before generic close
/// controls so cookie walls disappear in one pass.
pub const COOKIE_ACCEPT_TERMS: &[&str] = &[
    "acceptall",
    "allowall",
    "iagree",
    "iaccept",
    "accept",
    "agree",
    "gotit",
    "consent",
];

/// Button ladders, tried in order until one matches.
pub const ADD_TO_CART_TERMS: &[&str] =
    &["add to cart", "add to bag", "add to basket", "buy now", "purchase"];

pub const CHECKOUT_BUTTON_TERMS: &[&str] = &[
    "proceed to checkout",
    "continue to checkout",
    "go to checkout",
    "secure checkout",
    "checkout",
    "check out",
];

pub const VIEW_CART_TERMS: &[&str] = &["view cart", "view bag", "go to cart", "view basket", "cart"];

pub const CONTINUE_TO_SHIPPING_TERMS: &[&str] = &[
    "continue to shipping",
    "save and continue",
    "continue",
    "next",
    "proceed",
];

pub const CONTINUE_TO_PAYMENT_TERMS: &[&str] = &[
    "continue to payment",
    "proceed to payment",
    "payment",
    "continue",
    "next",
];

pub const GUEST_CHECKOUT_TERMS: &[&str] =
    &["guest checkout", "continue as guest", "checkout as guest"];

/// Class/id tokens that mark a control as the page's primary call to
/// action. Matching any of these earns the structural boost.
pub const STRUCTURAL_BOOST_TOKENS: &[&str] =
    &["primary", "cta", "checkout", "continue", "addtocart", "buynow"];

/// Well-known cart and checkout paths, tried as direct navigations when no
/// clickable route to checkout can be found.
pub const CART_URL_PATHS: &[&str] = &[
    "/cart",
    "/checkout",
    "/bag",
    "/basket",
    "/shopping-cart",
    "/shopping-bag",
    "/checkout/cart",
];

/// Page-state vocabulary used by the classifier.
pub const CONFIRMATION_URL_SIGNALS: &[&str] = &[
    "thank_you",
    "thank-you",
    "thankyou",
    "order-received",
    "order-complete",
    "confirmation",
];

pub const CONFIRMATION_BODY_SIGNALS: &[&str] = &[
    "thank you for your order",
    "thank you for your purchase",
    "order confirmed",
    "your order is confirmed",
    "order number",
    "we've received your order",
];

/// Signals that a real card-entry form is present. Deliberately narrow:
/// a "Payment" heading or a provider logo is not enough to call the page
/// a payment page.
pub const CARD_FIELD_ATTR_SIGNALS: &[&str] = &["cardnumber", "ccnumber", "creditcardnumber"];

pub const CARD_AUTOCOMPLETE_SIGNALS: &[&str] = &["cc-number", "cc-exp", "cc-csc", "cc-name"];

pub const CART_URL_SIGNALS: &[&str] = &["/cart", "/bag", "/basket"];

pub const CART_BODY_SIGNALS: &[&str] = &["subtotal", "your cart", "shopping cart", "your bag"];

pub const CHECKOUT_URL_SIGNALS: &[&str] = &["checkout", "payment", "billing"];
