//! The page-state classifier: a total function from one observation to
//! one of eight states. Signals are checked most-conclusive first, and
//! the payment state deliberately requires an actual card-entry field so
//! a "Payment" heading or an express-pay logo can never end a run early.

use cartflow_core_types::{ButtonInfo, FieldInfo, FieldKind};
use cartflow_keywords::{
    keywords_for, normalized_contains, ADD_TO_CART_TERMS, CARD_AUTOCOMPLETE_SIGNALS,
    CARD_FIELD_ATTR_SIGNALS, CART_BODY_SIGNALS, CART_URL_SIGNALS, CHECKOUT_BUTTON_TERMS,
    CHECKOUT_URL_SIGNALS, CONFIRMATION_BODY_SIGNALS, CONFIRMATION_URL_SIGNALS,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Product,
    Cart,
    CheckoutContact,
    CheckoutShipping,
    CheckoutPayment,
    /// Checkout context established but no stage signal matched.
    CheckoutUnknown,
    OrderConfirmation,
    Unknown,
}

impl PageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageState::Product => "product",
            PageState::Cart => "cart",
            PageState::CheckoutContact => "checkout_contact",
            PageState::CheckoutShipping => "checkout_shipping",
            PageState::CheckoutPayment => "checkout_payment",
            PageState::CheckoutUnknown => "checkout_unknown",
            PageState::OrderConfirmation => "order_confirmation",
            PageState::Unknown => "unknown",
        }
    }

    pub fn is_checkout(&self) -> bool {
        matches!(
            self,
            PageState::CheckoutContact
                | PageState::CheckoutShipping
                | PageState::CheckoutPayment
                | PageState::CheckoutUnknown
        )
    }
}

/// True when the page carries a real card-entry form.
pub fn has_card_fields(fields: &[FieldInfo]) -> bool {
    fields.iter().any(|f| {
        if !f.visible {
            return false;
        }
        if CARD_AUTOCOMPLETE_SIGNALS
            .iter()
            .any(|sig| f.autocomplete == *sig)
        {
            return true;
        }
        let attrs = format!("{} {} {} {}", f.id, f.name, f.placeholder, f.data_testid);
        CARD_FIELD_ATTR_SIGNALS
            .iter()
            .any(|sig| normalized_contains(&attrs, sig))
    })
}

fn field_mentions(info: &FieldInfo, kind: FieldKind) -> bool {
    if !info.visible {
        return false;
    }
    let attrs = format!(
        "{} {} {} {} {}",
        info.id, info.name, info.label, info.placeholder, info.data_testid
    );
    keywords_for(kind)
        .iter()
        .any(|kw| normalized_contains(&attrs, kw))
}

fn has_email_entry(fields: &[FieldInfo]) -> bool {
    fields.iter().any(|f| {
        f.visible
            && !f.is_filled()
            && (f.input_type == "email" || field_mentions(f, FieldKind::Email))
    })
}

fn has_address_entry(fields: &[FieldInfo]) -> bool {
    fields.iter().any(|f| {
        field_mentions(f, FieldKind::AddressLine1)
            || field_mentions(f, FieldKind::City)
            || field_mentions(f, FieldKind::PostalCode)
    })
}

fn has_button(buttons: &[ButtonInfo], terms: &[&str]) -> bool {
    buttons.iter().any(|b| {
        b.visible
            && terms
                .iter()
                .any(|t| normalized_contains(&b.text, t) || normalized_contains(&b.aria_label, t))
    })
}

/// Classify the current page. Total: every input maps to some state,
/// with `Unknown` as the honest floor.
pub fn classify(
    url: &str,
    body: &str,
    buttons: &[ButtonInfo],
    fields: &[FieldInfo],
) -> PageState {
    let url_lower = url.to_lowercase();
    let body_lower = body.to_lowercase();

    if CONFIRMATION_URL_SIGNALS.iter().any(|s| url_lower.contains(s))
        || CONFIRMATION_BODY_SIGNALS.iter().any(|s| body_lower.contains(s))
    {
        return PageState::OrderConfirmation;
    }

    let path = url_lower.split('?').next().unwrap_or(&url_lower);
    let cart_url = CART_URL_SIGNALS.iter().any(|s| path.contains(s))
        && !CHECKOUT_URL_SIGNALS.iter().any(|s| path.contains(s));
    if cart_url {
        return PageState::Cart;
    }

    let checkout_url = CHECKOUT_URL_SIGNALS.iter().any(|s| url_lower.contains(s));
    let checkout_form = has_email_entry(fields) && has_address_entry(fields);
    if checkout_url || checkout_form {
        // Card entry decides payment only once checkout context is
        // established; a card widget embedded elsewhere is not a
        // checkout step.
        if has_card_fields(fields) {
            return PageState::CheckoutPayment;
        }
        if has_email_entry(fields) {
            return PageState::CheckoutContact;
        }
        if has_address_entry(fields) {
            return PageState::CheckoutShipping;
        }
        return PageState::CheckoutUnknown;
    }

    if CART_BODY_SIGNALS.iter().any(|s| body_lower.contains(s))
        && has_button(buttons, CHECKOUT_BUTTON_TERMS)
    {
        return PageState::Cart;
    }

    if has_button(buttons, ADD_TO_CART_TERMS) {
        return PageState::Product;
    }

    PageState::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::ElementHandle;

    fn button(text: &str) -> ButtonInfo {
        ButtonInfo {
            handle: ElementHandle("b".into()),
            text: text.into(),
            visible: true,
            ..ButtonInfo::default()
        }
    }

    fn named_field(name: &str) -> FieldInfo {
        FieldInfo {
            handle: ElementHandle("f".into()),
            tag: "input".into(),
            input_type: "text".into(),
            name: name.into(),
            visible: true,
            ..FieldInfo::default()
        }
    }

    #[test]
    fn product_page() {
        let state = classify(
            "https://shop.test/products/widget",
            "A widget you will love",
            &[button("Add to Cart")],
            &[],
        );
        assert_eq!(state, PageState::Product);
    }

    #[test]
    fn cart_by_url_and_by_content() {
        assert_eq!(
            classify("https://shop.test/cart", "", &[], &[]),
            PageState::Cart
        );
        assert_eq!(
            classify(
                "https://shop.test/b/123",
                "Your Cart\nSubtotal: $20",
                &[button("Checkout")],
                &[],
            ),
            PageState::Cart
        );
    }

    #[test]
    fn contact_then_shipping_as_email_fills() {
        let mut email = named_field("email");
        email.input_type = "email".into();
        let address = named_field("address1");
        let city = named_field("city");

        let contact = classify(
            "https://shop.test/checkout",
            "",
            &[],
            &[email.clone(), address.clone(), city.clone()],
        );
        assert_eq!(contact, PageState::CheckoutContact);

        email.current_value = "jo@example.com".into();
        let shipping = classify(
            "https://shop.test/checkout",
            "",
            &[],
            &[email, address, city],
        );
        assert_eq!(shipping, PageState::CheckoutShipping);
    }

    #[test]
    fn payment_requires_a_real_card_field() {
        // A payment heading and an express-pay button are not enough.
        let not_payment = classify(
            "https://shop.test/checkout",
            "Payment\nChoose how you'd like to pay",
            &[button("Pay with PayPal")],
            &[],
        );
        assert_ne!(not_payment, PageState::CheckoutPayment);

        let card = named_field("card-number");
        let payment = classify("https://shop.test/checkout", "Payment", &[], &[card]);
        assert_eq!(payment, PageState::CheckoutPayment);

        let mut cc = named_field("opaque");
        cc.autocomplete = "cc-number".into();
        assert_eq!(
            classify("https://shop.test/payment", "", &[], &[cc]),
            PageState::CheckoutPayment
        );
    }

    #[test]
    fn card_widget_outside_checkout_does_not_flip_state() {
        // Gift-card entry on a cart page, or a stored-card widget on a
        // product page, must not read as the payment step.
        let card = named_field("cardnumber");
        assert_eq!(
            classify("https://shop.test/cart", "Your Cart", &[], &[card.clone()]),
            PageState::Cart
        );
        assert_eq!(
            classify(
                "https://shop.test/products/widget",
                "A widget you will love",
                &[button("Add to Cart")],
                &[card],
            ),
            PageState::Product
        );
    }

    #[test]
    fn confirmation_beats_everything() {
        let card = named_field("cardnumber");
        let state = classify(
            "https://shop.test/checkout/thank_you",
            "Thank you for your order",
            &[],
            &[card],
        );
        assert_eq!(state, PageState::OrderConfirmation);
    }

    #[test]
    fn checkout_url_with_no_stage_signal_is_checkout_unknown() {
        assert_eq!(
            classify("https://shop.test/checkout/review", "Review your order", &[], &[]),
            PageState::CheckoutUnknown
        );
    }

    #[test]
    fn classifier_is_total() {
        assert_eq!(classify("", "", &[], &[]), PageState::Unknown);
        assert_eq!(
            classify("https://example.org/about", "We make things", &[], &[]),
            PageState::Unknown
        );
    }
}
