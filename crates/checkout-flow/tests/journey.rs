//! End-to-end journeys against the in-memory page model: a full guest
//! purchase, the hard abort paths, and model-assisted recovery.

use cartflow_core_types::{Contact, Customer, RetryPolicy, RunPhase, ShippingAddress, Task};
use checkout_flow::{CheckoutController, DenyCredentials, FlowConfig};
use page_adapter::fake::{ClickEffect, FakeButton, FakeDom, FakeField, FakePage};
use std::collections::BTreeMap;
use std::sync::Arc;

const PRODUCT_URL: &str = "https://shop.test/products/tee";
const CONTACT_URL: &str = "https://shop.test/checkout";
const SHIPPING_URL: &str = "https://shop.test/checkout/shipping";
const PAYMENT_URL: &str = "https://shop.test/checkout/payment";

fn customer() -> Customer {
    Customer {
        contact: Contact {
            email: "jo@example.com".into(),
            first_name: "Jo".into(),
            last_name: "Doe".into(),
            phone: None,
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

fn fast_config() -> FlowConfig {
    FlowConfig {
        settle_ms: 0,
        retry: RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
            cap_ms: 0,
        },
        ..FlowConfig::default()
    }
}

fn task(url: &str, quantity: u32, variants: &[(&str, &str)]) -> Task {
    Task {
        url: url.into(),
        quantity,
        selected_variant: variants
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn controller(dom: Arc<FakeDom>) -> CheckoutController {
    CheckoutController::new(
        dom,
        None,
        Arc::new(DenyCredentials),
        customer(),
        fast_config(),
    )
}

/// Product page with a variant picker, a wishlist decoy, a quantity
/// field, and a header checkout link.
fn product_page() -> FakePage {
    FakePage::default()
        .with_body("A tee you will love")
        .with_badge(0)
        .with_button(FakeButton::new("blue", "Blue"))
        .with_button(FakeButton::new("wish", "Add to Wishlist"))
        .with_button(FakeButton::new("bag", "Add to Bag").with_effect(ClickEffect::AddToCart))
        .with_button(
            FakeButton::new("hdr-checkout", "Checkout")
                .with_effect(ClickEffect::GoTo(CONTACT_URL.into())),
        )
        .with_field(FakeField::new("qty", "quantity").with_value("1"))
}

fn contact_page() -> FakePage {
    FakePage::default()
        .with_overlay(1)
        .with_field(FakeField::new("email", "email").with_input_type("email"))
        .with_field(FakeField::new("fn", "first_name"))
        .with_field(FakeField::new("ln", "last_name"))
        .with_button(
            FakeButton::new("cont-ship", "Continue to shipping")
                .with_effect(ClickEffect::GoTo(SHIPPING_URL.into())),
        )
}

fn shipping_page() -> FakePage {
    FakePage::default()
        .with_field(FakeField::new("addr", "address1"))
        .with_field(FakeField::new("city", "city"))
        .with_field(FakeField::new("zip", "zip"))
        .with_field(FakeField::select(
            "state",
            "state",
            vec![("AL", "Alabama"), ("TX", "Texas")],
        ))
        .with_field(FakeField::select(
            "country",
            "country",
            vec![("US", "United States"), ("CA", "Canada")],
        ))
        .with_radio("exp", "Express", "Express (1-2 days) $12.00")
        .with_radio("std", "Standard", "Standard (5-7 days) $5.00")
        .with_button(
            FakeButton::new("cont-pay", "Continue to payment")
                .with_effect(ClickEffect::GoTo(PAYMENT_URL.into())),
        )
}

fn payment_page() -> FakePage {
    FakePage::default()
        .with_body("Payment")
        .with_field(FakeField::new("card", "cardnumber"))
}

#[tokio::test]
async fn full_guest_journey_stops_at_payment() {
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product_page()));
    dom.add_page(CONTACT_URL, contact_page());
    dom.add_page(SHIPPING_URL, shipping_page());
    dom.add_page(PAYMENT_URL, payment_page());

    let controller = controller(dom.clone());
    let report = controller
        .run(&[task(PRODUCT_URL, 2, &[("Color", "Blue")])])
        .await;

    assert!(report.success, "report: {report:?}");
    assert_eq!(report.phase, RunPhase::Checkout);
    assert_eq!(report.final_url.as_deref(), Some(PAYMENT_URL));

    let log = dom.action_log();
    // Variant and add-to-cart happened, and the decoy never got clicked.
    assert!(log.contains(&"click:blue".to_string()));
    assert!(log.contains(&"click:bag".to_string()));
    assert!(!log.contains(&"click:wish".to_string()));
    // The newsletter overlay on the contact page was swept, not clicked
    // through.
    assert!(log.contains(&"remove_overlays".to_string()));

    assert_eq!(dom.field_value("qty").as_deref(), Some("2"));
}

#[tokio::test]
async fn shipping_form_lands_with_geo_renderings() {
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product_page()));
    dom.add_page(CONTACT_URL, contact_page());
    dom.add_page(SHIPPING_URL, shipping_page());
    dom.add_page(PAYMENT_URL, payment_page());

    controller(dom.clone())
        .run(&[task(PRODUCT_URL, 1, &[])])
        .await;

    // Values as the page wants them, not as the profile spells them.
    // Field reads target the final page, so check the log for writes
    // that happened on the shipping page.
    let log = dom.action_log();
    assert!(log.contains(&"select:state:TX".to_string()), "log: {log:?}");
    assert!(log.contains(&"select:country:US".to_string()));
    assert!(log.iter().any(|l| l.starts_with("fill:addr:")));
    assert!(log.iter().any(|l| l.starts_with("fill:zip:")));
    // Cheapest rate won over the express decoy.
    assert!(log.contains(&"click:std".to_string()));
    assert!(!log.contains(&"click:exp".to_string()));
}

#[tokio::test]
async fn repeated_identical_failures_end_the_run() {
    let review_url = "https://shop.test/checkout/review";
    let product = FakePage::default()
        .with_button(FakeButton::new("bag", "Add to Cart").with_effect(ClickEffect::AddToCart))
        .with_button(
            FakeButton::new("go", "Checkout").with_effect(ClickEffect::GoTo(review_url.into())),
        );
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product));
    // A checkout page with nothing recognizable on it.
    dom.add_page(review_url, FakePage::default().with_body("Review your order"));

    let report = controller(dom.clone())
        .run(&[task(PRODUCT_URL, 1, &[])])
        .await;

    assert!(!report.success);
    assert_eq!(report.phase, RunPhase::Checkout);
    assert!(
        report.error.as_deref().map(|e| e.contains("stuck loop")).unwrap_or(false),
        "error: {:?}",
        report.error
    );
}

#[tokio::test]
async fn password_wall_aborts_without_credentials() {
    let product = FakePage::default()
        .with_button(FakeButton::new("bag", "Add to Cart").with_effect(ClickEffect::AddToCart))
        .with_button(
            FakeButton::new("go", "Checkout").with_effect(ClickEffect::GoTo(CONTACT_URL.into())),
        );
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product));
    dom.add_page(
        CONTACT_URL,
        FakePage::default()
            .with_field(FakeField::new("email", "email").with_input_type("email"))
            .with_field(FakeField::new("pw", "password").with_input_type("password")),
    );

    let report = controller(dom.clone())
        .run(&[task(PRODUCT_URL, 1, &[])])
        .await;

    assert!(!report.success);
    assert!(
        report.error.as_deref().map(|e| e.contains("password")).unwrap_or(false),
        "error: {:?}",
        report.error
    );
    // The password field was never written to.
    assert!(!dom.action_log().iter().any(|l| l.starts_with("fill:pw")));
}

#[tokio::test]
async fn dead_checkout_button_is_failure_not_progress() {
    let cart_url = "https://shop.test/cart";
    let product = FakePage::default()
        .with_badge(0)
        .with_button(FakeButton::new("bag", "Add to Cart").with_effect(ClickEffect::AddToCart))
        .with_button(
            FakeButton::new("view", "View cart").with_effect(ClickEffect::GoTo(cart_url.into())),
        );
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product));
    // The cart's checkout button is wired to nothing: clicking it changes
    // neither the URL nor the control census.
    dom.add_page(
        cart_url,
        FakePage::default()
            .with_body("Your Cart\nSubtotal: $20")
            .with_button(FakeButton::new("decoy", "Checkout").with_effect(ClickEffect::None)),
    );

    let report = controller(dom.clone())
        .run(&[task(PRODUCT_URL, 1, &[])])
        .await;

    assert!(!report.success, "report: {report:?}");
    assert_eq!(report.phase, RunPhase::CartNavigation);
    assert!(
        report.error.as_deref().map(|e| e.contains("could not reach checkout")).unwrap_or(false),
        "error: {:?}",
        report.error
    );
    assert_eq!(report.final_url.as_deref(), Some(cart_url));
    // The decoy was clicked, the non-change was noticed, and the run
    // moved on to the next strategy instead of declaring progress.
    let decoy_clicks = dom.action_log().iter().filter(|l| *l == "click:decoy").count();
    assert!(decoy_clicks >= 2, "log: {:?}", dom.action_log());
}

#[tokio::test]
async fn incomplete_profile_fails_before_touching_the_page() {
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product_page()));
    let controller = CheckoutController::new(
        dom.clone(),
        None,
        Arc::new(DenyCredentials),
        Customer::default(),
        fast_config(),
    );

    let report = controller.run(&[task(PRODUCT_URL, 1, &[])]).await;

    assert!(!report.success);
    assert_eq!(report.step.as_deref(), Some("validate"));
    assert!(dom.action_log().is_empty());
}

#[tokio::test]
async fn missing_variant_fails_the_product_phase() {
    let product = FakePage::default()
        .with_button(FakeButton::new("bag", "Add to Cart").with_effect(ClickEffect::AddToCart));
    let dom = Arc::new(FakeDom::new(PRODUCT_URL, product));

    let report = controller(dom)
        .run(&[task(PRODUCT_URL, 1, &[("Color", "Blue")])])
        .await;

    assert!(!report.success);
    assert_eq!(report.phase, RunPhase::Product);
    assert!(
        report.error.as_deref().map(|e| e.contains("no control found")).unwrap_or(false),
        "error: {:?}",
        report.error
    );
}

mod recovery {
    use super::*;
    use action_executor::Executor;
    use element_locator::Locator;
    use field_filler::Filler;
    use llm_bridge::{FallbackBridge, LlmClient, LlmError, DEFAULT_CONFIDENCE_FLOOR};
    use overlay_dismiss::Dismisser;
    use std::sync::Mutex;

    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _prompt: &str,
            _image: Option<&[u8]>,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.replies
                .lock()
                .expect("lock")
                .pop()
                .ok_or_else(|| LlmError::Request("script exhausted".into()))
        }
    }

    fn bridge(dom: Arc<FakeDom>, reply: &str) -> Arc<FallbackBridge> {
        let retry = fast_config().retry;
        let executor = Arc::new(Executor::new(
            dom.clone(),
            Arc::new(Locator::new(dom.clone(), retry)),
            Arc::new(Filler::new(dom.clone(), retry)),
            Arc::new(Dismisser::new(dom.clone())),
            customer(),
            None,
        ));
        let llm = Arc::new(ScriptedLlm {
            replies: Mutex::new(vec![reply.to_string()]),
        });
        Arc::new(FallbackBridge::new(
            llm,
            executor,
            dom,
            DEFAULT_CONFIDENCE_FLOOR,
        ))
    }

    #[tokio::test]
    async fn confident_plan_unsticks_an_unrecognized_page() {
        let review_url = "https://shop.test/checkout/review";
        let thanks_url = "https://shop.test/checkout/thank_you";
        let product = FakePage::default()
            .with_button(
                FakeButton::new("bag", "Add to Cart").with_effect(ClickEffect::AddToCart),
            )
            .with_button(
                FakeButton::new("go", "Checkout")
                    .with_effect(ClickEffect::GoTo(review_url.into())),
            );
        let dom = Arc::new(FakeDom::new(PRODUCT_URL, product));
        // Rule-based handling has nothing to grab here; only the model
        // knows that "Continue" is the way forward.
        dom.add_page(
            review_url,
            FakePage::default().with_body("Review your order").with_button(
                FakeButton::new("cont", "Continue")
                    .with_effect(ClickEffect::GoTo(CONTACT_URL.into())),
            ),
        );
        dom.add_page(
            CONTACT_URL,
            FakePage::default()
                .with_field(FakeField::new("email", "email").with_input_type("email"))
                .with_button(
                    FakeButton::new("cont-ship", "Continue to shipping")
                        .with_effect(ClickEffect::GoTo(thanks_url.into())),
                ),
        );
        dom.add_page(
            thanks_url,
            FakePage::default().with_body("Thank you for your order"),
        );

        let bridge = bridge(
            dom.clone(),
            r#"{"reasoning": "a continue button is visible", "confidence": 0.85, "actions": [{"tool": "click_element", "params": {"keywords": ["continue"]}}]}"#,
        );
        let controller = CheckoutController::new(
            dom.clone(),
            Some(bridge),
            Arc::new(DenyCredentials),
            customer(),
            fast_config(),
        );

        let report = controller.run(&[task(PRODUCT_URL, 1, &[])]).await;

        assert!(report.success, "report: {report:?}");
        assert_eq!(report.final_url.as_deref(), Some(thanks_url));
        assert!(dom.action_log().contains(&"click:cont".to_string()));
    }
}
