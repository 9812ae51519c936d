//! Prompt assembly for recovery planning. The model sees a trimmed
//! structural snapshot, never the full DOM, and is asked for a strict
//! JSON plan over the executor's tool registry.

use page_perceiver::PageObservation;
use std::fmt::Write;

const MAX_LISTED: usize = 15;

pub fn recovery_prompt(observation: &PageObservation, failure: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are assisting an automated e-commerce checkout that is stuck.\n"
    );
    let _ = writeln!(prompt, "Page URL: {}", observation.url);
    let _ = writeln!(prompt, "Detected page state: {}", observation.state.as_str());
    let _ = writeln!(prompt, "What went wrong: {failure}\n");

    let _ = writeln!(prompt, "Visible buttons:");
    for button in observation
        .buttons
        .iter()
        .filter(|b| b.visible)
        .take(MAX_LISTED)
    {
        let _ = writeln!(
            prompt,
            "  - text={:?} classes={:?} id={:?}",
            button.text, button.classes, button.id
        );
    }

    let _ = writeln!(prompt, "\nVisible form fields:");
    for field in observation
        .fields
        .iter()
        .filter(|f| f.visible)
        .take(MAX_LISTED)
    {
        let _ = writeln!(
            prompt,
            "  - name={:?} id={:?} label={:?} type={:?} filled={}",
            field.name,
            field.id,
            field.label,
            field.input_type,
            field.is_filled()
        );
    }

    let _ = writeln!(
        prompt,
        r#"
Available tools:
  press_key        params: {{"key": "Escape"}}
  click_element    params: {{"keywords": ["checkout"]}} or {{"text": "Continue"}}
  fill_field       params: {{"field_type": "email|first_name|last_name|phone|address_line1|address_line2|city|state|zip|country", "value": "..."}}
  select_dropdown  params: {{"field_type": "state|country", "value": "..."}}
  select_shipping_method  params: {{}}
  wait             params: {{"ms": 1000}}
  scroll           params: {{"dy": 600}}
  dismiss_popups   params: {{}}

For customer data use placeholders like {{{{customer.contact.email}}}} or
{{{{customer.shipping_address.city}}}} as the value; never invent personal data.
Never fill payment card fields.

Reply with strict JSON only, no prose and no code fences:
{{"reasoning": "...", "confidence": 0.0, "actions": [{{"tool": "...", "params": {{...}}}}]}}
Set confidence below 0.5 if you are unsure what would help."#
    );
    prompt
}

/// Models wrap JSON in markdown fences no matter how firmly told not to.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}
