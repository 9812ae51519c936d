//! Button scoring. Pure functions over harvested attribute bags so the
//! whole heuristic is testable without a page.

use cartflow_core_types::{ButtonInfo, MatchMethod, MatchResult};
use cartflow_keywords::{
    normalize, normalized_contains, CLOSE_CONTROL_TERMS, PAYMENT_PROVIDERS,
    STRUCTURAL_BOOST_TOKENS,
};

const EXACT_MATCH: i64 = 100;
const SUBSTRING_MATCH: i64 = 50;
const REVERSE_CONTAINMENT: i64 = 30;
const LITERAL_PHRASE: i64 = 25;
const STRUCTURAL_BOOST: i64 = 100;
const OVERLAY_BOOST: i64 = 50;

/// Score one control against a keyword ladder. Zero means ineligible.
pub fn score_button(info: &ButtonInfo, keywords: &[&str]) -> i64 {
    if !info.visible || info.disabled {
        return 0;
    }
    if is_payment_provider(info) || is_close_control(info) {
        return 0;
    }

    let candidates = [info.text.as_str(), info.aria_label.as_str()];
    let mut base = 0i64;
    for keyword in keywords {
        for text in candidates {
            if text.trim().is_empty() {
                continue;
            }
            let norm_text = normalize(text);
            let norm_kw = normalize(keyword);
            let mut score = 0i64;
            if norm_text == norm_kw {
                score = EXACT_MATCH;
            } else if norm_text.contains(&norm_kw) {
                score = SUBSTRING_MATCH;
            } else if norm_text.len() > 3 && norm_kw.contains(&norm_text) {
                score = REVERSE_CONTAINMENT;
            } else if text.to_lowercase().contains(&keyword.to_lowercase()) {
                score = LITERAL_PHRASE;
            }
            base = base.max(score);
        }
    }
    if base == 0 {
        return 0;
    }

    let mut total = base;
    let structure = format!("{} {} {}", info.classes, info.id, info.data_testid);
    if STRUCTURAL_BOOST_TOKENS
        .iter()
        .any(|token| normalized_contains(&structure, token))
    {
        total += STRUCTURAL_BOOST;
    }
    if info.in_overlay {
        total += OVERLAY_BOOST;
    }
    total
}

/// Pick the best-scoring control. Ties go to the earliest in document
/// order, which harvest order preserves.
pub fn best_button(buttons: &[ButtonInfo], keywords: &[&str]) -> MatchResult {
    let mut best: Option<(i64, &ButtonInfo)> = None;
    for info in buttons {
        let score = score_button(info, keywords);
        if score == 0 {
            continue;
        }
        match best {
            Some((top, _)) if top >= score => {}
            _ => best = Some((score, info)),
        }
    }
    match best {
        Some((score, info)) => MatchResult::Found {
            handle: info.handle.clone(),
            matched_text: if info.text.trim().is_empty() {
                info.aria_label.clone()
            } else {
                info.text.clone()
            },
            score,
            method: MatchMethod::Text,
        },
        None => MatchResult::NotFound,
    }
}

fn is_payment_provider(info: &ButtonInfo) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        info.text, info.aria_label, info.classes, info.id
    );
    PAYMENT_PROVIDERS
        .iter()
        .any(|term| normalized_contains(&haystack, term))
}

fn is_close_control(info: &ButtonInfo) -> bool {
    let text = normalize(&info.text);
    let aria = normalize(&info.aria_label);
    if CLOSE_CONTROL_TERMS
        .iter()
        .any(|term| text == normalize(term) || aria == normalize(term))
    {
        return true;
    }
    let structure = format!("{} {}", info.classes, info.id);
    normalized_contains(&structure, "close") || normalized_contains(&structure, "dismiss")
}
