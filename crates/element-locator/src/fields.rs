//! Semantic field matching. A field earns a slot through a ladder of
//! attribute checks, most trustworthy first, and every candidate match is
//! vetoed when the matched attribute also names a conflicting slot.

use cartflow_core_types::{FieldInfo, FieldKind, MatchMethod, MatchResult};
use cartflow_keywords::{
    autocomplete_tokens_for, exclusions_for, keywords_for, normalize, normalized_contains,
};

const SCORE_AUTOCOMPLETE_POSTAL: i64 = 100;
const SCORE_TYPE_ATTR: i64 = 90;
const SCORE_ID: i64 = 80;
const SCORE_NAME: i64 = 75;
const SCORE_DATA_TESTID: i64 = 70;
const SCORE_AUTOCOMPLETE: i64 = 65;
const SCORE_LABEL: i64 = 60;
const SCORE_PLACEHOLDER: i64 = 55;

/// Find the field for a semantic slot. Already-filled fields are skipped
/// unless `include_filled` is set (the re-verification pass sets it).
pub fn match_field(fields: &[FieldInfo], kind: FieldKind, include_filled: bool) -> MatchResult {
    let mut best: Option<(i64, &FieldInfo, MatchMethod, String)> = None;

    for info in fields {
        if !info.visible {
            continue;
        }
        if !include_filled && info.is_filled() {
            continue;
        }
        if rejected_by_type(info, kind) {
            continue;
        }
        if let Some((score, method, matched)) = ladder_match(info, kind) {
            match best {
                Some((top, ..)) if top >= score => {}
                _ => best = Some((score, info, method, matched)),
            }
        }
    }

    match best {
        Some((score, info, method, matched_text)) => MatchResult::Found {
            handle: info.handle.clone(),
            matched_text,
            score,
            method,
        },
        None => MatchResult::NotFound,
    }
}

fn ladder_match(info: &FieldInfo, kind: FieldKind) -> Option<(i64, MatchMethod, String)> {
    // Explicit autofill annotation for the postal slot outranks
    // everything; sites that set it set it correctly.
    if kind == FieldKind::PostalCode && info.autocomplete == "postal-code" {
        return Some((
            SCORE_AUTOCOMPLETE_POSTAL,
            MatchMethod::AutocompletePostal,
            info.autocomplete.clone(),
        ));
    }

    // An email/tel input type is as good as an id match.
    if kind == FieldKind::Email && info.input_type == "email" {
        return Some((SCORE_TYPE_ATTR, MatchMethod::Structural, "type=email".into()));
    }
    if kind == FieldKind::Phone && info.input_type == "tel" {
        return Some((SCORE_TYPE_ATTR, MatchMethod::Structural, "type=tel".into()));
    }

    let attrs = [
        (info.id.as_str(), MatchMethod::Id, SCORE_ID),
        (info.name.as_str(), MatchMethod::Name, SCORE_NAME),
        (info.data_testid.as_str(), MatchMethod::DataTestId, SCORE_DATA_TESTID),
        (info.label.as_str(), MatchMethod::Label, SCORE_LABEL),
        (info.aria_label.as_str(), MatchMethod::Label, SCORE_LABEL),
        (info.placeholder.as_str(), MatchMethod::Placeholder, SCORE_PLACEHOLDER),
    ];
    let keywords = keywords_for(kind);
    let exclusions = exclusions_for(kind);

    for (value, method, score) in attrs {
        if value.trim().is_empty() {
            continue;
        }
        let hit = keywords.iter().any(|kw| normalized_contains(value, kw));
        if !hit {
            continue;
        }
        if exclusions.iter().any(|term| normalized_contains(value, term)) {
            continue;
        }
        return Some((score, method, value.to_string()));
    }

    // WHATWG autofill tokens, exact match only.
    if !info.autocomplete.is_empty() {
        let token = normalize(&info.autocomplete);
        if autocomplete_tokens_for(kind)
            .iter()
            .any(|t| normalize(t) == token)
        {
            return Some((
                SCORE_AUTOCOMPLETE,
                MatchMethod::Autocomplete,
                info.autocomplete.clone(),
            ));
        }
    }

    None
}

/// Input types that make a field categorically wrong for a slot,
/// regardless of what its attributes say.
fn rejected_by_type(info: &FieldInfo, kind: FieldKind) -> bool {
    match kind {
        FieldKind::AddressLine1 | FieldKind::AddressLine2 | FieldKind::City => {
            matches!(info.input_type.as_str(), "email" | "tel" | "password")
        }
        FieldKind::Email => matches!(info.input_type.as_str(), "tel" | "password" | "number"),
        FieldKind::Phone => matches!(info.input_type.as_str(), "email" | "password"),
        FieldKind::Quantity => info.is_select(),
        FieldKind::Password => info.input_type != "password",
        _ => info.input_type == "password",
    }
}
