//! Geographic lookup tables for dropdown selection. Sites disagree on
//! whether a state select wants "Texas" or "TX" and whether a country
//! select wants "United States", "USA", or "US"; these tables let the
//! filler try every plausible rendering.

use crate::normalize;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static US_STATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("alabama", "AL"),
        ("alaska", "AK"),
        ("arizona", "AZ"),
        ("arkansas", "AR"),
        ("california", "CA"),
        ("colorado", "CO"),
        ("connecticut", "CT"),
        ("delaware", "DE"),
        ("districtofcolumbia", "DC"),
        ("florida", "FL"),
        ("georgia", "GA"),
        ("hawaii", "HI"),
        ("idaho", "ID"),
        ("illinois", "IL"),
        ("indiana", "IN"),
        ("iowa", "IA"),
        ("kansas", "KS"),
        ("kentucky", "KY"),
        ("louisiana", "LA"),
        ("maine", "ME"),
        ("maryland", "MD"),
        ("massachusetts", "MA"),
        ("michigan", "MI"),
        ("minnesota", "MN"),
        ("mississippi", "MS"),
        ("missouri", "MO"),
        ("montana", "MT"),
        ("nebraska", "NE"),
        ("nevada", "NV"),
        ("newhampshire", "NH"),
        ("newjersey", "NJ"),
        ("newmexico", "NM"),
        ("newyork", "NY"),
        ("northcarolina", "NC"),
        ("northdakota", "ND"),
        ("ohio", "OH"),
        ("oklahoma", "OK"),
        ("oregon", "OR"),
        ("pennsylvania", "PA"),
        ("rhodeisland", "RI"),
        ("southcarolina", "SC"),
        ("southdakota", "SD"),
        ("tennessee", "TN"),
        ("texas", "TX"),
        ("utah", "UT"),
        ("vermont", "VT"),
        ("virginia", "VA"),
        ("washington", "WA"),
        ("westvirginia", "WV"),
        ("wisconsin", "WI"),
        ("wyoming", "WY"),
    ])
});

/// Two-letter USPS abbreviation for a US state or DC, if the input names
/// one. Accepts any separator/case variation of the full name.
pub fn state_abbreviation(name: &str) -> Option<&'static str> {
    US_STATES.get(normalize(name).as_str()).copied()
}

/// All the renderings of a country a select might use, most specific
/// first, starting with the input itself. Unrecognized countries return
/// just the input.
pub fn country_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![name.trim().to_string()];
    let aliases: &[&str] = match normalize(name).as_str() {
        "unitedstates" | "usa" | "us" | "unitedstatesofamerica" => {
            &["United States", "United States of America", "USA", "US"]
        }
        "unitedkingdom" | "uk" | "greatbritain" | "gb" => {
            &["United Kingdom", "Great Britain", "UK", "GB"]
        }
        "canada" | "ca" => &["Canada", "CA"],
        "australia" | "au" => &["Australia", "AU"],
        "germany" | "deutschland" | "de" => &["Germany", "Deutschland", "DE"],
        "france" | "fr" => &["France", "FR"],
        _ => &[],
    };
    for alias in aliases {
        if !candidates.iter().any(|c| normalize(c) == normalize(alias)) {
            candidates.push((*alias).to_string());
        }
    }
    candidates
}
