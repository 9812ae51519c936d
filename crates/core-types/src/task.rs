use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One product to buy: the page to start from, how many units, and which
/// variant options (e.g. `"Color" -> "Blue"`, `"Size" -> "M"`) to select
/// before adding to cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub url: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Option name to desired value. A `BTreeMap` so selection order is
    /// deterministic across runs.
    #[serde(default)]
    pub selected_variant: BTreeMap<String, String>,
}

fn default_quantity() -> u32 {
    1
}

impl Task {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quantity: 1,
            selected_variant: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, option: impl Into<String>, value: impl Into<String>) -> Self {
        self.selected_variant.insert(option.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_defaults_to_one() {
        let task: Task = serde_json::from_str(r#"{"url": "https://shop.test/p/1"}"#)
            .expect("minimal task should parse");
        assert_eq!(task.quantity, 1);
        assert!(task.selected_variant.is_empty());
    }

    #[test]
    fn variant_map_round_trips() {
        let task = Task::new("https://shop.test/p/2")
            .with_variant("Color", "Blue")
            .with_variant("Size", "M");
        let json = serde_json::to_string(&task).expect("serialize");
        let back: Task = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, task);
    }
}
