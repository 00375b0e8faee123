use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::usage::Meta;

/// Moderation verdict for one input
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
}

impl ModerationResult {
    pub fn new(flagged: bool) -> Self {
        Self {
            flagged,
            ..Default::default()
        }
    }

    /// Lenient parse of a provider result object; missing or malformed fields fall back to empty
    pub fn from_value(value: &Value) -> Self {
        let categories = value
            .get("categories")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                    .collect()
            })
            .unwrap_or_default();

        let category_scores = value
            .get("category_scores")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            flagged: value.get("flagged").and_then(Value::as_bool).unwrap_or(false),
            categories,
            category_scores,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResponse {
    pub results: Vec<ModerationResult>,
    pub meta: Meta,
}

impl ModerationResponse {
    pub fn new(results: Vec<ModerationResult>, meta: Meta) -> Self {
        Self { results, meta }
    }

    pub fn is_flagged(&self) -> bool {
        self.results.iter().any(|r| r.flagged)
    }

    pub fn first_flagged(&self) -> Option<&ModerationResult> {
        self.results.iter().find(|r| r.flagged)
    }

    pub fn flagged(&self) -> Vec<&ModerationResult> {
        self.results.iter().filter(|r| r.flagged).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(flags: &[bool]) -> ModerationResponse {
        ModerationResponse::new(
            flags.iter().map(|f| ModerationResult::new(*f)).collect(),
            Meta::new("modr-4913", "omni-moderation-latest"),
        )
    }

    #[test]
    fn test_flagged_aggregates() {
        for flags in [
            vec![],
            vec![false, false],
            vec![false, true, false, true],
            vec![true],
        ] {
            let response = response(&flags);
            let k = flags.iter().filter(|f| **f).count();

            assert_eq!(response.is_flagged(), k > 0);
            assert_eq!(response.flagged().len(), k);
            match flags.iter().position(|f| *f) {
                Some(idx) => assert!(std::ptr::eq(
                    response.first_flagged().unwrap(),
                    &response.results[idx]
                )),
                None => assert!(response.first_flagged().is_none()),
            }
        }
    }

    #[test]
    fn test_first_flagged_keeps_original_order() {
        let mut first = ModerationResult::new(true);
        first.categories.insert("hate".to_string(), true);
        let mut second = ModerationResult::new(true);
        second.categories.insert("violence".to_string(), true);

        let response = ModerationResponse::new(
            vec![ModerationResult::new(false), first.clone(), second],
            Meta::default(),
        );

        assert_eq!(response.first_flagged(), Some(&first));
    }

    #[test]
    fn test_from_value_reads_api_shape() {
        let result = ModerationResult::from_value(&json!({
            "flagged": true,
            "categories": {"hate": true, "violence": false},
            "category_scores": {"hate": 0.9, "violence": 0.1}
        }));

        assert!(result.flagged);
        assert_eq!(result.categories.get("hate"), Some(&true));
        assert_eq!(result.category_scores.get("violence"), Some(&0.1));

        let empty = ModerationResult::from_value(&json!({}));
        assert!(!empty.flagged);
        assert!(empty.categories.is_empty());
    }
}
