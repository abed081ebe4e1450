// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nutrition plans: parsing the generator's output into meal sections.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::RiskLevel;

/// A day's nutrition plan split into sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NutritionPlan {
    #[serde(default)]
    pub breakfast: String,
    #[serde(default)]
    pub lunch: String,
    #[serde(default)]
    pub dinner: String,
    #[serde(default)]
    pub snacks: String,
    #[serde(default)]
    pub recommendations: String,
}

const BREAKFAST: &str = "breakfast:";
const LUNCH: &str = "lunch:";
const DINNER: &str = "dinner:";
const SNACKS: &str = "snacks:";
const RECOMMENDATIONS: &str = "recommendations:";

impl NutritionPlan {
    /// Interpret the `plan` field returned by the generator.
    ///
    /// Objects are taken as already structured. Strings are split into
    /// sections by their headings. Anything else yields an empty plan.
    pub fn parse(plan: &serde_json::Value) -> Self {
        match plan {
            serde_json::Value::Object(map) => {
                let field = |name: &str| {
                    map.get(name)
                        .map(|v| match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .unwrap_or_default()
                };
                Self {
                    breakfast: field("breakfast"),
                    lunch: field("lunch"),
                    dinner: field("dinner"),
                    snacks: field("snacks"),
                    recommendations: field("recommendations"),
                }
            }
            serde_json::Value::String(text) => Self::parse_text(text),
            _ => Self::default(),
        }
    }

    /// Split free text on `Breakfast:`, `Lunch:`, `Dinner:`, `Snacks:` and
    /// `Recommendations:` headings (case-insensitive).
    ///
    /// Dinner runs until whichever of `Snacks:` and `Recommendations:` comes
    /// first. A missing heading leaves its section empty.
    pub fn parse_text(text: &str) -> Self {
        // ASCII lowercasing keeps byte offsets aligned with `text`.
        let lower = text.to_ascii_lowercase();

        Self {
            breakfast: section(text, &lower, BREAKFAST, &[LUNCH]),
            lunch: section(text, &lower, LUNCH, &[DINNER]),
            dinner: section(text, &lower, DINNER, &[SNACKS, RECOMMENDATIONS]),
            snacks: section(text, &lower, SNACKS, &[RECOMMENDATIONS]),
            recommendations: section(text, &lower, RECOMMENDATIONS, &[]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.breakfast.is_empty()
            && self.lunch.is_empty()
            && self.dinner.is_empty()
            && self.snacks.is_empty()
            && self.recommendations.is_empty()
    }
}

/// Text after `start`, up to whichever of `ends` appears first after it,
/// or to the end of the text.
fn section(text: &str, lower: &str, start: &str, ends: &[&str]) -> String {
    let Some(pos) = lower.find(start) else {
        return String::new();
    };
    let body_start = pos + start.len();
    let rest = &lower[body_start..];

    let body_end = ends
        .iter()
        .filter_map(|end| rest.find(end))
        .min()
        .map(|offset| body_start + offset)
        .unwrap_or(text.len());

    text[body_start..body_end].trim().to_string()
}

/// Plan stored at `users/{uid}/nutritionPlans/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct NutritionRecord {
    pub risk_level: RiskLevel,
    pub plan: NutritionPlan,
    /// RFC3339
    pub generated_at: String,
    /// RFC3339, used for ordering
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "Breakfast: Oatmeal with berries\n\
        Lunch: Grilled chicken salad\n\
        Dinner: Salmon with quinoa\n\
        Snacks: Greek yogurt\n\
        Recommendations: Stay hydrated and limit caffeine.";

    #[test]
    fn test_parse_text_sections() {
        let plan = NutritionPlan::parse_text(SAMPLE);

        assert_eq!(plan.breakfast, "Oatmeal with berries");
        assert_eq!(plan.lunch, "Grilled chicken salad");
        assert_eq!(plan.dinner, "Salmon with quinoa");
        assert_eq!(plan.snacks, "Greek yogurt");
        assert_eq!(plan.recommendations, "Stay hydrated and limit caffeine.");
    }

    #[test]
    fn test_parse_text_case_insensitive() {
        let plan = NutritionPlan::parse_text(
            "BREAKFAST: Eggs LUNCH: Soup dinner: Rice RECOMMENDATIONS: Walk daily",
        );

        assert_eq!(plan.breakfast, "Eggs");
        assert_eq!(plan.lunch, "Soup");
        // No snacks heading: dinner runs to recommendations
        assert_eq!(plan.dinner, "Rice");
        assert_eq!(plan.snacks, "");
        assert_eq!(plan.recommendations, "Walk daily");
    }

    #[test]
    fn test_dinner_stops_at_earliest_heading() {
        let plan = NutritionPlan::parse_text(
            "Breakfast: Eggs Lunch: Soup Dinner: Rice Recommendations: Walk daily Snacks: Nuts",
        );

        assert_eq!(plan.dinner, "Rice");
        assert_eq!(plan.snacks, "Nuts");
        // Recommendations always run to the end of the text
        assert_eq!(plan.recommendations, "Walk daily Snacks: Nuts");
    }

    #[test]
    fn test_parse_text_missing_headings() {
        let plan = NutritionPlan::parse_text("Eat well and rest.");
        assert!(plan.is_empty());

        let plan = NutritionPlan::parse_text("Lunch: Lentils");
        assert_eq!(plan.breakfast, "");
        assert_eq!(plan.lunch, "Lentils");
    }

    #[test]
    fn test_parse_structured_object() {
        let plan = NutritionPlan::parse(&json!({
            "breakfast": "Toast",
            "lunch": "Wrap",
            "dinner": "Stew",
            "recommendations": "Rest"
        }));

        assert_eq!(plan.breakfast, "Toast");
        assert_eq!(plan.snacks, "");
        assert_eq!(plan.recommendations, "Rest");
    }

    #[test]
    fn test_parse_string_value_and_null() {
        let plan = NutritionPlan::parse(&json!(SAMPLE));
        assert_eq!(plan.snacks, "Greek yogurt");

        assert!(NutritionPlan::parse(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_parse_text_keeps_original_case() {
        let plan = NutritionPlan::parse_text("breakfast: Avocado TOAST lunch: x");
        assert_eq!(plan.breakfast, "Avocado TOAST");
    }
}
