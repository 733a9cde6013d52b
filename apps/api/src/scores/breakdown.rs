use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::score::{Breakdown, CategoryScore};

/// One category as submitted. `percent` is derived when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub score: f64,
    pub max_score: f64,
    pub percent: Option<f64>,
}

/// Validates categories and fills in missing percentages.
pub fn normalize_breakdown(
    input: BTreeMap<String, CategoryInput>,
) -> Result<Breakdown, String> {
    let mut out = Breakdown::new();
    for (name, cat) in input {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err("breakdown category names cannot be empty".to_string());
        }
        if !cat.score.is_finite() || !cat.max_score.is_finite() || cat.score < 0.0 || cat.max_score < 0.0 {
            return Err(format!("category '{name}' must have non-negative scores"));
        }
        let percent = match cat.percent {
            Some(p) if p.is_finite() => p,
            Some(_) => return Err(format!("category '{name}' has an invalid percent")),
            None if cat.max_score > 0.0 => cat.score / cat.max_score * 100.0,
            None => 0.0,
        };
        out.insert(
            name,
            CategoryScore {
                score: cat.score,
                max_score: cat.max_score,
                percent,
            },
        );
    }
    Ok(out)
}

/// Mean of the category percentages, or `fallback` when there are none.
pub fn overall_percent(breakdown: &Breakdown, fallback: f64) -> f64 {
    if breakdown.is_empty() {
        return fallback;
    }
    let total: f64 = breakdown.values().map(|c| c.percent).sum();
    total / breakdown.len() as f64
}
