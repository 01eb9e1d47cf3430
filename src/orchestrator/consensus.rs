//! Field-level consensus merge across backend results.
//!
//! Two backends agree on a field when the values are equal, or when both are
//! strings whose normalized edit similarity clears the configured threshold.
//! Each field resolves independently to the value with the widest agreement.

use crate::backend::types::{ExtractionResult, FieldValue, TokenUsage};
use std::collections::BTreeMap;

/// Normalized similarity in [0, 1] between two strings.
///
/// 1.0 for identical input after trimming and lowercasing, scaled down by
/// Levenshtein distance over the longer length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn values_agree(a: &serde_json::Value, b: &serde_json::Value, threshold: f64) -> bool {
    if a == b {
        return true;
    }
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => similarity(a, b) >= threshold,
        _ => false,
    }
}

/// Representative of an agreement group: prefer the longer string (more
/// complete near-duplicate), otherwise the higher-confidence value.
fn pick_representative<'a>(group: &[&'a FieldValue]) -> &'a FieldValue {
    let mut best = group[0];
    for candidate in &group[1..] {
        let better = match (candidate.value.as_str(), best.value.as_str()) {
            (Some(c), Some(b)) if c.len() != b.len() => c.len() > b.len(),
            _ => candidate.confidence > best.confidence,
        };
        if better {
            best = candidate;
        }
    }
    best
}

/// Merge fan-out results into one, field by field.
///
/// For each field name seen anywhere, the value with the largest agreement
/// group wins; ties break toward higher confidence. The merged result's
/// confidence is the mean of the chosen field confidences, completeness the
/// mean across contributors, and validation the contributor majority. Token
/// usage is zeroed: per-backend usage has already been billed individually.
pub fn merge_results(results: &[(String, ExtractionResult)], threshold: f64) -> ExtractionResult {
    let mut field_names: Vec<&str> = Vec::new();
    for (_, result) in results {
        for name in result.fields.keys() {
            if !field_names.contains(&name.as_str()) {
                field_names.push(name);
            }
        }
    }

    let mut merged = BTreeMap::new();
    for name in field_names {
        let candidates: Vec<&FieldValue> = results
            .iter()
            .filter_map(|(_, r)| r.fields.get(name))
            .collect();
        if candidates.is_empty() {
            continue;
        }

        // Each candidate anchors a group of everything that agrees with it;
        // the widest group (then highest confidence) wins.
        let mut winner: Option<(Vec<&FieldValue>, f64)> = None;
        for anchor in &candidates {
            let group: Vec<&FieldValue> = candidates
                .iter()
                .filter(|c| values_agree(&anchor.value, &c.value, threshold))
                .copied()
                .collect();
            let top_confidence = group
                .iter()
                .map(|c| c.confidence)
                .fold(f64::NEG_INFINITY, f64::max);
            let replace = match &winner {
                None => true,
                Some((best_group, best_conf)) => {
                    group.len() > best_group.len()
                        || (group.len() == best_group.len() && top_confidence > *best_conf)
                }
            };
            if replace {
                winner = Some((group, top_confidence));
            }
        }

        if let Some((group, top_confidence)) = winner {
            let representative = pick_representative(&group);
            merged.insert(
                name.to_string(),
                FieldValue {
                    value: representative.value.clone(),
                    confidence: top_confidence,
                },
            );
        }
    }

    let confidence = if merged.is_empty() {
        0.0
    } else {
        merged.values().map(|f| f.confidence).sum::<f64>() / merged.len() as f64
    };
    let completeness = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|(_, r)| r.completeness).sum::<f64>() / results.len() as f64
    };
    let passes = results.iter().filter(|(_, r)| r.validation_passed).count();
    let validation_passed = passes * 2 > results.len();

    ExtractionResult {
        fields: merged,
        confidence,
        completeness,
        validation_passed,
        usage: TokenUsage::default(),
    }
}
