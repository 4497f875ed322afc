//! Emotion distribution for the donut chart

use std::collections::HashMap;

use crate::models::{color_for, DiaryEntry, EmotionEntry};

/// Count entries per emotion label and normalize to fractions.
///
/// Blank labels are skipped and excluded from the denominator. With no
/// non-blank labels the result is empty. Slices are ordered by count
/// descending, then label ascending.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(entries: &[DiaryEntry]) -> Vec<EmotionEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        let label = entry.selected_emotion.as_str();
        if !label.trim().is_empty() {
            *counts.entry(label).or_default() += 1;
        }
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_unstable_by(|(a_label, a_count), (b_label, b_count)| {
        b_count.cmp(a_count).then_with(|| a_label.cmp(b_label))
    });

    let total = total as f64;
    counts
        .into_iter()
        .map(|(label, count)| EmotionEntry {
            label: label.to_string(),
            count,
            percent: count as f64 / total,
            color: color_for(label),
        })
        .collect()
}
