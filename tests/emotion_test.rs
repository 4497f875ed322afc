use oneframe::emotion::aggregate;
use oneframe::models::{Color, DiaryEntry, Emotion};
use proptest::prelude::*;

fn entry(id: i64, emotion: &str) -> DiaryEntry {
    DiaryEntry {
        id,
        title: format!("entry {id}"),
        content: String::new(),
        selected_emotion: emotion.to_string(),
        image_uri: String::new(),
        created_at: 1_700_000_000_000 + id,
        updated_at: 1_700_000_000_000 + id,
    }
}

fn entries(emotions: &[&str]) -> Vec<DiaryEntry> {
    emotions
        .iter()
        .enumerate()
        .map(|(i, emotion)| entry(i64::try_from(i).unwrap() + 1, emotion))
        .collect()
}

#[test]
fn test_empty_input_gives_empty_distribution() {
    assert!(aggregate(&[]).is_empty());
}

#[test]
fn test_only_blank_labels_gives_empty_distribution() {
    assert!(aggregate(&entries(&["", "  ", "\t"])).is_empty());
}

#[test]
fn test_two_to_one_split() {
    let slices = aggregate(&entries(&["행복", "슬픔", "행복"]));

    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].label, "행복");
    assert_eq!(slices[0].count, 2);
    assert!((slices[0].percent - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(slices[0].color, Emotion::Happy.color());
    assert_eq!(slices[0].whole_percent(), 66);

    assert_eq!(slices[1].label, "슬픔");
    assert_eq!(slices[1].count, 1);
    assert!((slices[1].percent - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(slices[1].color, Emotion::Sad.color());
    assert_eq!(slices[1].whole_percent(), 33);
}

#[test]
fn test_blank_labels_excluded_from_denominator() {
    let slices = aggregate(&entries(&["평온", "", "평온", " "]));

    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].count, 2);
    assert!((slices[0].percent - 1.0).abs() < 1e-9);
}

#[test]
fn test_ties_are_ordered_by_label() {
    let slices = aggregate(&entries(&["평온", "기쁨", "분노", "기쁨", "평온", "분노", "행복"]));
    let order: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();

    let mut tied = vec!["기쁨", "분노", "평온"];
    tied.sort_unstable();
    tied.push("행복");
    assert_eq!(order, tied);
}

#[test]
fn test_unknown_label_uses_fallback_color() {
    let slices = aggregate(&entries(&["설렘"]));

    assert_eq!(slices[0].label, "설렘");
    assert_eq!(slices[0].color, Color::LIGHT_GRAY);
    assert_eq!(slices[0].color.hex(), "#CCCCCC");
}

#[test]
fn test_known_emotion_colors() {
    assert_eq!(Emotion::Happy.color().hex(), "#E57373");
    assert_eq!(Emotion::Sad.color().hex(), "#64B5F6");
    assert_eq!(Emotion::Joy.color().hex(), "#FFB74D");
    assert_eq!(Emotion::Anger.color().hex(), "#BA68C8");
    assert_eq!(Emotion::Calm.color().hex(), "#4DB6AC");
}

#[test]
fn test_distribution_serializes_hex_colors() {
    let slices = aggregate(&entries(&["분노"]));
    let json = serde_json::to_value(&slices).unwrap();

    assert_eq!(json[0]["label"], "분노");
    assert_eq!(json[0]["count"], 1);
    assert_eq!(json[0]["color"], "#BA68C8");
}

proptest! {
    #[test]
    fn prop_percentages_sum_to_one(labels in prop::collection::vec(
        prop::sample::select(vec!["행복", "슬픔", "기쁨", "분노", "평온", "설렘", ""]),
        0..60,
    )) {
        let slices = aggregate(&entries(&labels));
        let non_blank = labels.iter().filter(|l| !l.is_empty()).count();

        if non_blank == 0 {
            prop_assert!(slices.is_empty());
        } else {
            let sum: f64 = slices.iter().map(|s| s.percent).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert_eq!(slices.iter().map(|s| s.count).sum::<usize>(), non_blank);
            prop_assert!(slices.windows(2).all(|w| w[0].count >= w[1].count));
        }
    }
}
