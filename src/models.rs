//! Data models for diary storage and emotion statistics
//!
//! This module contains the persisted [`DiaryEntry`], its insert form
//! [`NewDiaryEntry`], the known [`Emotion`] vocabulary with its chart colors,
//! and the derived [`EmotionEntry`] slices.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};

/// A stored diary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Database primary key, assigned on insert
    pub id: i64,
    /// Entry title (may be empty)
    pub title: String,
    /// Free-text body (may be empty or multi-line)
    pub content: String,
    /// Emotion tag; any string is accepted
    pub selected_emotion: String,
    /// Reference to an externally managed image (path or content URI)
    pub image_uri: String,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: i64,
    /// Last update time in milliseconds since the Unix epoch
    pub updated_at: i64,
}

/// A diary entry that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiaryEntry {
    /// Entry title
    pub title: String,
    /// Free-text body
    pub content: String,
    /// Emotion tag
    pub selected_emotion: String,
    /// Image reference
    pub image_uri: String,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: i64,
    /// Update time in milliseconds since the Unix epoch
    pub updated_at: i64,
}

impl NewDiaryEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        selected_emotion: impl Into<String>,
        image_uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            title: title.into(),
            content: content.into(),
            selected_emotion: selected_emotion.into(),
            image_uri: image_uri.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Override both timestamps, e.g. when importing an older entry.
    #[must_use]
    pub fn with_created_at(mut self, millis: i64) -> Self {
        self.created_at = millis;
        self.updated_at = millis;
        self
    }

    /// Attach the id assigned by the store.
    #[must_use]
    pub fn into_entry(self, id: i64) -> DiaryEntry {
        DiaryEntry {
            id,
            title: self.title,
            content: self.content,
            selected_emotion: self.selected_emotion,
            image_uri: self.image_uri,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// ARGB display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Fallback for labels outside the known vocabulary.
    pub const LIGHT_GRAY: Self = Self(0xFFCC_CCCC);

    /// Render as `#RRGGBB`, dropping the alpha channel.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:06X}", self.0 & 0x00FF_FFFF)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

/// Known emotion tags offered by the write screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    /// 행복
    Happy,
    /// 슬픔
    Sad,
    /// 기쁨
    Joy,
    /// 분노
    Anger,
    /// 평온
    Calm,
}

impl Emotion {
    /// Every known emotion, in picker order.
    pub const ALL: [Self; 5] = [Self::Happy, Self::Sad, Self::Joy, Self::Anger, Self::Calm];

    /// Stored label for this emotion.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Happy => "행복",
            Self::Sad => "슬픔",
            Self::Joy => "기쁨",
            Self::Anger => "분노",
            Self::Calm => "평온",
        }
    }

    /// Chart color for this emotion.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Happy => Color(0xFFE5_7373),
            Self::Sad => Color(0xFF64_B5F6),
            Self::Joy => Color(0xFFFF_B74D),
            Self::Anger => Color(0xFFBA_68C8),
            Self::Calm => Color(0xFF4D_B6AC),
        }
    }

    /// Look up a stored label. Returns `None` for anything outside the vocabulary.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|emotion| emotion.label() == label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chart color for any label, falling back to light gray.
#[must_use]
pub fn color_for(label: &str) -> Color {
    Emotion::from_label(label).map_or(Color::LIGHT_GRAY, Emotion::color)
}

/// One slice of the emotion distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionEntry {
    /// Emotion label as stored
    pub label: String,
    /// Number of entries carrying this label
    pub count: usize,
    /// Share of all non-blank labels, in `[0, 1]`
    pub percent: f64,
    /// Display color
    pub color: Color,
}

impl EmotionEntry {
    /// Whole-number percentage for legends (truncated, like the chart legend).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn whole_percent(&self) -> u32 {
        (self.percent * 100.0) as u32
    }
}
