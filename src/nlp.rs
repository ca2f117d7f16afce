//! Offline keyword scoring for conversation text.
//!
//! A crude, deterministic fallback for when the text-completion model is
//! unavailable or too slow: each bilingual (English/Arabic) term list scores
//! one point per distinct term found as a substring of the lowercased,
//! NFC-composed text.
//! No stemming and no negation handling.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::models::ClassificationLabel;

/// Terms that point at exercise planning
pub const WORKOUT_KEYWORDS: &[&str] = &[
    // English
    "workout",
    "exercise",
    "training",
    "gym",
    "sets",
    "reps",
    "squat",
    "deadlift",
    "bench press",
    "push-up",
    "pull-up",
    "lunge",
    "plank",
    "cardio",
    "muscle",
    "dumbbell",
    "barbell",
    "lifting",
    // Arabic
    "تمرين",
    "تمارين",
    "رياضة",
    "جيم",
    "نادي",
    "عضلات",
    "مجموعات",
    "تكرارات",
    "عدات",
    "أثقال",
    "كارديو",
    "سكوات",
    "ديدلفت",
    "جري",
];

/// Terms that point at food intake
pub const NUTRITION_KEYWORDS: &[&str] = &[
    // English
    "calorie",
    "protein",
    "carb",
    "fat",
    "meal",
    "diet",
    "nutrition",
    "food",
    "breakfast",
    "lunch",
    "dinner",
    "snack",
    "macros",
    "eating",
    // Arabic
    "سعرات",
    "بروتين",
    "كربوهيدرات",
    "دهون",
    "وجبة",
    "وجبات",
    "أكل",
    "طعام",
    "فطور",
    "غداء",
    "عشاء",
    "حمية",
    "دايت",
    "تغذية",
];

/// Per-domain keyword hit counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordScores {
    /// Distinct workout terms present
    pub workout: usize,
    /// Distinct nutrition terms present
    pub nutrition: usize,
}

impl KeywordScores {
    /// Strictly higher score wins; ties (including 0-0) are neutral
    #[must_use]
    pub fn label(&self) -> ClassificationLabel {
        match self.workout.cmp(&self.nutrition) {
            Ordering::Greater => ClassificationLabel::Workout,
            Ordering::Less => ClassificationLabel::Nutrition,
            Ordering::Equal => ClassificationLabel::Neutral,
        }
    }
}

/// NFC-normalize and lowercase; whitespace is left as written
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

fn count_present(haystack: &str, terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|term| haystack.contains(&normalize_text(term)))
        .count()
}

/// Score `text` against both keyword lists
#[must_use]
pub fn keyword_scores(text: &str) -> KeywordScores {
    let normalized = normalize_text(text);
    KeywordScores {
        workout: count_present(&normalized, WORKOUT_KEYWORDS),
        nutrition: count_present(&normalized, NUTRITION_KEYWORDS),
    }
}

/// Classify `text` without any network access
#[must_use]
pub fn classify_by_keyword(text: &str) -> ClassificationLabel {
    keyword_scores(text).label()
}
