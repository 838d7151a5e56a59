//! Review text normalization and derived features.

use chrono::Datelike;

use crate::model::{RawReview, Review};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Lowercase and collapse every whitespace run into a single space.
/// Missing or empty text becomes the empty string.
pub fn clean_text(text: Option<&str>) -> String {
    match text {
        None | Some("") => String::new(),
        Some(t) => t
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

pub fn clean(raw: RawReview) -> Review {
    let text_clean = clean_text(raw.text.as_deref());
    let text_length = text_clean.chars().count();
    let word_count = text_clean.split_whitespace().count();
    let date = raw.review_date;

    Review {
        place_id: raw.place_id,
        place_name: raw.place_name,
        author_id: raw.author_id,
        rating: raw.rating,
        text: raw.text,
        text_clean,
        text_length,
        word_count,
        review_date: date,
        year: date.map(|d| d.year()),
        month: date.map(|d| d.month()),
        day_of_week: date.map(|d| d.weekday().num_days_from_monday()),
        relative_time_description: raw.relative_time_description,
    }
}

#[cfg(feature = "rayon")]
pub fn clean_all(raw: Vec<RawReview>) -> Vec<Review> {
    raw.into_par_iter().map(clean).collect()
}

#[cfg(not(feature = "rayon"))]
pub fn clean_all(raw: Vec<RawReview>) -> Vec<Review> {
    raw.into_iter().map(clean).collect()
}
