use std::collections::HashSet;

use crate::model::Place;

/// Canonical place set plus how many later duplicates were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    pub places: Vec<Place>,
    pub removed: usize,
}

/// Collapse places by `place_id`, keeping the first occurrence in
/// collection order. Overlapping area radii make duplicates routine.
pub fn dedupe(places: Vec<Place>) -> Deduplicated {
    let initial = places.len();
    let mut seen = HashSet::with_capacity(initial);
    let places: Vec<Place> = places
        .into_iter()
        .filter(|p| seen.insert(p.place_id.clone()))
        .collect();
    Deduplicated {
        removed: initial - places.len(),
        places,
    }
}
