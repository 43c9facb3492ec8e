/// Completeness scoring for collection items.
///
/// score = enrichment weights + condition bonus
/// Richer records and better-kept discs rank higher, so the duplicate
/// view can suggest which copy of a title to keep.
use crate::models::{CollectionItem, Condition};

/// Points for a present technical-specs link — the most valuable
/// enrichment, since specs are the hardest field to re-fetch.
const SPECS_WEIGHT: i64 = 3;

/// Score a single item by how complete its record is.
pub fn completeness_score(item: &CollectionItem) -> i64 {
    let mut score = 0i64;

    if item.poster_url.is_some() {
        score += 2;
    }
    if item.purchase_date.is_some() {
        score += 1;
    }
    if item.purchase_price.is_some() {
        score += 1;
    }
    if item.purchase_location.is_some() {
        score += 1;
    }
    if item.personal_rating.is_some() {
        score += 2;
    }
    if item.notes.is_some() {
        score += 1;
    }
    if item.technical_specs_id.is_some() {
        score += SPECS_WEIGHT;
    }

    score + condition_bonus(item.condition)
}

/// Condition bonus, best → worst.
pub fn condition_bonus(condition: Condition) -> i64 {
    match condition {
        Condition::New => 5,
        Condition::LikeNew => 4,
        Condition::Good => 3,
        Condition::Fair => 2,
        Condition::Poor => 1,
    }
}

/// The item a merge should keep by default: highest score, with the
/// first-encountered item winning ties (stable fold over input order).
pub fn suggested_keeper(items: &[CollectionItem]) -> Option<&CollectionItem> {
    let mut best: Option<(&CollectionItem, i64)> = None;
    for item in items {
        let score = completeness_score(item);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((item, score)),
        }
    }
    best.map(|(item, _)| item)
}
