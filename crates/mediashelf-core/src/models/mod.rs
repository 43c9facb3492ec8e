mod item;
mod stats;

pub use item::{CollectionItem, CollectionType, Condition, MediaFormat};
pub use stats::CollectionStats;
