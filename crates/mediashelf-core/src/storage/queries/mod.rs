mod stats;

pub use stats::CollectionStatsQuery;
