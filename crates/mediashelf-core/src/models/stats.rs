use serde::{Deserialize, Serialize};

/// Collection-wide counters for the `stats` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total: usize,

    pub owned: usize,
    pub wishlist: usize,
    pub for_sale: usize,
    pub loaned_out: usize,
    pub missing: usize,

    pub dvd: usize,
    pub blu_ray: usize,
    pub uhd_4k: usize,
    pub blu_ray_3d: usize,

    pub with_specs: usize,
    pub with_rating: usize,

    /// Sum of recorded purchase prices.
    pub total_spent: f64,
}
