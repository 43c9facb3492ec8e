use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ShelfError};

// ─── CollectionItem ─────────────────────────────────────────

/// One physical disc in the collection — the canonical record.
/// Denormalized into SQLite; JSON is the interchange shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    pub format: MediaFormat,

    #[serde(default)]
    pub condition: Condition,

    #[serde(default)]
    pub collection_type: CollectionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_location: Option<String>,

    /// Personal rating, 1–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Reference to a linked technical-specification record
    /// (disc edition specs fetched from an external source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_specs_id: Option<String>,
}

impl CollectionItem {
    /// Create a new item with minimal required fields.
    pub fn new(title: impl Into<String>, format: MediaFormat) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            title: title.into(),
            year: None,
            format,
            condition: Condition::default(),
            collection_type: CollectionType::default(),
            poster_url: None,
            purchase_date: None,
            purchase_price: None,
            purchase_location: None,
            personal_rating: None,
            notes: None,
            technical_specs_id: None,
        }
    }

    /// Validate required fields where external data enters the core.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ShelfError::ValidationError("title must not be empty".into()));
        }
        if let Some(rating) = self.personal_rating {
            if !(1..=10).contains(&rating) {
                return Err(ShelfError::ValidationError(format!(
                    "personal_rating must be 1-10, got {rating}"
                )));
            }
        }
        Ok(())
    }
}

// ─── MediaFormat ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    Dvd,
    BluRay,
    Uhd4k,
    BluRay3d,
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dvd => "DVD",
            Self::BluRay => "Blu-ray",
            Self::Uhd4k => "4K UHD",
            Self::BluRay3d => "3D Blu-ray",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MediaFormat {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dvd" => Ok(Self::Dvd),
            "blu-ray" | "bluray" | "blu_ray" | "bd" => Ok(Self::BluRay),
            "4k uhd" | "4k" | "uhd" | "uhd4k" | "4k_uhd" => Ok(Self::Uhd4k),
            "3d blu-ray" | "3d" | "blu-ray 3d" | "blu_ray_3d" => Ok(Self::BluRay3d),
            other => Err(ShelfError::UnknownFormat(other.to_string())),
        }
    }
}

// ─── Condition ──────────────────────────────────────────────

/// Physical condition, ordered best → worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "New",
            Self::LikeNew => "Like New",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Condition {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "like new" | "like_new" | "likenew" => Ok(Self::LikeNew),
            "good" => Ok(Self::Good),
            "fair" => Ok(Self::Fair),
            "poor" => Ok(Self::Poor),
            other => Err(ShelfError::UnknownCondition(other.to_string())),
        }
    }
}

// ─── CollectionType ─────────────────────────────────────────

/// Item status: where the disc sits in the owner's world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    #[default]
    Owned,
    Wishlist,
    ForSale,
    LoanedOut,
    Missing,
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Owned => "owned",
            Self::Wishlist => "wishlist",
            Self::ForSale => "for_sale",
            Self::LoanedOut => "loaned_out",
            Self::Missing => "missing",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CollectionType {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "owned" => Ok(Self::Owned),
            "wishlist" => Ok(Self::Wishlist),
            "for_sale" | "for-sale" | "forsale" => Ok(Self::ForSale),
            "loaned_out" | "loaned-out" | "loaned" => Ok(Self::LoanedOut),
            "missing" => Ok(Self::Missing),
            other => Err(ShelfError::UnknownStatus(other.to_string())),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────
