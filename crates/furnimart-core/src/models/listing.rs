//! Furniture listing models as served by the marketplace API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a listing: drafted, published for sale, sold and in
/// handover, then completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Draft,
    Published,
    InProgress,
    Completed,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 4] = [
        ListingStatus::Draft,
        ListingStatus::Published,
        ListingStatus::InProgress,
        ListingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
            ListingStatus::InProgress => "in_progress",
            ListingStatus::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "Draft",
            ListingStatus::Published => "Published",
            ListingStatus::InProgress => "In Progress",
            ListingStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown listing status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    NewWithTags,
    NewWithoutTags,
    LikeNew,
    #[default]
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::NewWithTags,
        Condition::NewWithoutTags,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::NewWithTags => "new_with_tags",
            Condition::NewWithoutTags => "new_without_tags",
            Condition::LikeNew => "like_new",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Condition::NewWithTags => "New with tags",
            Condition::NewWithoutTags => "New without tags",
            Condition::LikeNew => "Like new",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace(['-', ' '], "_");
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown condition '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Chair,
    Table,
    Sofa,
    Bed,
    Dresser,
    Bookshelf,
    Desk,
    Cabinet,
    Wardrobe,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Chair,
        Category::Table,
        Category::Sofa,
        Category::Bed,
        Category::Dresser,
        Category::Bookshelf,
        Category::Desk,
        Category::Cabinet,
        Category::Wardrobe,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chair => "CHAIR",
            Category::Table => "TABLE",
            Category::Sofa => "SOFA",
            Category::Bed => "BED",
            Category::Dresser => "DRESSER",
            Category::Bookshelf => "BOOKSHELF",
            Category::Desk => "DESK",
            Category::Cabinet => "CABINET",
            Category::Wardrobe => "WARDROBE",
            Category::Other => "OTHER",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Row shown in listing grids (home page, my page tabs, purchases).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Decimal string as sent by the API, e.g. "120.00"
    pub price: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl ListingSummary {
    pub fn display_price(&self) -> String {
        format_price(&self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ListingImage {
    pub id: i64,
    pub image_url: Option<String>,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Seller {
    pub id: i64,
    pub username: String,
}

/// Full listing as returned by the detail endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ListingDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub condition_display: Option<String>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    #[serde(default)]
    pub seller: Option<Seller>,
    #[serde(default)]
    pub is_owner: Option<bool>,
}

impl ListingDetail {
    pub fn display_price(&self) -> String {
        format_price(&self.price)
    }

    /// Images in gallery order.
    pub fn ordered_images(&self) -> Vec<&ListingImage> {
        let mut images: Vec<&ListingImage> = self.images.iter().collect();
        images.sort_by_key(|i| i.order);
        images
    }

    pub fn condition_label(&self) -> &str {
        self.condition_display
            .as_deref()
            .unwrap_or_else(|| self.condition.display_name())
    }
}

/// Page-number pagination envelope used by the home page feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PurchaseReceipt {
    pub message: String,
    pub listing_id: serde_json::Value,
}

/// Fields for a new listing. Images are sent alongside as uploads.
#[derive(Debug, Clone, Default)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: String,
    pub category: Category,
    pub condition: Condition,
    pub status: ListingStatus,
}

/// Partial update of an existing listing. `None` fields are left as is.
#[derive(Debug, Clone, Default)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub status: Option<ListingStatus>,
    pub new_images: Vec<ImageUpload>,
    /// Ids of existing images to remove
    pub deleted_images: Vec<i64>,
    /// Existing image ids in their new gallery order
    pub image_order: Vec<i64>,
}

/// An image file to upload with a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Guess the MIME type from the file extension; the server re-encodes
    /// every upload as JPEG regardless.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        let mime = match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        }
    }
}

/// Format a decimal price string for display: "1200.5" -> "$1,200.50"
pub fn format_price(price: &str) -> String {
    let (whole, frac) = price.split_once('.').unwrap_or((price, ""));
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return price.to_string();
    }

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let cents: String = frac.chars().chain("00".chars()).take(2).collect();
    format!("${}.{}", grouped, cents)
}
