//! Data models for marketplace entities.
//!
//! - `ListingSummary`, `ListingDetail`: listings in grids and detail views
//! - `ListingStatus`, `Condition`, `Category`: listing enumerations
//! - `ListingDraft`, `ListingUpdate`, `ImageUpload`: write-side payloads
//! - `TokenPair`, `RegisteredUser`: account endpoints

pub mod account;
pub mod listing;

pub use account::{AccountCredentials, RegisteredUser, TokenPair};
pub use listing::{
    format_price, Category, Condition, ImageUpload, ListingDetail, ListingDraft, ListingImage,
    ListingStatus, ListingSummary, ListingUpdate, Page, PurchaseReceipt, Seller,
};
