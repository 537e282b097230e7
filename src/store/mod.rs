pub mod mem;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::BidRow;
use crate::models::CategoryRow;
use crate::models::CommentRow;
use crate::models::ListingRow;
use crate::models::RatingRow;
use crate::models::UserRow;

pub use mem::MemStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Sqlx(#[from] sqlx::Error),
}

/// Validated listing fields, ready to persist.
#[derive(Debug, Clone)]
pub struct NewListing {
  pub owner_id: i64,
  pub category_id: i64,
  pub title: String,
  pub description: String,
  pub image_url: String,
  pub starting_bid: i64,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
}

/// Persistence contract for the auction engine. Implementations must keep
/// the `*_if_absent` operations atomic so duplicate watches and ratings
/// cannot race in; everything else is plain CRUD plus the handful of
/// derived reads the engine leans on.
#[async_trait]
pub trait AuctionStore: Send + Sync {
  // users
  async fn upsert_user(&self, user: &UserRow) -> Result<(), StoreError>;
  async fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError>;

  // categories
  async fn create_category(&self, name: &str) -> Result<CategoryRow, StoreError>;
  async fn get_category(&self, id: i64) -> Result<Option<CategoryRow>, StoreError>;
  async fn find_category_by_name(&self, name: &str) -> Result<Option<CategoryRow>, StoreError>;
  async fn list_categories(&self) -> Result<Vec<CategoryRow>, StoreError>;

  // listings, newest first everywhere
  async fn insert_listing(&self, new: &NewListing) -> Result<ListingRow, StoreError>;
  async fn get_listing(&self, id: i64) -> Result<Option<ListingRow>, StoreError>;
  async fn update_listing(&self, listing: &ListingRow) -> Result<(), StoreError>;
  async fn close_listing(&self, id: i64) -> Result<(), StoreError>;
  async fn list_listings(&self) -> Result<Vec<ListingRow>, StoreError>;
  async fn listing_ids_watched_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;
  async fn listing_ids_won_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;

  // bids
  async fn insert_bid(&self, listing_id: i64, bidder_id: i64, amount: i64) -> Result<BidRow, StoreError>;
  async fn highest_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError>;
  async fn bid_count(&self, listing_id: i64) -> Result<i64, StoreError>;
  async fn mark_bid_winner(&self, bid_id: i64) -> Result<(), StoreError>;
  async fn winning_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError>;

  // comments, newest first
  async fn insert_comment(
    &self,
    listing_id: i64,
    author_id: i64,
    body: &str,
    parent_id: Option<i64>,
  ) -> Result<CommentRow, StoreError>;
  async fn get_comment(&self, id: i64) -> Result<Option<CommentRow>, StoreError>;
  async fn list_comments(&self, listing_id: i64) -> Result<Vec<CommentRow>, StoreError>;

  // ratings
  async fn insert_rating_if_absent(
    &self,
    listing_id: i64,
    rater_id: i64,
    value: i32,
  ) -> Result<Option<RatingRow>, StoreError>;
  async fn list_ratings(&self, listing_id: i64) -> Result<Vec<RatingRow>, StoreError>;
  async fn user_rating(&self, listing_id: i64, user_id: i64) -> Result<Option<i32>, StoreError>;

  // watchlist
  async fn insert_watch_if_absent(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError>;
  async fn remove_watch(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError>;
  async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError>;
}
