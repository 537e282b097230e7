//! Postgres store.
//!
//! Queries are runtime-checked so the crate builds without a live database;
//! the schema lives in `migrations/` and is applied on connect.

use async_trait::async_trait;
use sqlx::Pool;
use sqlx::Postgres;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use crate::models::BidRow;
use crate::models::CategoryRow;
use crate::models::CommentRow;
use crate::models::ListingRow;
use crate::models::RatingRow;
use crate::models::UserRow;
use crate::store::AuctionStore;
use crate::store::NewListing;
use crate::store::StoreError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const LISTING_COLUMNS: &str = "id, owner_id, category_id, title, description, image_url, starting_bid, active, \
                               latitude, longitude, created_at, updated_at";
const BID_COLUMNS: &str = "id, listing_id, bidder_id, amount, winner, created_at";
const COMMENT_COLUMNS: &str = "id, listing_id, author_id, body, parent_id, created_at";
const RATING_COLUMNS: &str = "id, listing_id, rater_id, value, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: Pool<Postgres>,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    MIGRATOR.run(&pool).await.map_err(sqlx::Error::from)?;
    Ok(Self { pool })
  }

  pub fn pool(&self) -> &Pool<Postgres> {
    &self.pool
  }
}

#[async_trait]
impl AuctionStore for PgStore {
  #[instrument(skip(self, user))]
  async fn upsert_user(&self, user: &UserRow) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO users (id, username, email, first_name, last_name)
      VALUES ($1, $2, $3, $4, $5)
      ON CONFLICT (id) DO UPDATE SET
        username = EXCLUDED.username,
        email = EXCLUDED.email,
        first_name = EXCLUDED.first_name,
        last_name = EXCLUDED.last_name
      "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>(
      "SELECT id, username, email, first_name, last_name, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn create_category(&self, name: &str) -> Result<CategoryRow, StoreError> {
    let row = sqlx::query_as::<_, CategoryRow>(
      "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn get_category(&self, id: i64) -> Result<Option<CategoryRow>, StoreError> {
    let row = sqlx::query_as::<_, CategoryRow>("SELECT id, name, created_at FROM categories WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn find_category_by_name(&self, name: &str) -> Result<Option<CategoryRow>, StoreError> {
    let row = sqlx::query_as::<_, CategoryRow>(
      "SELECT id, name, created_at FROM categories WHERE LOWER(name) = LOWER($1) LIMIT 1",
    )
    .bind(name)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn list_categories(&self) -> Result<Vec<CategoryRow>, StoreError> {
    let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, name, created_at FROM categories ORDER BY name")
      .fetch_all(&self.pool)
      .await?;
    Ok(rows)
  }

  #[instrument(skip(self, new))]
  async fn insert_listing(&self, new: &NewListing) -> Result<ListingRow, StoreError> {
    let row = sqlx::query_as::<_, ListingRow>(&format!(
      r#"
      INSERT INTO listings (owner_id, category_id, title, description, image_url, starting_bid, latitude, longitude)
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
      RETURNING {LISTING_COLUMNS}
      "#,
    ))
    .bind(new.owner_id)
    .bind(new.category_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.image_url)
    .bind(new.starting_bid)
    .bind(new.latitude)
    .bind(new.longitude)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn get_listing(&self, id: i64) -> Result<Option<ListingRow>, StoreError> {
    let row = sqlx::query_as::<_, ListingRow>(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row)
  }

  #[instrument(skip(self, listing))]
  async fn update_listing(&self, listing: &ListingRow) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      UPDATE listings SET
        title = $1,
        description = $2,
        image_url = $3,
        category_id = $4,
        latitude = $5,
        longitude = $6,
        active = $7,
        updated_at = NOW()
      WHERE id = $8
      "#,
    )
    .bind(&listing.title)
    .bind(&listing.description)
    .bind(&listing.image_url)
    .bind(listing.category_id)
    .bind(listing.latitude)
    .bind(listing.longitude)
    .bind(listing.active)
    .bind(listing.id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn close_listing(&self, id: i64) -> Result<(), StoreError> {
    sqlx::query("UPDATE listings SET active = FALSE, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn list_listings(&self) -> Result<Vec<ListingRow>, StoreError> {
    let rows = sqlx::query_as::<_, ListingRow>(&format!(
      "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC, id DESC",
    ))
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  #[instrument(skip(self))]
  async fn listing_ids_watched_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT listing_id FROM watchlists WHERE user_id = $1")
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(ids)
  }

  #[instrument(skip(self))]
  async fn listing_ids_won_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
    let ids = sqlx::query_scalar::<_, i64>(
      "SELECT DISTINCT listing_id FROM bids WHERE bidder_id = $1 AND winner = TRUE",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(ids)
  }

  #[instrument(skip(self))]
  async fn insert_bid(&self, listing_id: i64, bidder_id: i64, amount: i64) -> Result<BidRow, StoreError> {
    let row = sqlx::query_as::<_, BidRow>(&format!(
      "INSERT INTO bids (listing_id, bidder_id, amount) VALUES ($1, $2, $3) RETURNING {BID_COLUMNS}",
    ))
    .bind(listing_id)
    .bind(bidder_id)
    .bind(amount)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn highest_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError> {
    let row = sqlx::query_as::<_, BidRow>(&format!(
      "SELECT {BID_COLUMNS} FROM bids WHERE listing_id = $1 ORDER BY amount DESC, created_at ASC LIMIT 1",
    ))
    .bind(listing_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn bid_count(&self, listing_id: i64) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bids WHERE listing_id = $1")
      .bind(listing_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(count)
  }

  #[instrument(skip(self))]
  async fn mark_bid_winner(&self, bid_id: i64) -> Result<(), StoreError> {
    sqlx::query("UPDATE bids SET winner = TRUE WHERE id = $1")
      .bind(bid_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn winning_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError> {
    let row = sqlx::query_as::<_, BidRow>(&format!(
      "SELECT {BID_COLUMNS} FROM bids WHERE listing_id = $1 AND winner = TRUE LIMIT 1",
    ))
    .bind(listing_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self, body))]
  async fn insert_comment(
    &self,
    listing_id: i64,
    author_id: i64,
    body: &str,
    parent_id: Option<i64>,
  ) -> Result<CommentRow, StoreError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
      r#"
      INSERT INTO comments (listing_id, author_id, body, parent_id)
      VALUES ($1, $2, $3, $4)
      RETURNING {COMMENT_COLUMNS}
      "#,
    ))
    .bind(listing_id)
    .bind(author_id)
    .bind(body)
    .bind(parent_id)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn get_comment(&self, id: i64) -> Result<Option<CommentRow>, StoreError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn list_comments(&self, listing_id: i64) -> Result<Vec<CommentRow>, StoreError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
      "SELECT {COMMENT_COLUMNS} FROM comments WHERE listing_id = $1 ORDER BY created_at DESC, id DESC",
    ))
    .bind(listing_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  #[instrument(skip(self))]
  async fn insert_rating_if_absent(
    &self,
    listing_id: i64,
    rater_id: i64,
    value: i32,
  ) -> Result<Option<RatingRow>, StoreError> {
    let row = sqlx::query_as::<_, RatingRow>(&format!(
      r#"
      INSERT INTO ratings (listing_id, rater_id, value)
      VALUES ($1, $2, $3)
      ON CONFLICT (listing_id, rater_id) DO NOTHING
      RETURNING {RATING_COLUMNS}
      "#,
    ))
    .bind(listing_id)
    .bind(rater_id)
    .bind(value)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(skip(self))]
  async fn list_ratings(&self, listing_id: i64) -> Result<Vec<RatingRow>, StoreError> {
    let rows = sqlx::query_as::<_, RatingRow>(&format!("SELECT {RATING_COLUMNS} FROM ratings WHERE listing_id = $1"))
      .bind(listing_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows)
  }

  #[instrument(skip(self))]
  async fn user_rating(&self, listing_id: i64, user_id: i64) -> Result<Option<i32>, StoreError> {
    let value = sqlx::query_scalar::<_, i32>("SELECT value FROM ratings WHERE listing_id = $1 AND rater_id = $2")
      .bind(listing_id)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  #[instrument(skip(self))]
  async fn insert_watch_if_absent(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO watchlists (user_id, listing_id)
      VALUES ($1, $2)
      ON CONFLICT (user_id, listing_id) DO NOTHING
      "#,
    )
    .bind(user_id)
    .bind(listing_id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(skip(self))]
  async fn remove_watch(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM watchlists WHERE user_id = $1 AND listing_id = $2")
      .bind(user_id)
      .bind(listing_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(skip(self))]
  async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    let exists = sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS(SELECT 1 FROM watchlists WHERE user_id = $1 AND listing_id = $2)",
    )
    .bind(user_id)
    .bind(listing_id)
    .fetch_one(&self.pool)
    .await?;
    Ok(exists)
  }
}
