use tracing::info;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::models::RatingRow;
use crate::store::AuctionStore;

impl<S: AuctionStore> Engine<S> {
  /// Record a 1-5 rating. Each user rates a listing at most once; the
  /// uniqueness check rides on the store's atomic insert, so concurrent
  /// duplicates cannot both land.
  #[instrument(skip(self))]
  pub async fn rate_listing(&self, listing_id: i64, rater_id: i64, value: i32) -> Result<RatingRow, DomainError> {
    if !(1 ..= 5).contains(&value) {
      return Err(DomainError::InvalidRating);
    }
    let listing = self.require_listing(listing_id).await?;
    if listing.owner_id == rater_id {
      return Err(DomainError::SelfRating);
    }

    let rating = self
      .store
      .insert_rating_if_absent(listing_id, rater_id, value)
      .await?
      .ok_or(DomainError::DuplicateRating)?;
    info!(listing_id, rater_id, value, "recorded rating");
    Ok(rating)
  }

  /// Arithmetic mean of all ratings; 0.0 when nothing has been rated yet,
  /// so callers never special-case the empty set.
  pub async fn average_rating(&self, listing_id: i64) -> Result<f64, DomainError> {
    let ratings = self.store.list_ratings(listing_id).await?;
    if ratings.is_empty() {
      return Ok(0.0);
    }
    let sum: i64 = ratings.iter().map(|rating| i64::from(rating.value)).sum();
    Ok(sum as f64 / ratings.len() as f64)
  }
}

#[cfg(test)]
mod tests {
  use crate::engine::testutil::engine_with_users;
  use crate::engine::testutil::seed_listing;
  use crate::error::DomainError;

  #[tokio::test]
  async fn average_of_no_ratings_is_zero() {
    let engine = engine_with_users(&[1]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    assert_eq!(engine.average_rating(listing.id).await.unwrap(), 0.0);
  }

  #[tokio::test]
  async fn average_is_the_arithmetic_mean() {
    let engine = engine_with_users(&[1, 2, 3]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    engine.rate_listing(listing.id, 2, 3).await.unwrap();
    engine.rate_listing(listing.id, 3, 5).await.unwrap();
    assert_eq!(engine.average_rating(listing.id).await.unwrap(), 4.0);
  }

  #[tokio::test]
  async fn out_of_range_values_are_rejected() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    for value in [0, 6, -1] {
      let err = engine.rate_listing(listing.id, 2, value).await.unwrap_err();
      assert!(matches!(err, DomainError::InvalidRating));
    }
  }

  #[tokio::test]
  async fn owners_cannot_rate_their_own_listing() {
    let engine = engine_with_users(&[1]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.rate_listing(listing.id, 1, 5).await.unwrap_err();
    assert!(matches!(err, DomainError::SelfRating));
  }

  #[tokio::test]
  async fn second_rating_is_a_conflict_regardless_of_value() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    engine.rate_listing(listing.id, 2, 4).await.unwrap();
    let err = engine.rate_listing(listing.id, 2, 5).await.unwrap_err();
    assert!(matches!(err, DomainError::DuplicateRating));
    assert_eq!(engine.average_rating(listing.id).await.unwrap(), 4.0);
  }
}
