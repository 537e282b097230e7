use tracing::info;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::models::BidRow;
use crate::models::ListingRow;
use crate::store::AuctionStore;

impl<S: AuctionStore> Engine<S> {
  /// Validate and record a bid. The whole read-validate-insert sequence
  /// holds the listing lock, so two bidders can never both pass validation
  /// against the same stale maximum.
  #[instrument(skip(self))]
  pub async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: i64) -> Result<BidRow, DomainError> {
    let lock = self.listing_lock(listing_id);
    let _guard = lock.lock().await;

    let listing = self.require_listing(listing_id).await?;
    if !listing.active {
      return Err(DomainError::ListingClosed);
    }
    if listing.owner_id == bidder_id {
      return Err(DomainError::SelfBid);
    }
    if amount <= 0 {
      return Err(DomainError::InvalidAmount);
    }

    let current = self.current_bid(&listing).await?;
    if amount <= current {
      return Err(DomainError::BidTooLow(current));
    }

    let bid = self.store.insert_bid(listing_id, bidder_id, amount).await?;
    info!(listing_id, bidder_id, amount, "bid accepted");
    Ok(bid)
  }

  /// Highest recorded amount, or the starting bid while no bids exist.
  pub async fn current_bid(&self, listing: &ListingRow) -> Result<i64, DomainError> {
    let highest = self.store.highest_bid(listing.id).await?;
    Ok(highest.map(|bid| bid.amount).unwrap_or(listing.starting_bid))
  }
}

#[cfg(test)]
mod tests {
  use crate::engine::testutil::engine_with_users;
  use crate::engine::testutil::seed_listing;
  use crate::error::DomainError;

  #[tokio::test]
  async fn current_bid_falls_back_to_starting_bid() {
    let engine = engine_with_users(&[1]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    assert_eq!(engine.current_bid(&listing).await.unwrap(), 100);
  }

  #[tokio::test]
  async fn accepted_bids_strictly_increase() {
    let engine = engine_with_users(&[1, 2, 3]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;

    engine.place_bid(listing.id, 2, 150).await.unwrap();
    let err = engine.place_bid(listing.id, 3, 150).await.unwrap_err();
    assert!(matches!(err, DomainError::BidTooLow(150)));

    engine.place_bid(listing.id, 3, 200).await.unwrap();
    assert_eq!(engine.current_bid(&listing).await.unwrap(), 200);
  }

  #[tokio::test]
  async fn first_bid_must_exceed_starting_bid() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.place_bid(listing.id, 2, 100).await.unwrap_err();
    assert!(matches!(err, DomainError::BidTooLow(100)));
  }

  #[tokio::test]
  async fn owner_cannot_bid() {
    let engine = engine_with_users(&[1]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.place_bid(listing.id, 1, 500).await.unwrap_err();
    assert!(matches!(err, DomainError::SelfBid));
  }

  #[tokio::test]
  async fn non_positive_amounts_are_rejected() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    assert!(matches!(
      engine.place_bid(listing.id, 2, 0).await.unwrap_err(),
      DomainError::InvalidAmount
    ));
    assert!(matches!(
      engine.place_bid(listing.id, 2, -5).await.unwrap_err(),
      DomainError::InvalidAmount
    ));
  }

  #[tokio::test]
  async fn closed_listings_reject_bids() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    engine.close_listing(listing.id, 1).await.unwrap();
    let err = engine.place_bid(listing.id, 2, 500).await.unwrap_err();
    assert!(matches!(err, DomainError::ListingClosed));
  }

  #[tokio::test]
  async fn missing_listing_is_not_found() {
    let engine = engine_with_users(&[1]).await;
    let err = engine.place_bid(404, 1, 50).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("listing")));
  }
}
