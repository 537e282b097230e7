use tracing::info;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::store::AuctionStore;

impl<S: AuctionStore> Engine<S> {
  /// Flip watch membership for (user, listing). Returns the new state:
  /// true when the call added the listing to the watchlist, false when it
  /// removed it. Two consecutive calls always restore the original state.
  #[instrument(skip(self))]
  pub async fn toggle_watch(&self, listing_id: i64, user_id: i64) -> Result<bool, DomainError> {
    let listing = self.require_listing(listing_id).await?;
    if listing.owner_id == user_id {
      return Err(DomainError::SelfWatch);
    }

    // the insert is atomic, so a concurrent duplicate falls through to remove
    let watching = if self.store.insert_watch_if_absent(user_id, listing_id).await? {
      true
    } else {
      self.store.remove_watch(user_id, listing_id).await?;
      false
    };
    info!(listing_id, user_id, watching, "toggled watchlist membership");
    Ok(watching)
  }

  pub async fn is_watching(&self, listing_id: i64, user_id: i64) -> Result<bool, DomainError> {
    Ok(self.store.is_watching(user_id, listing_id).await?)
  }
}

#[cfg(test)]
mod tests {
  use crate::engine::testutil::engine_with_users;
  use crate::engine::testutil::seed_listing;
  use crate::error::DomainError;

  #[tokio::test]
  async fn toggling_twice_restores_the_original_state() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;

    assert!(!engine.is_watching(listing.id, 2).await.unwrap());
    assert!(engine.toggle_watch(listing.id, 2).await.unwrap());
    assert!(engine.is_watching(listing.id, 2).await.unwrap());
    assert!(!engine.toggle_watch(listing.id, 2).await.unwrap());
    assert!(!engine.is_watching(listing.id, 2).await.unwrap());
  }

  #[tokio::test]
  async fn owners_cannot_watch_their_own_listing() {
    let engine = engine_with_users(&[1]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.toggle_watch(listing.id, 1).await.unwrap_err();
    assert!(matches!(err, DomainError::SelfWatch));
  }

  #[tokio::test]
  async fn watching_a_missing_listing_fails() {
    let engine = engine_with_users(&[1]).await;
    let err = engine.toggle_watch(404, 1).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("listing")));
  }
}
