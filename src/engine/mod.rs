mod bids;
mod comments;
mod listings;
mod ratings;
#[cfg(test)]
pub(crate) mod testutil;
mod view;
mod watchlist;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;

use crate::error::DomainError;
use crate::geo::RandomSource;
use crate::geo::ThreadRngSource;
use crate::models::ListingRow;
use crate::models::UserRow;
use crate::store::AuctionStore;

pub use comments::CommentNode;
pub use listings::ListingFilter;
pub use listings::ListingQuery;
pub use view::ListingView;
pub use view::MapPin;

/// The auction rules core. All domain operations live on this type; the
/// store behind it only does CRUD, and every viewer-facing representation is
/// computed on demand, never cached on an entity.
pub struct Engine<S> {
  store: S,
  rng: Arc<dyn RandomSource>,
  locks: ListingLocks,
}

impl<S: AuctionStore> Engine<S> {
  pub fn new(store: S) -> Self {
    Self::with_random_source(store, Arc::new(ThreadRngSource))
  }

  /// Inject the randomness behind coordinate obfuscation, e.g. a seeded
  /// source in tests.
  pub fn with_random_source(store: S, rng: Arc<dyn RandomSource>) -> Self {
    Self {
      store,
      rng,
      locks: ListingLocks::default(),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub(crate) fn rng(&self) -> &dyn RandomSource {
    self.rng.as_ref()
  }

  /// Serialises bid placement and closing per listing, so read-validate-write
  /// never races another bidder on the same listing.
  pub(crate) fn listing_lock(&self, listing_id: i64) -> Arc<Mutex<()>> {
    self.locks.for_listing(listing_id)
  }

  pub(crate) async fn require_listing(&self, listing_id: i64) -> Result<ListingRow, DomainError> {
    self
      .store
      .get_listing(listing_id)
      .await?
      .ok_or(DomainError::NotFound("listing"))
  }

  /// Mirror the identity boundary's view of a user into the store.
  pub async fn sync_user(&self, user: &UserRow) -> Result<(), DomainError> {
    self.store.upsert_user(user).await?;
    Ok(())
  }
}

#[derive(Default)]
struct ListingLocks {
  inner: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ListingLocks {
  fn for_listing(&self, listing_id: i64) -> Arc<Mutex<()>> {
    let mut map = self.inner.lock().expect("listing lock map poisoned");
    map.entry(listing_id).or_default().clone()
  }
}
