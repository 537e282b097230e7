//! In-memory store.
//!
//! Backs the test suite and any embedding that does not want Postgres.
//! Single-process only: atomicity of the `*_if_absent` operations comes from
//! the store-wide lock.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::BidRow;
use crate::models::CategoryRow;
use crate::models::CommentRow;
use crate::models::ListingRow;
use crate::models::RatingRow;
use crate::models::UserRow;
use crate::store::AuctionStore;
use crate::store::NewListing;
use crate::store::StoreError;

#[derive(Default)]
pub struct MemStore {
  inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
  last_id: i64,
  users: HashMap<i64, UserRow>,
  categories: HashMap<i64, CategoryRow>,
  listings: HashMap<i64, ListingRow>,
  bids: Vec<BidRow>,
  comments: Vec<CommentRow>,
  ratings: Vec<RatingRow>,
  watches: HashSet<(i64, i64)>, // (user_id, listing_id)
}

impl Inner {
  fn next_id(&mut self) -> i64 {
    self.last_id += 1;
    self.last_id
  }
}

impl MemStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> RwLockReadGuard<'_, Inner> {
    self.inner.read().expect("store lock poisoned")
  }

  fn write(&self) -> RwLockWriteGuard<'_, Inner> {
    self.inner.write().expect("store lock poisoned")
  }
}

fn newest_first<T, F>(mut rows: Vec<T>, id_of: F) -> Vec<T>
where
  F: Fn(&T) -> i64,
{
  // ids are monotonic, so sorting by id descending is creation-descending
  // with a deterministic tie-break for rows created in the same instant.
  rows.sort_by_key(|row| std::cmp::Reverse(id_of(row)));
  rows
}

#[async_trait]
impl AuctionStore for MemStore {
  async fn upsert_user(&self, user: &UserRow) -> Result<(), StoreError> {
    self.write().users.insert(user.id, user.clone());
    Ok(())
  }

  async fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
    Ok(self.read().users.get(&id).cloned())
  }

  async fn create_category(&self, name: &str) -> Result<CategoryRow, StoreError> {
    let mut inner = self.write();
    let row = CategoryRow {
      id: inner.next_id(),
      name: name.to_string(),
      created_at: Utc::now(),
    };
    inner.categories.insert(row.id, row.clone());
    Ok(row)
  }

  async fn get_category(&self, id: i64) -> Result<Option<CategoryRow>, StoreError> {
    Ok(self.read().categories.get(&id).cloned())
  }

  async fn find_category_by_name(&self, name: &str) -> Result<Option<CategoryRow>, StoreError> {
    Ok(
      self
        .read()
        .categories
        .values()
        .find(|category| category.name.eq_ignore_ascii_case(name))
        .cloned(),
    )
  }

  async fn list_categories(&self) -> Result<Vec<CategoryRow>, StoreError> {
    let mut rows: Vec<CategoryRow> = self.read().categories.values().cloned().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
  }

  async fn insert_listing(&self, new: &NewListing) -> Result<ListingRow, StoreError> {
    let mut inner = self.write();
    let now = Utc::now();
    let row = ListingRow {
      id: inner.next_id(),
      owner_id: new.owner_id,
      category_id: new.category_id,
      title: new.title.clone(),
      description: new.description.clone(),
      image_url: new.image_url.clone(),
      starting_bid: new.starting_bid,
      active: true,
      latitude: new.latitude,
      longitude: new.longitude,
      created_at: now,
      updated_at: now,
    };
    inner.listings.insert(row.id, row.clone());
    Ok(row)
  }

  async fn get_listing(&self, id: i64) -> Result<Option<ListingRow>, StoreError> {
    Ok(self.read().listings.get(&id).cloned())
  }

  async fn update_listing(&self, listing: &ListingRow) -> Result<(), StoreError> {
    let mut stored = listing.clone();
    stored.updated_at = Utc::now();
    self.write().listings.insert(stored.id, stored);
    Ok(())
  }

  async fn close_listing(&self, id: i64) -> Result<(), StoreError> {
    let mut inner = self.write();
    if let Some(listing) = inner.listings.get_mut(&id) {
      listing.active = false;
      listing.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn list_listings(&self) -> Result<Vec<ListingRow>, StoreError> {
    let rows: Vec<ListingRow> = self.read().listings.values().cloned().collect();
    Ok(newest_first(rows, |listing| listing.id))
  }

  async fn listing_ids_watched_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
    Ok(
      self
        .read()
        .watches
        .iter()
        .filter(|(watcher, _)| *watcher == user_id)
        .map(|(_, listing_id)| *listing_id)
        .collect(),
    )
  }

  async fn listing_ids_won_by(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
    let inner = self.read();
    let mut ids: Vec<i64> = inner
      .bids
      .iter()
      .filter(|bid| bid.bidder_id == user_id && bid.winner)
      .map(|bid| bid.listing_id)
      .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
  }

  async fn insert_bid(&self, listing_id: i64, bidder_id: i64, amount: i64) -> Result<BidRow, StoreError> {
    let mut inner = self.write();
    let row = BidRow {
      id: inner.next_id(),
      listing_id,
      bidder_id,
      amount,
      winner: false,
      created_at: Utc::now(),
    };
    inner.bids.push(row.clone());
    Ok(row)
  }

  async fn highest_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError> {
    let inner = self.read();
    let mut best: Option<&BidRow> = None;
    for bid in inner.bids.iter().filter(|bid| bid.listing_id == listing_id) {
      // earliest bid wins a tie, matching the ORDER BY in the Postgres store
      if best.map(|current| bid.amount > current.amount).unwrap_or(true) {
        best = Some(bid);
      }
    }
    Ok(best.cloned())
  }

  async fn bid_count(&self, listing_id: i64) -> Result<i64, StoreError> {
    Ok(self.read().bids.iter().filter(|bid| bid.listing_id == listing_id).count() as i64)
  }

  async fn mark_bid_winner(&self, bid_id: i64) -> Result<(), StoreError> {
    let mut inner = self.write();
    if let Some(bid) = inner.bids.iter_mut().find(|bid| bid.id == bid_id) {
      bid.winner = true;
    }
    Ok(())
  }

  async fn winning_bid(&self, listing_id: i64) -> Result<Option<BidRow>, StoreError> {
    Ok(
      self
        .read()
        .bids
        .iter()
        .find(|bid| bid.listing_id == listing_id && bid.winner)
        .cloned(),
    )
  }

  async fn insert_comment(
    &self,
    listing_id: i64,
    author_id: i64,
    body: &str,
    parent_id: Option<i64>,
  ) -> Result<CommentRow, StoreError> {
    let mut inner = self.write();
    let row = CommentRow {
      id: inner.next_id(),
      listing_id,
      author_id,
      body: body.to_string(),
      parent_id,
      created_at: Utc::now(),
    };
    inner.comments.push(row.clone());
    Ok(row)
  }

  async fn get_comment(&self, id: i64) -> Result<Option<CommentRow>, StoreError> {
    Ok(self.read().comments.iter().find(|comment| comment.id == id).cloned())
  }

  async fn list_comments(&self, listing_id: i64) -> Result<Vec<CommentRow>, StoreError> {
    let rows: Vec<CommentRow> = self
      .read()
      .comments
      .iter()
      .filter(|comment| comment.listing_id == listing_id)
      .cloned()
      .collect();
    Ok(newest_first(rows, |comment| comment.id))
  }

  async fn insert_rating_if_absent(
    &self,
    listing_id: i64,
    rater_id: i64,
    value: i32,
  ) -> Result<Option<RatingRow>, StoreError> {
    let mut inner = self.write();
    let exists = inner
      .ratings
      .iter()
      .any(|rating| rating.listing_id == listing_id && rating.rater_id == rater_id);
    if exists {
      return Ok(None);
    }
    let row = RatingRow {
      id: inner.next_id(),
      listing_id,
      rater_id,
      value,
      created_at: Utc::now(),
    };
    inner.ratings.push(row.clone());
    Ok(Some(row))
  }

  async fn list_ratings(&self, listing_id: i64) -> Result<Vec<RatingRow>, StoreError> {
    Ok(
      self
        .read()
        .ratings
        .iter()
        .filter(|rating| rating.listing_id == listing_id)
        .cloned()
        .collect(),
    )
  }

  async fn user_rating(&self, listing_id: i64, user_id: i64) -> Result<Option<i32>, StoreError> {
    Ok(
      self
        .read()
        .ratings
        .iter()
        .find(|rating| rating.listing_id == listing_id && rating.rater_id == user_id)
        .map(|rating| rating.value),
    )
  }

  async fn insert_watch_if_absent(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    Ok(self.write().watches.insert((user_id, listing_id)))
  }

  async fn remove_watch(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    Ok(self.write().watches.remove(&(user_id, listing_id)))
  }

  async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool, StoreError> {
    Ok(self.read().watches.contains(&(user_id, listing_id)))
  }
}

#[cfg(test)]
mod tests {
  use super::MemStore;
  use crate::store::AuctionStore;
  use crate::store::NewListing;

  fn listing(owner_id: i64, category_id: i64, title: &str) -> NewListing {
    NewListing {
      owner_id,
      category_id,
      title: title.to_string(),
      description: "desc".to_string(),
      image_url: "https://example.com/a.png".to_string(),
      starting_bid: 100,
      latitude: None,
      longitude: None,
    }
  }

  #[tokio::test]
  async fn highest_bid_picks_the_maximum() {
    let store = MemStore::new();
    let row = store.insert_listing(&listing(1, 1, "lamp")).await.unwrap();
    store.insert_bid(row.id, 2, 150).await.unwrap();
    store.insert_bid(row.id, 3, 220).await.unwrap();
    let best = store.highest_bid(row.id).await.unwrap().unwrap();
    assert_eq!(best.amount, 220);
    assert_eq!(best.bidder_id, 3);
  }

  #[tokio::test]
  async fn listings_come_back_newest_first() {
    let store = MemStore::new();
    let first = store.insert_listing(&listing(1, 1, "first")).await.unwrap();
    let second = store.insert_listing(&listing(1, 1, "second")).await.unwrap();
    let all = store.list_listings().await.unwrap();
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);
  }

  #[tokio::test]
  async fn watch_insert_is_first_writer_wins() {
    let store = MemStore::new();
    assert!(store.insert_watch_if_absent(1, 9).await.unwrap());
    assert!(!store.insert_watch_if_absent(1, 9).await.unwrap());
    assert!(store.remove_watch(1, 9).await.unwrap());
    assert!(!store.remove_watch(1, 9).await.unwrap());
  }

  #[tokio::test]
  async fn second_rating_insert_is_rejected() {
    let store = MemStore::new();
    assert!(store.insert_rating_if_absent(7, 2, 4).await.unwrap().is_some());
    assert!(store.insert_rating_if_absent(7, 2, 5).await.unwrap().is_none());
    assert_eq!(store.user_rating(7, 2).await.unwrap(), Some(4));
  }
}
