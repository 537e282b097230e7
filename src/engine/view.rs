use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::geo;
use crate::geo::RandomSource;
use crate::models::ListingRow;
use crate::store::AuctionStore;
use crate::util::time_ago;

/// Everything the outside world sees of one listing, computed fresh for one
/// viewer. Never cached on the listing itself.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub starting_bid: i64,
  pub image_url: String,
  pub category_id: i64,
  pub category_name: String,
  pub owner_id: i64,
  pub owner_name: String,
  pub average_rating: f64,
  pub current_bid: i64,
  pub my_rating: Option<i32>,
  pub is_watching: bool,
  pub is_owner: bool,
  pub bid_count: i64,
  pub winner_id: Option<i64>,
  pub winner_name: Option<String>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
  pub posted_time_ago: String,
  pub latitude: f64,
  pub longitude: f64,
}

/// Reduced projection for the map overview.
#[derive(Debug, Clone, Serialize)]
pub struct MapPin {
  pub id: i64,
  pub title: String,
  pub latitude: f64,
  pub longitude: f64,
  pub current_bid: i64,
}

impl<S: AuctionStore> Engine<S> {
  #[instrument(skip(self))]
  pub async fn listing_view(&self, listing_id: i64, viewer: Option<i64>) -> Result<ListingView, DomainError> {
    let listing = self.require_listing(listing_id).await?;
    let category = self
      .store
      .get_category(listing.category_id)
      .await?
      .ok_or(DomainError::NotFound("category"))?;
    let owner = self
      .store
      .get_user(listing.owner_id)
      .await?
      .ok_or(DomainError::NotFound("user"))?;

    let current_bid = self.current_bid(&listing).await?;
    let bid_count = self.store.bid_count(listing.id).await?;
    let average_rating = self.average_rating(listing.id).await?;

    let winning = self.store.winning_bid(listing.id).await?;
    let (winner_id, winner_name) = match winning {
      Some(bid) => {
        let bidder = self
          .store
          .get_user(bid.bidder_id)
          .await?
          .ok_or(DomainError::NotFound("user"))?;
        (Some(bid.bidder_id), Some(bidder.display_name()))
      },
      None => (None, None),
    };

    let is_owner = viewer == Some(listing.owner_id);
    let (is_watching, my_rating) = match viewer {
      Some(user_id) => (
        self.store.is_watching(user_id, listing.id).await?,
        self.store.user_rating(listing.id, user_id).await?,
      ),
      None => (false, None),
    };

    let exact_allowed = is_owner || (viewer.is_some() && viewer == winner_id);
    let (latitude, longitude) = project_coordinates(&listing, exact_allowed, self.rng());

    Ok(ListingView {
      id: listing.id,
      title: listing.title,
      description: listing.description,
      starting_bid: listing.starting_bid,
      image_url: listing.image_url,
      category_id: category.id,
      category_name: category.name,
      owner_id: owner.id,
      owner_name: owner.display_name(),
      average_rating,
      current_bid,
      my_rating,
      is_watching,
      is_owner,
      bid_count,
      winner_id,
      winner_name,
      active: listing.active,
      created_at: listing.created_at,
      posted_time_ago: time_ago(listing.created_at),
      latitude,
      longitude,
    })
  }

  /// Active listings that carry a position, as map pins under the same
  /// privacy rule as the full view.
  #[instrument(skip(self))]
  pub async fn map_pins(&self, viewer: Option<i64>) -> Result<Vec<MapPin>, DomainError> {
    let listings = self.store.list_listings().await?;
    let mut pins = Vec::new();
    for listing in listings.into_iter().filter(|listing| listing.active) {
      if listing.latitude.is_none() || listing.longitude.is_none() {
        continue;
      }
      let current_bid = self.current_bid(&listing).await?;
      let winner_id = self.store.winning_bid(listing.id).await?.map(|bid| bid.bidder_id);
      let exact_allowed = viewer == Some(listing.owner_id) || (viewer.is_some() && viewer == winner_id);
      let (latitude, longitude) = project_coordinates(&listing, exact_allowed, self.rng());
      pins.push(MapPin {
        id: listing.id,
        title: listing.title,
        latitude,
        longitude,
        current_bid,
      });
    }
    Ok(pins)
  }
}

/// Exact coordinates for the privileged, an independently shifted pair for
/// everyone else, zeros when the listing has no position on record.
fn project_coordinates(listing: &ListingRow, exact_allowed: bool, rng: &dyn RandomSource) -> (f64, f64) {
  let project = |stored: Option<f64>| match stored {
    None => 0.0,
    Some(value) if exact_allowed => value,
    Some(value) => geo::obfuscate(value, rng),
  };
  (project(listing.latitude), project(listing.longitude))
}
