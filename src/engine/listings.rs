use std::collections::HashSet;

use tracing::info;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::models::BidRow;
use crate::models::CategoryRow;
use crate::models::ListingDraft;
use crate::models::ListingRow;
use crate::store::AuctionStore;
use crate::store::NewListing;
use crate::util::Page;
use crate::util::looks_like_url;
use crate::util::paginate;

const MAX_TITLE_CHARS: usize = 64;

/// How a listing query narrows the collection. Unrecognised input means no
/// filter at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingFilter {
  Active,
  Closed,
  Winner,
  My,
  Watchlist,
  #[default]
  All,
}

impl ListingFilter {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "active" => Self::Active,
      "closed" => Self::Closed,
      "winner" => Self::Winner,
      "my" => Self::My,
      "watchlist" => Self::Watchlist,
      _ => Self::All,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ListingQuery {
  pub filter: ListingFilter,
  pub search: Option<String>,
  pub category_id: Option<i64>,
  pub page: usize,
  pub limit: usize,
}

impl Default for ListingQuery {
  fn default() -> Self {
    Self {
      filter: ListingFilter::All,
      search: None,
      category_id: None,
      page: 1,
      limit: 8,
    }
  }
}

struct ValidatedFields {
  title: String,
  description: String,
  image_url: String,
  category_id: i64,
  latitude: Option<f64>,
  longitude: Option<f64>,
}

fn validate_fields(draft: &ListingDraft) -> Result<ValidatedFields, DomainError> {
  let title = draft
    .title
    .as_deref()
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .ok_or(DomainError::MissingField("title"))?;
  if title.chars().count() > MAX_TITLE_CHARS {
    return Err(DomainError::InvalidField {
      field: "title",
      reason: "must be at most 64 characters",
    });
  }
  let description = draft
    .description
    .as_deref()
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .ok_or(DomainError::MissingField("description"))?;
  let image_url = draft
    .image_url
    .as_deref()
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .ok_or(DomainError::MissingField("image_url"))?;
  if !looks_like_url(image_url) {
    return Err(DomainError::InvalidField {
      field: "image_url",
      reason: "must be an http(s) URL",
    });
  }
  let category_id = draft.category_id.ok_or(DomainError::MissingField("category"))?;
  Ok(ValidatedFields {
    title: title.to_string(),
    description: description.to_string(),
    image_url: image_url.to_string(),
    category_id,
    latitude: draft.latitude,
    longitude: draft.longitude,
  })
}

impl<S: AuctionStore> Engine<S> {
  /// Find a category by name (case-insensitive) or create it. The bool is
  /// true when the category already existed.
  #[instrument(skip(self))]
  pub async fn ensure_category(&self, name: &str) -> Result<(CategoryRow, bool), DomainError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(DomainError::MissingField("category"));
    }
    if let Some(existing) = self.store.find_category_by_name(name).await? {
      return Ok((existing, true));
    }
    let created = self.store.create_category(name).await?;
    info!(category_id = created.id, name, "created category");
    Ok((created, false))
  }

  pub async fn list_categories(&self) -> Result<Vec<CategoryRow>, DomainError> {
    Ok(self.store.list_categories().await?)
  }

  #[instrument(skip(self, draft))]
  pub async fn create_listing(&self, owner_id: i64, draft: ListingDraft) -> Result<ListingRow, DomainError> {
    let fields = validate_fields(&draft)?;
    let starting_bid = draft.starting_bid.ok_or(DomainError::MissingField("starting_bid"))?;
    if starting_bid < 0 {
      return Err(DomainError::InvalidField {
        field: "starting_bid",
        reason: "must not be negative",
      });
    }
    if self.store.get_category(fields.category_id).await?.is_none() {
      return Err(DomainError::NotFound("category"));
    }

    let listing = self
      .store
      .insert_listing(&NewListing {
        owner_id,
        category_id: fields.category_id,
        title: fields.title,
        description: fields.description,
        image_url: fields.image_url,
        starting_bid,
        latitude: fields.latitude,
        longitude: fields.longitude,
      })
      .await?;
    info!(listing_id = listing.id, owner_id, "created listing");
    Ok(listing)
  }

  /// Overwrite the mutable fields wholesale. Coordinates may be cleared by
  /// sending none; the starting bid and owner never change after creation.
  #[instrument(skip(self, draft))]
  pub async fn update_listing(
    &self,
    listing_id: i64,
    actor_id: i64,
    draft: ListingDraft,
  ) -> Result<ListingRow, DomainError> {
    let mut listing = self.require_listing(listing_id).await?;
    if listing.owner_id != actor_id {
      return Err(DomainError::Unauthorized);
    }
    let fields = validate_fields(&draft)?;
    if self.store.get_category(fields.category_id).await?.is_none() {
      return Err(DomainError::NotFound("category"));
    }

    listing.title = fields.title;
    listing.description = fields.description;
    listing.image_url = fields.image_url;
    listing.category_id = fields.category_id;
    listing.latitude = fields.latitude;
    listing.longitude = fields.longitude;
    self.store.update_listing(&listing).await?;
    info!(listing_id, actor_id, "updated listing");
    self.require_listing(listing_id).await
  }

  /// Close the listing and flag its highest bid as the winner. Closing an
  /// already-closed listing changes nothing and succeeds.
  #[instrument(skip(self))]
  pub async fn close_listing(&self, listing_id: i64, actor_id: i64) -> Result<ListingRow, DomainError> {
    let lock = self.listing_lock(listing_id);
    let _guard = lock.lock().await;

    let listing = self.require_listing(listing_id).await?;
    if listing.owner_id != actor_id {
      return Err(DomainError::Unauthorized);
    }
    if !listing.active {
      info!(listing_id, "close requested but listing is already closed");
      return Ok(listing);
    }

    self.store.close_listing(listing_id).await?;
    match self.store.highest_bid(listing_id).await? {
      Some(best) => {
        self.store.mark_bid_winner(best.id).await?;
        info!(listing_id, winning_bid = best.id, amount = best.amount, "closed listing with winner");
      },
      None => info!(listing_id, "closed listing without bids"),
    }
    self.require_listing(listing_id).await
  }

  /// The winning bid of a closed listing, if any bid won.
  pub async fn winner(&self, listing_id: i64) -> Result<Option<BidRow>, DomainError> {
    self.require_listing(listing_id).await?;
    Ok(self.store.winning_bid(listing_id).await?)
  }

  /// Filtered, searched, paginated listing query, newest first.
  #[instrument(skip(self, query))]
  pub async fn search_listings(
    &self,
    query: &ListingQuery,
    viewer: Option<i64>,
  ) -> Result<Page<ListingRow>, DomainError> {
    if query.page == 0 {
      return Err(DomainError::InvalidField {
        field: "page",
        reason: "must be at least 1",
      });
    }
    if query.limit == 0 {
      return Err(DomainError::InvalidField {
        field: "limit",
        reason: "must be at least 1",
      });
    }

    let mut listings = self.store.list_listings().await?;
    if let Some(category_id) = query.category_id {
      listings.retain(|listing| listing.category_id == category_id);
    }

    listings = match (query.filter, viewer) {
      (ListingFilter::Active, _) => {
        listings.retain(|listing| listing.active);
        listings
      },
      (ListingFilter::Closed, _) => {
        listings.retain(|listing| !listing.active);
        listings
      },
      (ListingFilter::My, Some(user_id)) => {
        listings.retain(|listing| listing.owner_id == user_id);
        listings
      },
      (ListingFilter::Winner, Some(user_id)) => {
        let won: HashSet<i64> = self.store.listing_ids_won_by(user_id).await?.into_iter().collect();
        listings.retain(|listing| won.contains(&listing.id));
        listings
      },
      (ListingFilter::Watchlist, Some(user_id)) => {
        let watched: HashSet<i64> = self.store.listing_ids_watched_by(user_id).await?.into_iter().collect();
        listings.retain(|listing| watched.contains(&listing.id));
        listings
      },
      // viewer-scoped filters mean nothing for anonymous callers
      (ListingFilter::My | ListingFilter::Winner | ListingFilter::Watchlist, None) => Vec::new(),
      (ListingFilter::All, _) => listings,
    };

    if let Some(needle) = query.search.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
      let needle = needle.to_lowercase();
      listings.retain(|listing| listing.title.to_lowercase().contains(&needle));
    }

    Ok(paginate(listings, query.page, query.limit))
  }
}
