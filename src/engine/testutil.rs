use std::sync::Arc;

use chrono::Utc;

use crate::engine::Engine;
use crate::geo::SeededSource;
use crate::models::ListingDraft;
use crate::models::ListingRow;
use crate::models::UserRow;
use crate::store::MemStore;

pub(crate) async fn engine_with_users(user_ids: &[i64]) -> Engine<MemStore> {
  let engine = Engine::with_random_source(MemStore::new(), Arc::new(SeededSource::new(0xA0C7)));
  for id in user_ids {
    engine
      .sync_user(&UserRow {
        id: *id,
        username: format!("user{id}"),
        email: None,
        first_name: None,
        last_name: None,
        created_at: Utc::now(),
      })
      .await
      .unwrap();
  }
  engine
}

pub(crate) fn draft(title: &str, category_id: i64, starting_bid: i64) -> ListingDraft {
  ListingDraft {
    title: Some(title.to_string()),
    description: Some(format!("{title} in fine condition")),
    image_url: Some("https://example.com/item.png".to_string()),
    category_id: Some(category_id),
    starting_bid: Some(starting_bid),
    latitude: None,
    longitude: None,
  }
}

pub(crate) async fn seed_listing(engine: &Engine<MemStore>, owner_id: i64, title: &str, starting_bid: i64) -> ListingRow {
  let (category, _) = engine.ensure_category("general").await.unwrap();
  engine
    .create_listing(owner_id, draft(title, category.id, starting_bid))
    .await
    .unwrap()
}

pub(crate) async fn seed_listing_at(
  engine: &Engine<MemStore>,
  owner_id: i64,
  title: &str,
  latitude: f64,
  longitude: f64,
) -> ListingRow {
  let (category, _) = engine.ensure_category("general").await.unwrap();
  let mut fields = draft(title, category.id, 100);
  fields.latitude = Some(latitude);
  fields.longitude = Some(longitude);
  engine.create_listing(owner_id, fields).await.unwrap()
}
