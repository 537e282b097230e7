use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
  pub id: i64, // supplied by the identity boundary
  pub username: String,
  pub email: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl UserRow {
  /// Name shown next to listings, bids and comments. Falls back to the
  /// username when no real name is on record.
  pub fn display_name(&self) -> String {
    let first = self.first_name.as_deref().filter(|name| !name.is_empty());
    let last = self.last_name.as_deref().filter(|name| !name.is_empty());
    match (first, last) {
      (Some(first), Some(last)) => format!("{} {}", capitalize(first), capitalize(last)),
      (Some(first), None) => capitalize(first),
      (None, Some(last)) => capitalize(last),
      (None, None) => self.username.clone(),
    }
  }
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(head) => head.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
  pub id: i64,
  pub name: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListingRow {
  pub id: i64,
  pub owner_id: i64,
  pub category_id: i64,
  pub title: String,
  pub description: String,
  pub image_url: String,
  pub starting_bid: i64,
  pub active: bool,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BidRow {
  pub id: i64,
  pub listing_id: i64,
  pub bidder_id: i64,
  pub amount: i64,
  pub winner: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentRow {
  pub id: i64,
  pub listing_id: i64,
  pub author_id: i64,
  pub body: String,
  pub parent_id: Option<i64>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingRow {
  pub id: i64,
  pub listing_id: i64,
  pub rater_id: i64,
  pub value: i32,
  pub created_at: DateTime<Utc>,
}

/// Mutable listing fields as they arrive from the outside. Everything is
/// optional here; the engine decides which fields are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingDraft {
  pub title: Option<String>,
  pub description: Option<String>,
  pub image_url: Option<String>,
  pub category_id: Option<i64>,
  pub starting_bid: Option<i64>,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
}
