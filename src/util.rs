use chrono::DateTime;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").expect("valid regex"));

pub fn looks_like_url(value: &str) -> bool {
  URL_PATTERN.is_match(value.trim())
}

/// One page of an ordered result set, with the totals the caller needs to
/// render pagination controls.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub count: usize,
  pub num_pages: usize,
  pub results: Vec<T>,
}

/// Slice `items` into 1-based pages of `limit` entries. A page past the end
/// yields an empty result set rather than an error; `num_pages` is never
/// zero, so an empty collection still reports one (empty) page.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Page<T> {
  let count = items.len();
  let num_pages = count.div_ceil(limit).max(1);
  let start = (page - 1).saturating_mul(limit);
  let results: Vec<T> = items.into_iter().skip(start).take(limit).collect();
  Page {
    count,
    num_pages,
    results,
  }
}

pub fn time_ago(time: DateTime<Utc>) -> String {
  time_ago_at(time, Utc::now())
}

fn time_ago_at(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let elapsed = now.signed_duration_since(time);
  let seconds = elapsed.num_seconds().max(0);
  let days = elapsed.num_days();
  if days > 0 {
    format!("{days} days ago")
  } else if seconds > 3600 {
    format!("{} hours ago", seconds / 3600)
  } else if seconds > 60 {
    format!("{} minutes ago", seconds / 60)
  } else {
    format!("{seconds} seconds ago")
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use chrono::Utc;

  use super::looks_like_url;
  use super::paginate;
  use super::time_ago_at;

  #[test]
  fn accepts_http_urls() {
    assert!(looks_like_url("https://example.com/a.png"));
    assert!(looks_like_url("http://cdn.example.com/img?id=3"));
  }

  #[test]
  fn rejects_non_urls() {
    assert!(!looks_like_url("example.com/a.png"));
    assert!(!looks_like_url("https:// spaced.example.com"));
    assert!(!looks_like_url(""));
  }

  #[test]
  fn paginates_with_totals() {
    let page = paginate((1 .. 11).collect::<Vec<i32>>(), 2, 4);
    assert_eq!(page.count, 10);
    assert_eq!(page.num_pages, 3);
    assert_eq!(page.results, vec![5, 6, 7, 8]);
  }

  #[test]
  fn page_past_the_end_is_empty() {
    let page = paginate(vec![1, 2, 3], 5, 2);
    assert_eq!(page.count, 3);
    assert_eq!(page.num_pages, 2);
    assert!(page.results.is_empty());
  }

  #[test]
  fn empty_set_still_has_one_page() {
    let page = paginate(Vec::<i32>::new(), 1, 8);
    assert_eq!(page.count, 0);
    assert_eq!(page.num_pages, 1);
    assert!(page.results.is_empty());
  }

  #[test]
  fn formats_elapsed_time() {
    let now = Utc::now();
    assert_eq!(time_ago_at(now - Duration::seconds(30), now), "30 seconds ago");
    assert_eq!(time_ago_at(now - Duration::minutes(5), now), "5 minutes ago");
    assert_eq!(time_ago_at(now - Duration::hours(3), now), "3 hours ago");
    assert_eq!(time_ago_at(now - Duration::days(2), now), "2 days ago");
  }
}
