use std::env;

use anyhow::Context;
use anyhow::Result;

const DEFAULT_LISTING_PAGE_SIZE: usize = 8;
const DEFAULT_COMMENT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub openai_api_key: Option<String>,
  pub listing_page_size: usize,
  pub comment_page_size: usize,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty());
    let listing_page_size = parse_page_size(
      env::var("LISTING_PAGE_SIZE").unwrap_or_default().as_str(),
      DEFAULT_LISTING_PAGE_SIZE,
    );
    let comment_page_size = parse_page_size(
      env::var("COMMENT_PAGE_SIZE").unwrap_or_default().as_str(),
      DEFAULT_COMMENT_PAGE_SIZE,
    );
    Ok(Self {
      database_url,
      openai_api_key,
      listing_page_size,
      comment_page_size,
    })
  }
}

fn parse_page_size(raw: &str, fallback: usize) -> usize {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return fallback;
  }
  match trimmed.parse::<usize>() {
    Ok(value) if value > 0 => value,
    Ok(_) => {
      tracing::warn!(value = trimmed, "page size must be positive, using default");
      fallback
    },
    Err(err) => {
      tracing::warn!(value = trimmed, error = %err, "invalid page size, using default");
      fallback
    },
  }
}

#[cfg(test)]
mod tests {
  use super::parse_page_size;

  #[test]
  fn parses_valid_page_size() {
    assert_eq!(parse_page_size("25", 8), 25);
  }

  #[test]
  fn falls_back_on_blank_input() {
    assert_eq!(parse_page_size("", 8), 8);
    assert_eq!(parse_page_size("   ", 10), 10);
  }

  #[test]
  fn falls_back_on_invalid_input() {
    assert_eq!(parse_page_size("abc", 8), 8);
    assert_eq!(parse_page_size("0", 8), 8);
  }
}
