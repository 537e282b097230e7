use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::DomainError;
use crate::models::CommentRow;
use crate::store::AuctionStore;
use crate::util::Page;
use crate::util::paginate;

const MAX_COMMENT_CHARS: usize = 256;

/// A comment with its reply tree materialized, newest-first at every level.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
  pub comment: CommentRow,
  pub replies: Vec<CommentNode>,
}

impl<S: AuctionStore> Engine<S> {
  #[instrument(skip(self, body))]
  pub async fn post_comment(
    &self,
    listing_id: i64,
    author_id: i64,
    body: &str,
    parent_id: Option<i64>,
  ) -> Result<CommentRow, DomainError> {
    self.require_listing(listing_id).await?;

    let body = body.trim();
    if body.is_empty() {
      return Err(DomainError::MissingField("comment"));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
      return Err(DomainError::InvalidField {
        field: "comment",
        reason: "must be at most 256 characters",
      });
    }
    if let Some(parent) = parent_id
      && self.store.get_comment(parent).await?.is_none()
    {
      return Err(DomainError::ParentNotFound);
    }

    let comment = self.store.insert_comment(listing_id, author_id, body, parent_id).await?;
    info!(listing_id, author_id, comment_id = comment.id, reply = parent_id.is_some(), "posted comment");
    Ok(comment)
  }

  /// Paginated top-level comments, each carrying its full reply tree. The
  /// tree is rebuilt from parent-id adjacency on every read; nothing
  /// denormalized is stored on the rows.
  #[instrument(skip(self))]
  pub async fn list_comments(&self, listing_id: i64, page: usize, limit: usize) -> Result<Page<CommentNode>, DomainError> {
    self.require_listing(listing_id).await?;
    if page == 0 {
      return Err(DomainError::InvalidField {
        field: "page",
        reason: "must be at least 1",
      });
    }
    if limit == 0 {
      return Err(DomainError::InvalidField {
        field: "limit",
        reason: "must be at least 1",
      });
    }

    // rows arrive newest-first, so every adjacency bucket stays newest-first
    let rows = self.store.list_comments(listing_id).await?;
    let mut top_level = Vec::new();
    let mut children: HashMap<i64, Vec<CommentRow>> = HashMap::new();
    for row in rows {
      match row.parent_id {
        Some(parent) => children.entry(parent).or_default().push(row),
        None => top_level.push(row),
      }
    }

    let page = paginate(top_level, page, limit);
    Ok(Page {
      count: page.count,
      num_pages: page.num_pages,
      results: page.results.into_iter().map(|row| build_tree(row, &children)).collect(),
    })
  }
}

fn build_tree(comment: CommentRow, children: &HashMap<i64, Vec<CommentRow>>) -> CommentNode {
  let replies = children
    .get(&comment.id)
    .map(|rows| rows.iter().cloned().map(|row| build_tree(row, children)).collect())
    .unwrap_or_default();
  CommentNode { comment, replies }
}

#[cfg(test)]
mod tests {
  use crate::engine::testutil::engine_with_users;
  use crate::engine::testutil::seed_listing;
  use crate::error::DomainError;

  #[tokio::test]
  async fn replies_nest_under_their_parent() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;

    let a = engine.post_comment(listing.id, 2, "does it work?", None).await.unwrap();
    let b = engine.post_comment(listing.id, 1, "yes, fully", Some(a.id)).await.unwrap();

    let page = engine.list_comments(listing.id, 1, 10).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].comment.id, a.id);
    assert_eq!(page.results[0].replies.len(), 1);
    assert_eq!(page.results[0].replies[0].comment.id, b.id);
  }

  #[tokio::test]
  async fn trees_materialize_to_any_depth_newest_first() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;

    let root = engine.post_comment(listing.id, 2, "root", None).await.unwrap();
    let reply = engine.post_comment(listing.id, 1, "reply", Some(root.id)).await.unwrap();
    let deep = engine.post_comment(listing.id, 2, "deeper", Some(reply.id)).await.unwrap();
    let late_reply = engine.post_comment(listing.id, 2, "late reply", Some(root.id)).await.unwrap();
    let other_root = engine.post_comment(listing.id, 1, "second thread", None).await.unwrap();

    let page = engine.list_comments(listing.id, 1, 10).await.unwrap();
    assert_eq!(page.count, 2);
    // newest top-level thread first
    assert_eq!(page.results[0].comment.id, other_root.id);
    let first = &page.results[1];
    assert_eq!(first.comment.id, root.id);
    // newest reply first within the thread
    assert_eq!(first.replies[0].comment.id, late_reply.id);
    assert_eq!(first.replies[1].comment.id, reply.id);
    assert_eq!(first.replies[1].replies[0].comment.id, deep.id);
  }

  #[tokio::test]
  async fn empty_comments_are_rejected() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.post_comment(listing.id, 2, "   ", None).await.unwrap_err();
    assert!(matches!(err, DomainError::MissingField("comment")));
  }

  #[tokio::test]
  async fn oversized_comments_are_rejected() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let long = "x".repeat(257);
    let err = engine.post_comment(listing.id, 2, &long, None).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidField { field: "comment", .. }));
  }

  #[tokio::test]
  async fn unknown_parent_is_rejected() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    let err = engine.post_comment(listing.id, 2, "hello", Some(404)).await.unwrap_err();
    assert!(matches!(err, DomainError::ParentNotFound));
  }

  #[tokio::test]
  async fn top_level_comments_paginate() {
    let engine = engine_with_users(&[1, 2]).await;
    let listing = seed_listing(&engine, 1, "lamp", 100).await;
    for index in 0 .. 12 {
      engine
        .post_comment(listing.id, 2, &format!("comment {index}"), None)
        .await
        .unwrap();
    }

    let page = engine.list_comments(listing.id, 2, 10).await.unwrap();
    assert_eq!(page.count, 12);
    assert_eq!(page.num_pages, 2);
    assert_eq!(page.results.len(), 2);
  }
}
