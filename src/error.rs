use thiserror::Error;

use crate::store::StoreError;

/// Broad classes the presentation layer maps onto response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  Authorization,
  Conflict,
  NotFound,
  External,
  Storage,
}

#[derive(Debug, Error)]
pub enum DomainError {
  #[error("listing is closed")]
  ListingClosed,
  #[error("owners may not bid on their own listing")]
  SelfBid,
  #[error("bid must be a positive amount")]
  InvalidAmount,
  #[error("bid must exceed {0}")]
  BidTooLow(i64),
  #[error("{0} is required")]
  MissingField(&'static str),
  #[error("{field} {reason}")]
  InvalidField {
    field: &'static str,
    reason: &'static str,
  },
  #[error("rating must be between 1 and 5")]
  InvalidRating,
  #[error("owners may not rate their own listing")]
  SelfRating,
  #[error("listing was already rated by this user")]
  DuplicateRating,
  #[error("owners may not watch their own listing")]
  SelfWatch,
  #[error("parent comment not found")]
  ParentNotFound,
  #[error("{0} not found")]
  NotFound(&'static str),
  #[error("not authorized to modify this listing")]
  Unauthorized,
  #[error("description service failed: {0}")]
  External(String),
  #[error(transparent)]
  Storage(#[from] StoreError),
}

impl DomainError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidAmount | Self::MissingField(_) | Self::InvalidField { .. } | Self::InvalidRating => {
        ErrorKind::Validation
      },
      Self::Unauthorized | Self::SelfBid | Self::SelfWatch | Self::SelfRating => ErrorKind::Authorization,
      Self::ListingClosed | Self::BidTooLow(_) | Self::DuplicateRating => ErrorKind::Conflict,
      Self::NotFound(_) | Self::ParentNotFound => ErrorKind::NotFound,
      Self::External(_) => ErrorKind::External,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }
}
