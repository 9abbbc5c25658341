//! Offset pagination for every list endpoint
//!
//! A single [`Paginator`] is configured once (default and maximum page size)
//! and shared by all list handlers. Handlers hand it a [`PageSource`] plus
//! the raw [`PageParams`] taken from the request; it validates the
//! parameters, asks the source for the total count, fetches at most one
//! range and returns a [`PageResult`].
//!
//! # Example
//!
//! ```rust
//! use hookah_catalog::pagination::{PageParam, PageParams, Paginator};
//!
//! # tokio_test_block(async {
//! let rows: Vec<u32> = (0..25).collect();
//! let params = PageParams::new(Some(PageParam::Integer(10)), Some(PageParam::Integer(20)));
//!
//! let page = Paginator::default().paginate(rows.as_slice(), &params).await.unwrap();
//! assert_eq!(page.results, vec![20, 21, 22, 23, 24]);
//! assert_eq!(page.count, 25);
//! assert_eq!(page.next_offset, None);
//! assert_eq!(page.previous_offset, Some(10));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaginationConfig;
use crate::error::Result;

/// Page size used when the request does not name one
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page size a client may request
pub const MAX_LIMIT: u64 = 100;

/// Rejected page parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// `limit` or `offset` is not a usable integer
    #[error("Invalid value for '{field}': {reason}")]
    InvalidParameter {
        /// Offending parameter name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// `limit` is larger than the configured maximum
    #[error("Requested limit {limit} exceeds the maximum of {max_limit}")]
    LimitExceeded {
        /// Requested page size
        limit: u64,
        /// Configured maximum page size
        max_limit: u64,
    },
}

impl PaginationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// A single `limit`/`offset` value as the client sent it.
///
/// Query strings deliver text, JSON bodies may deliver numbers, strings or
/// anything else; coercion to an integer happens in [`Paginator::request`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PageParam {
    /// A JSON integer
    Integer(i64),
    /// Text, parsed as a decimal integer
    Text(String),
    /// Any other JSON value; never valid
    Other(serde_json::Value),
}

impl PageParam {
    fn to_integer(&self, field: &'static str) -> std::result::Result<u64, PaginationError> {
        let value = match self {
            Self::Integer(n) => *n,
            Self::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                PaginationError::invalid(field, format!("'{text}' is not an integer"))
            })?,
            Self::Other(value) => {
                return Err(PaginationError::invalid(
                    field,
                    format!("{value} is not an integer"),
                ))
            }
        };
        u64::try_from(value)
            .map_err(|_| PaginationError::invalid(field, "must not be negative"))
    }
}

impl From<u64> for PageParam {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Text(value.to_string()), Self::Integer)
    }
}

/// Unvalidated `limit` and `offset` from a query string or JSON body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageParams {
    /// Requested page size
    #[serde(default)]
    pub limit: Option<PageParam>,
    /// Number of rows to skip
    #[serde(default)]
    pub offset: Option<PageParam>,
}

impl PageParams {
    #[must_use]
    pub fn new(limit: Option<PageParam>, offset: Option<PageParam>) -> Self {
        Self { limit, offset }
    }
}

/// Validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page size, at least 1
    pub limit: u64,
    /// Rows to skip
    pub offset: u64,
}

impl PageRequest {
    /// Offset of the following page, if any rows remain after this one
    #[must_use]
    pub fn next_offset(&self, count: u64) -> Option<u64> {
        self.offset
            .checked_add(self.limit)
            .filter(|next| *next < count)
    }

    /// Offset of the preceding page, if it would not be negative
    #[must_use]
    pub fn previous_offset(&self) -> Option<u64> {
        self.offset.checked_sub(self.limit)
    }
}

/// One page of a collection.
///
/// Serialized as the `data` of a list response:
/// `{"results": [...], "count": 25, "next_offset": 10, "previous_offset": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// Rows of this page, in collection order
    pub results: Vec<T>,
    /// Size of the whole collection
    pub count: u64,
    /// Offset of the next page
    pub next_offset: Option<u64>,
    /// Offset of the previous page
    pub previous_offset: Option<u64>,
}

impl<T> PageResult<T> {
    /// Convert each row while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            results: self.results.into_iter().map(f).collect(),
            count: self.count,
            next_offset: self.next_offset,
            previous_offset: self.previous_offset,
        }
    }
}

/// Storage seam the paginator reads from.
///
/// Implementors answer a count and a range query; the paginator issues one
/// count and at most one range per page.
pub trait PageSource: Send + Sync {
    /// Row type produced by [`fetch_range`](PageSource::fetch_range)
    type Item: Send;

    /// Total number of rows in the collection
    fn count(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Rows `offset..offset + limit`, fewer at the end of the collection
    fn fetch_range(
        &self,
        offset: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

impl<T> PageSource for [T]
where
    T: Clone + Send + Sync,
{
    type Item = T;

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }

    async fn fetch_range(&self, offset: u64, limit: u64) -> Result<Vec<T>> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self.iter().skip(skip).take(take).cloned().collect())
    }
}

/// Shared offset paginator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    default_limit: u64,
    max_limit: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, MAX_LIMIT)
    }
}

impl Paginator {
    /// Create a paginator with the given default and maximum page size
    #[must_use]
    pub const fn new(default_limit: u64, max_limit: u64) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    #[must_use]
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(config.default_limit, config.max_limit)
    }

    #[must_use]
    pub const fn default_limit(&self) -> u64 {
        self.default_limit
    }

    #[must_use]
    pub const fn max_limit(&self) -> u64 {
        self.max_limit
    }

    /// Validate raw parameters into a [`PageRequest`].
    ///
    /// Missing `limit` falls back to the default and missing `offset` to 0.
    /// Non-integers, negatives and `limit = 0` are rejected, as is any
    /// `limit` above the maximum. Nothing is clamped.
    pub fn request(&self, params: &PageParams) -> std::result::Result<PageRequest, PaginationError> {
        let limit = match &params.limit {
            Some(raw) => raw.to_integer("limit")?,
            None => self.default_limit,
        };
        let offset = match &params.offset {
            Some(raw) => raw.to_integer("offset")?,
            None => 0,
        };

        if limit == 0 {
            return Err(PaginationError::invalid("limit", "must be at least 1"));
        }
        if limit > self.max_limit {
            return Err(PaginationError::LimitExceeded {
                limit,
                max_limit: self.max_limit,
            });
        }

        Ok(PageRequest { limit, offset })
    }

    /// Produce one page of `source`
    pub async fn paginate<S>(&self, source: &S, params: &PageParams) -> Result<PageResult<S::Item>>
    where
        S: PageSource + ?Sized,
    {
        let request = self.request(params)?;
        self.fetch(source, request).await
    }

    /// Produce the page described by an already validated request
    pub async fn fetch<S>(&self, source: &S, request: PageRequest) -> Result<PageResult<S::Item>>
    where
        S: PageSource + ?Sized,
    {
        let count = source.count().await?;
        let results = if request.offset >= count {
            Vec::new()
        } else {
            source.fetch_range(request.offset, request.limit).await?
        };

        Ok(PageResult {
            results,
            count,
            next_offset: request.next_offset(count),
            previous_offset: request.previous_offset(),
        })
    }
}
