//! Listing pipeline: search, filter, threshold, sort, then paginate
//!
//! Every stage before pagination runs on the full snapshot, so `total_matching`
//! and page boundaries are stable across requests for the same query.

mod cursor;
mod filter;

pub use cursor::{
    CursorPosition, Page, PageOrder, SortKey, clamp_page_size, decode_cursor, encode_cursor,
    looks_custom_sorted, paginate, sort_by_default_key,
};
pub use filter::{
    ChannelQuery, ChannelSort, EmojiFilter, EmojiQuery, UserFilter, UserQuery, UserSort,
    select_channels, select_emoji, select_users,
};

use crate::config::PagingConfig;
use crate::directory::{ChannelRecord, DirectoryCache, EmojiRecord, UserRecord};
use crate::error::Result;
use std::sync::Arc;

/// One page of a listing, handed to the protocol layer for formatting
#[derive(Debug, Clone)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    /// Matches across all pages
    pub total_matching: usize,
}

impl<T> From<Page<T>> for ListPage<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
            total_matching: page.total,
        }
    }
}

/// Read-side entry point over a warmed `DirectoryCache`
#[derive(Clone)]
pub struct DirectoryQuery {
    cache: Arc<DirectoryCache>,
    paging: PagingConfig,
}

impl DirectoryQuery {
    pub fn new(cache: Arc<DirectoryCache>, paging: PagingConfig) -> Self {
        Self { cache, paging }
    }

    pub async fn list_channels(&self, query: &ChannelQuery) -> Result<ListPage<ChannelRecord>> {
        let dir = self.cache.channels().await?;
        let (selected, order) = select_channels(&dir, query);
        let page_size = clamp_page_size(query.limit, &self.paging);

        tracing::debug!(
            matching = selected.len(),
            page_size,
            sort = ?query.sort,
            "Listing channels"
        );
        Ok(paginate(selected, &query.cursor, page_size, order).into())
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<ListPage<UserRecord>> {
        let dir = self.cache.users().await?;
        let (selected, order) = select_users(&dir, query);
        let page_size = clamp_page_size(query.limit, &self.paging);

        tracing::debug!(
            matching = selected.len(),
            page_size,
            filter = ?query.filter,
            "Listing users"
        );
        Ok(paginate(selected, &query.cursor, page_size, order).into())
    }

    pub async fn list_emoji(&self, query: &EmojiQuery) -> Result<ListPage<EmojiRecord>> {
        let dir = self.cache.emoji().await?;
        let (selected, order) = select_emoji(&dir, query);
        let page_size = clamp_page_size(query.limit, &self.paging);

        tracing::debug!(
            matching = selected.len(),
            page_size,
            filter = ?query.filter,
            "Listing emoji"
        );
        Ok(paginate(selected, &query.cursor, page_size, order).into())
    }
}
