//! Opaque-cursor pagination shared by every listing
//!
//! A cursor is base64 of either a decimal start index (the only form emitted) or,
//! for cursors issued by older releases, the last key seen on the previous page.
//! Undecodable cursors restart from the first page instead of failing the request.

use crate::config::PagingConfig;
use crate::directory::{ChannelRecord, EmojiRecord, UserRecord};
use crate::error::{DirectoryError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Default ordering key of a listed record
pub trait SortKey {
    fn sort_key(&self) -> &str;
}

impl SortKey for UserRecord {
    fn sort_key(&self) -> &str {
        &self.id
    }
}

impl SortKey for ChannelRecord {
    fn sort_key(&self) -> &str {
        &self.id
    }
}

impl SortKey for EmojiRecord {
    fn sort_key(&self) -> &str {
        &self.name
    }
}

/// Decoded resume position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorPosition {
    Index(usize),
    /// Legacy form: resume after the first item whose key is greater than this
    AfterKey(String),
}

/// How `paginate` orders its input before slicing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrder {
    /// Sort by `SortKey`
    Default,
    /// Caller already sorted; keep the order as given
    Preserve,
    /// Keep the order only if first and last items are out of default order.
    /// Misfires on small or coincidentally ordered inputs.
    Infer,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` on the last page
    pub next_cursor: Option<String>,
    /// Size of the whole input, not of this page
    pub total: usize,
}

pub fn encode_cursor(index: usize) -> String {
    STANDARD.encode(index.to_string())
}

pub fn decode_cursor(cursor: &str) -> Result<CursorPosition> {
    let bytes = STANDARD
        .decode(cursor.trim())
        .map_err(|e| DirectoryError::InvalidCursor(format!("not base64: {}", e)))?;
    let payload = String::from_utf8(bytes)
        .map_err(|_| DirectoryError::InvalidCursor("payload is not UTF-8".to_string()))?;

    if payload.is_empty() {
        return Err(DirectoryError::InvalidCursor("empty payload".to_string()));
    }

    match payload.parse::<i64>() {
        Ok(index) => usize::try_from(index)
            .map(CursorPosition::Index)
            .map_err(|_| DirectoryError::InvalidCursor(format!("negative index {}", index))),
        Err(_) => Ok(CursorPosition::AfterKey(payload)),
    }
}

/// Sort by the record's default key; every listing goes through this or an
/// explicit caller sort before it is sliced
pub fn sort_by_default_key<T: SortKey>(items: &mut [T]) {
    items.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
}

/// First/last check used by `PageOrder::Infer`
pub fn looks_custom_sorted<T: SortKey>(items: &[T]) -> bool {
    match (items.first(), items.last()) {
        (Some(first), Some(last)) if items.len() > 1 => first.sort_key() > last.sort_key(),
        _ => false,
    }
}

/// Slice one page out of `items`
///
/// `page_size` must be positive; callers clamp it with [`clamp_page_size`].
pub fn paginate<T: SortKey>(
    mut items: Vec<T>,
    cursor: &str,
    page_size: usize,
    order: PageOrder,
) -> Page<T> {
    let page_size = page_size.max(1);

    match order {
        PageOrder::Default => sort_by_default_key(&mut items),
        PageOrder::Preserve => {}
        PageOrder::Infer => {
            if !looks_custom_sorted(&items) {
                sort_by_default_key(&mut items);
            }
        }
    }

    let total = items.len();
    let start = if cursor.trim().is_empty() {
        0
    } else {
        match decode_cursor(cursor) {
            Ok(CursorPosition::Index(index)) => index.min(total),
            Ok(CursorPosition::AfterKey(key)) => items
                .iter()
                .position(|item| item.sort_key() > key.as_str())
                .unwrap_or(total),
            Err(e) => {
                tracing::warn!(cursor = %cursor, error = %e, "Ignoring invalid cursor, starting from the first page");
                0
            }
        }
    };

    let end = start.saturating_add(page_size).min(total);
    let next_cursor = (end < total).then(|| encode_cursor(end));

    let items: Vec<T> = items.into_iter().skip(start).take(end - start).collect();

    Page {
        items,
        next_cursor,
        total,
    }
}

/// Normalize a requested page size: missing or non-positive -> default, capped at max
pub fn clamp_page_size(requested: Option<i64>, paging: &PagingConfig) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n)
            .unwrap_or(paging.max_page_size)
            .min(paging.max_page_size),
        _ => paging.default_page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(String);

    impl SortKey for Item {
        fn sort_key(&self) -> &str {
            &self.0
        }
    }

    fn items(n: usize) -> Vec<Item> {
        // Deliberately unsorted input
        (0..n).rev().map(|i| Item(format!("C{:05}", i))).collect()
    }

    fn collect_all(input: Vec<Item>, page_size: usize) -> (Vec<Item>, usize) {
        let mut out = Vec::new();
        let mut cursor = String::new();
        let mut calls = 0;
        loop {
            let page = paginate(input.clone(), &cursor, page_size, PageOrder::Default);
            calls += 1;
            out.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }
        (out, calls)
    }

    #[test]
    fn test_pagination_is_complete_and_ordered() {
        for (n, page_size) in [(0, 5), (1, 1), (7, 3), (9, 3), (100, 7), (50, 100)] {
            let mut expected = items(n);
            sort_by_default_key(&mut expected);

            let (all, calls) = collect_all(items(n), page_size);

            assert_eq!(all, expected, "n={} page_size={}", n, page_size);
            assert_eq!(calls, n.div_ceil(page_size).max(1));
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        for i in 0..=300 {
            assert_eq!(decode_cursor(&encode_cursor(i)).unwrap(), CursorPosition::Index(i));
        }
    }

    #[test]
    fn test_cursor_wire_format() {
        assert_eq!(encode_cursor(1000), "MTAwMA==");
    }

    #[test]
    fn test_garbage_cursor_restarts_from_first_page() {
        let fresh = paginate(items(20), "", 5, PageOrder::Default);
        let stale = paginate(items(20), "garbage-not-base64", 5, PageOrder::Default);

        assert_eq!(stale.items, fresh.items);
        assert_eq!(stale.next_cursor, fresh.next_cursor);
    }

    #[test]
    fn test_negative_index_restarts() {
        let cursor = STANDARD.encode("-3");
        assert!(decode_cursor(&cursor).is_err());

        let page = paginate(items(10), &cursor, 4, PageOrder::Default);
        assert_eq!(page.items[0], Item("C00000".to_string()));
    }

    #[test]
    fn test_legacy_key_cursor_resumes_after_key() {
        let input = vec![
            Item("C1".to_string()),
            Item("C3".to_string()),
            Item("C5".to_string()),
            Item("C7".to_string()),
        ];
        let cursor = STANDARD.encode("C4");
        assert_eq!(
            decode_cursor(&cursor).unwrap(),
            CursorPosition::AfterKey("C4".to_string())
        );

        let page = paginate(input.clone(), &cursor, 10, PageOrder::Default);
        assert_eq!(page.items, vec![Item("C5".to_string()), Item("C7".to_string())]);

        // Exact match resumes strictly after it
        let page = paginate(input, &STANDARD.encode("C3"), 1, PageOrder::Default);
        assert_eq!(page.items, vec![Item("C5".to_string())]);
        assert_eq!(page.next_cursor, Some(encode_cursor(3)));
    }

    #[test]
    fn test_index_past_end_gives_empty_last_page() {
        let page = paginate(items(3), &encode_cursor(10), 2, PageOrder::Default);
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_twenty_five_hundred_in_pages_of_thousand() {
        let first = paginate(items(2500), "", 1000, PageOrder::Default);
        assert_eq!(first.items.len(), 1000);
        assert_eq!(first.items[0], Item("C00000".to_string()));
        let cursor = first.next_cursor.expect("second page");

        let second = paginate(items(2500), &cursor, 1000, PageOrder::Default);
        assert_eq!(second.items.len(), 1000);
        assert_eq!(second.items[0], Item("C01000".to_string()));
        assert_eq!(second.items[999], Item("C01999".to_string()));
        let cursor = second.next_cursor.expect("third page");

        let third = paginate(items(2500), &cursor, 1000, PageOrder::Default);
        assert_eq!(third.items.len(), 500);
        assert!(third.next_cursor.is_none());
    }

    #[test]
    fn test_preserve_keeps_caller_order() {
        let page = paginate(items(5), "", 2, PageOrder::Preserve);
        assert_eq!(page.items[0], Item("C00004".to_string()));
    }

    #[test]
    fn test_infer_detects_descending_input() {
        // First key > last key: treated as an intentional order
        let page = paginate(items(5), "", 5, PageOrder::Infer);
        assert_eq!(page.items[0], Item("C00004".to_string()));

        // First key < last key: re-sorted, even though the middle was scrambled
        let scrambled = vec![
            Item("A".to_string()),
            Item("C".to_string()),
            Item("B".to_string()),
            Item("D".to_string()),
        ];
        assert!(!looks_custom_sorted(&scrambled));
        let page = paginate(scrambled, "", 4, PageOrder::Infer);
        assert_eq!(page.items[1], Item("B".to_string()));
    }

    #[test]
    fn test_clamp_page_size() {
        let paging = PagingConfig::default();
        assert_eq!(clamp_page_size(None, &paging), 100);
        assert_eq!(clamp_page_size(Some(0), &paging), 100);
        assert_eq!(clamp_page_size(Some(-5), &paging), 100);
        assert_eq!(clamp_page_size(Some(25), &paging), 25);
        assert_eq!(clamp_page_size(Some(5000), &paging), 1000);
    }
}
