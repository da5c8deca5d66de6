//! Connection pagination as an explicit state machine.

use crate::error::{GhqlError, Result};
use serde_json::Value as Json;

/// One page of a GraphQL connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub edges: Vec<Json>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Fetches pages of one connection; `after` is the previous page's end cursor.
pub trait PageSource {
    fn fetch(&mut self, after: Option<&str>) -> Result<Page>;
}

#[derive(Debug)]
enum PageState {
    Uninitialized,
    HasPage {
        edges: Vec<Json>,
        index: usize,
        end_cursor: Option<String>,
        has_next_page: bool,
    },
    Exhausted,
    Failed,
}

/// Walks a connection edge by edge, fetching pages on demand.
///
/// ```text
/// Uninitialized --start--> HasPage | Exhausted
/// HasPage --advance--> HasPage (same or next page) | Exhausted
/// any fetch error --> Failed
/// ```
///
/// Empty pages that still report `hasNextPage` are skipped, never surfaced
/// as end of data. Exhausted and Failed are terminal until the next `start`.
#[derive(Debug)]
pub struct Paginator<S> {
    source: S,
    state: PageState,
    fetches: usize,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: PageState::Uninitialized,
            fetches: 0,
        }
    }

    /// Fetches the first page and positions on its first edge.
    pub fn start(&mut self) -> Result<()> {
        self.state = PageState::Uninitialized;
        self.load(None)
    }

    /// Moves to the next edge, fetching the next page when the buffered one
    /// is used up. A no-op once the connection is exhausted or failed.
    pub fn advance(&mut self) -> Result<()> {
        let after = match &mut self.state {
            PageState::HasPage {
                edges,
                index,
                end_cursor,
                has_next_page,
            } => {
                if *index + 1 < edges.len() {
                    *index += 1;
                    return Ok(());
                }
                if !*has_next_page {
                    None
                } else {
                    Some(end_cursor.take())
                }
            }
            _ => return Ok(()),
        };
        match after {
            Some(after) => self.load(after),
            None => {
                self.state = PageState::Exhausted;
                Ok(())
            }
        }
    }

    fn load(&mut self, mut after: Option<String>) -> Result<()> {
        loop {
            let page = match self.source.fetch(after.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    self.state = PageState::Failed;
                    return Err(e);
                }
            };
            self.fetches += 1;

            if page.has_next_page && (page.end_cursor.is_none() || page.end_cursor == after) {
                self.state = PageState::Failed;
                return Err(GhqlError::Stalled(after));
            }
            if !page.edges.is_empty() {
                self.state = PageState::HasPage {
                    edges: page.edges,
                    index: 0,
                    end_cursor: page.end_cursor,
                    has_next_page: page.has_next_page,
                };
                return Ok(());
            }
            if !page.has_next_page {
                self.state = PageState::Exhausted;
                return Ok(());
            }
            tracing::debug!(cursor = ?page.end_cursor, "skipping empty page");
            after = page.end_cursor;
        }
    }

    /// The edge the paginator is positioned on.
    pub fn current(&self) -> Option<&Json> {
        match &self.state {
            PageState::HasPage { edges, index, .. } => edges.get(*index),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.current().is_none()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, PageState::Failed)
    }

    /// Pages fetched since construction.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays canned pages and records the `after` argument of each call.
    #[derive(Default)]
    struct Scripted {
        pages: VecDeque<Result<Page>>,
        calls: Vec<Option<String>>,
    }

    impl Scripted {
        fn page(mut self, items: &[i64], end_cursor: Option<&str>, has_next_page: bool) -> Self {
            self.pages.push_back(Ok(Page {
                edges: items.iter().map(|i| json!({ "node": { "n": i } })).collect(),
                end_cursor: end_cursor.map(str::to_string),
                has_next_page,
            }));
            self
        }

        fn fail(mut self) -> Self {
            self.pages
                .push_back(Err(GhqlError::Status { status: 502, body: "bad gateway".into() }));
            self
        }
    }

    impl PageSource for Scripted {
        fn fetch(&mut self, after: Option<&str>) -> Result<Page> {
            self.calls.push(after.map(str::to_string));
            self.pages.pop_front().unwrap_or_else(|| Ok(Page::default()))
        }
    }

    fn drain(paginator: &mut Paginator<Scripted>) -> Result<Vec<i64>> {
        let mut seen = Vec::new();
        paginator.start()?;
        while let Some(edge) = paginator.current() {
            seen.push(edge["node"]["n"].as_i64().unwrap());
            paginator.advance()?;
        }
        Ok(seen)
    }

    #[test]
    fn test_pages_concatenate_in_fetch_order() {
        let source = Scripted::default()
            .page(&[1, 2, 3], Some("c1"), true)
            .page(&[4, 5], Some("c2"), false);
        let mut paginator = Paginator::new(source);

        assert_eq!(drain(&mut paginator).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(paginator.fetches(), 2);
        assert_eq!(paginator.source().calls, vec![None, Some("c1".to_string())]);
    }

    #[test]
    fn test_advance_after_eof_is_noop() {
        let source = Scripted::default().page(&[1], Some("c1"), false);
        let mut paginator = Paginator::new(source);
        drain(&mut paginator).unwrap();

        for _ in 0..3 {
            paginator.advance().unwrap();
            assert!(paginator.is_eof());
        }
        assert_eq!(paginator.fetches(), 1);
    }

    #[test]
    fn test_empty_intermediate_page_is_skipped() {
        let source = Scripted::default()
            .page(&[1], Some("c1"), true)
            .page(&[], Some("c2"), true)
            .page(&[2], Some("c3"), false);
        let mut paginator = Paginator::new(source);

        assert_eq!(drain(&mut paginator).unwrap(), vec![1, 2]);
        assert_eq!(paginator.fetches(), 3);
    }

    #[test]
    fn test_empty_first_page_is_exhausted() {
        let source = Scripted::default().page(&[], None, false);
        let mut paginator = Paginator::new(source);
        paginator.start().unwrap();
        assert!(paginator.is_eof());
        assert!(!paginator.is_failed());
    }

    #[test]
    fn test_stalled_cursor_fails() {
        let source = Scripted::default()
            .page(&[1], Some("c1"), true)
            .page(&[2], Some("c1"), true);
        let mut paginator = Paginator::new(source);

        let err = drain(&mut paginator).unwrap_err();
        assert!(matches!(err, GhqlError::Stalled(Some(ref c)) if c == "c1"));
        assert!(paginator.is_failed());
    }

    #[test]
    fn test_missing_end_cursor_with_more_pages_fails() {
        let source = Scripted::default().page(&[1], None, true);
        let mut paginator = Paginator::new(source);
        assert!(matches!(paginator.start(), Err(GhqlError::Stalled(None))));
    }

    #[test]
    fn test_fetch_error_is_terminal() {
        let source = Scripted::default().page(&[1], Some("c1"), true).fail();
        let mut paginator = Paginator::new(source);
        paginator.start().unwrap();

        assert!(paginator.advance().is_err());
        assert!(paginator.is_failed());
        assert!(paginator.is_eof());
        paginator.advance().unwrap();
        assert_eq!(paginator.fetches(), 1);
        assert_eq!(paginator.source().calls.len(), 2);
    }
}
