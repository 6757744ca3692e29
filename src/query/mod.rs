//! Filtering, ordering and pagination over the episode store.
//!
//! Ordering is done by the store; filtering and slicing happen here in
//! memory so `total_matching` is always the size of the filtered set.


use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::{Character, Database, Episode, OrderSpec};

/// Fixed page size.
pub const ITEMS_PER_PAGE: i64 = 15;

/// Title substring (case-insensitive) plus an inclusive air-date window in
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub title_substring: String,
    pub date_from: i64,
    pub date_to: i64,
}

impl FilterSpec {
    pub fn new(title_substring: impl Into<String>, date_from: i64, date_to: i64) -> Self {
        Self {
            title_substring: title_substring.into(),
            date_from,
            date_to,
        }
    }

    /// Matches every episode.
    pub fn unbounded() -> Self {
        Self::new("", i64::MIN, i64::MAX)
    }

    pub fn matches(&self, episode: &Episode) -> bool {
        if episode.air_date < self.date_from || episode.air_date > self.date_to {
            return false;
        }
        self.title_substring.is_empty()
            || episode
                .title
                .to_lowercase()
                .contains(&self.title_substring.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub total_matching: i64,
    pub items: Vec<Episode>,
}

impl Page {
    /// Shape returned for a page number outside `1..=total_pages`.
    pub fn sentinel() -> Self {
        Self {
            total_matching: 1,
            items: Vec::new(),
        }
    }
}

/// Result of a page request before it is collapsed to wire or legacy shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Found(Page),
    /// Page 1 of a filter that matched nothing.
    Empty,
    OutOfRange { requested: i64, total_pages: i64 },
}

impl PageOutcome {
    /// Legacy `Page` view: `Empty` keeps its zero count, out-of-range pages
    /// become the sentinel.
    pub fn into_page(self) -> Page {
        match self {
            PageOutcome::Found(page) => page,
            PageOutcome::Empty => Page {
                total_matching: 0,
                items: Vec::new(),
            },
            PageOutcome::OutOfRange { .. } => Page::sentinel(),
        }
    }
}

/// Number of pages needed for `match_count` episodes. Zero matches still
/// count as one (empty) page.
pub fn total_pages(match_count: i64) -> i64 {
    if match_count <= 0 {
        return 1;
    }
    // rounding up by addition would overflow near i64::MAX
    (match_count - 1) / ITEMS_PER_PAGE + 1
}

/// Keep the episodes that pass `filter`, preserving order.
pub fn filter_episodes(episodes: Vec<Episode>, filter: &FilterSpec) -> Vec<Episode> {
    episodes.into_iter().filter(|ep| filter.matches(ep)).collect()
}

/// Cut page `page_number` (1-based) out of an already filtered, ordered list.
pub fn paginate(kept: Vec<Episode>, page_number: i64) -> PageOutcome {
    let total_matching = kept.len() as i64;
    let pages = total_pages(total_matching);

    if page_number <= 0 || page_number > pages {
        return PageOutcome::OutOfRange {
            requested: page_number,
            total_pages: pages,
        };
    }
    if total_matching == 0 {
        return PageOutcome::Empty;
    }

    let start = ((page_number - 1) * ITEMS_PER_PAGE) as usize;
    let items: Vec<Episode> = kept
        .into_iter()
        .skip(start)
        .take(ITEMS_PER_PAGE as usize)
        .collect();

    PageOutcome::Found(Page {
        total_matching,
        items,
    })
}

/// Read-only query front end over the store.
#[derive(Clone)]
pub struct QueryService {
    db: Arc<Database>,
}

impl QueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn query_page(
        &self,
        page_number: i64,
        order: OrderSpec,
        filter: &FilterSpec,
    ) -> Result<PageOutcome> {
        let episodes = self.db.get_all_episodes(order)?;
        let kept = filter_episodes(episodes, filter);
        let outcome = paginate(kept, page_number);

        if let PageOutcome::OutOfRange {
            requested,
            total_pages,
        } = &outcome
        {
            log::warn!(
                "Page {} does not exist ({} page(s) for current filter)",
                requested,
                total_pages
            );
        }

        Ok(outcome)
    }

    pub fn compute_page(
        &self,
        page_number: i64,
        order: OrderSpec,
        filter: &FilterSpec,
    ) -> Result<Page> {
        Ok(self.query_page(page_number, order, filter)?.into_page())
    }

    /// Characters of one episode; an unknown id yields an empty list.
    pub fn characters_of(&self, episode_id: i64) -> Result<Vec<Character>> {
        self.db.get_episode_characters(episode_id)
    }
}
