//! Wire types shared by the HTTP handlers and the browse client.
//!
//! Every response carries a `status` tag. The legacy fields (`pages`,
//! `episodes`) are present in every variant, so a consumer that ignores the
//! tag still sees the old empty-page shape for bad input.

use serde::{Deserialize, Serialize};

use crate::database::{Character, Episode};
use crate::query::{Page, PageOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageResponse {
    /// `pages` is the number of matching episodes, not a page count.
    Ok { pages: i64, episodes: Vec<Episode> },
    Empty { pages: i64, episodes: Vec<Episode> },
    InvalidInput {
        reason: String,
        pages: i64,
        episodes: Vec<Episode>,
    },
}

impl PageResponse {
    pub fn invalid(reason: impl Into<String>) -> Self {
        let sentinel = Page::sentinel();
        Self::InvalidInput {
            reason: reason.into(),
            pages: sentinel.total_matching,
            episodes: sentinel.items,
        }
    }

    pub fn total_matching(&self) -> i64 {
        match self {
            Self::Ok { pages, .. } => *pages,
            Self::Empty { .. } | Self::InvalidInput { .. } => 0,
        }
    }

    pub fn episodes(&self) -> &[Episode] {
        match self {
            Self::Ok { episodes, .. }
            | Self::Empty { episodes, .. }
            | Self::InvalidInput { episodes, .. } => episodes,
        }
    }
}

impl From<PageOutcome> for PageResponse {
    fn from(outcome: PageOutcome) -> Self {
        match outcome {
            PageOutcome::Found(page) => Self::Ok {
                pages: page.total_matching,
                episodes: page.items,
            },
            other => {
                let page = other.into_page();
                Self::Empty {
                    pages: page.total_matching,
                    episodes: page.items,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageCountResponse {
    Ok { pages: i64 },
    InvalidInput { reason: String, pages: i64 },
}

impl PageCountResponse {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
            pages: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CharactersResponse {
    Ok { characters: Vec<Character> },
    InvalidInput {
        reason: String,
        characters: Vec<Character>,
    },
}

impl CharactersResponse {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
            characters: Vec::new(),
        }
    }
}
