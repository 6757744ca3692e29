//! Browser state as an explicit store.
//!
//! User actions and fetch responses are both `Action`s. The reducer mutates
//! `CatalogState` and returns the fetches (`Effect`s) the caller must run.
//! Every page fetch carries a sequence number; responses tagged with an
//! older number are dropped, so a slow reply to a superseded query can never
//! overwrite newer state.

use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::api::types::PageResponse;
use crate::database::{Character, Episode, OrderColumn, OrderSpec};
use crate::query::FilterSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRow {
    pub episode: Episode,
    /// Filled in when the per-episode character fetch completes.
    pub characters: Vec<Character>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Popup {
    pub shown: bool,
    pub episode_id: Option<i64>,
    pub episode_code: String,
    pub characters: Vec<Character>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub order: OrderSpec,
    pub filter: FilterSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogState {
    pub current_page: i64,
    pub order: OrderSpec,
    pub filter: FilterSpec,
    pub total_matching: i64,
    pub rows: Vec<EpisodeRow>,
    pub num_of_pages: i64,
    pub popup: Popup,
    latest_seq: u64,
}

impl CatalogState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            current_page: 1,
            order: OrderSpec::EpisodeAsc,
            filter: FilterSpec::new("", 0, now_ms),
            total_matching: 0,
            rows: Vec::new(),
            num_of_pages: 1,
            popup: Popup::default(),
            latest_seq: 0,
        }
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    fn query(&self) -> PageQuery {
        PageQuery {
            page: self.current_page,
            order: self.order,
            filter: self.filter.clone(),
        }
    }

    fn criteria(&self) -> (i64, OrderSpec, FilterSpec) {
        (self.current_page, self.order, self.filter.clone())
    }

    fn refetch(&mut self) -> Vec<Effect> {
        self.latest_seq += 1;
        vec![Effect::FetchPage {
            seq: self.latest_seq,
            query: self.query(),
        }]
    }

    fn is_stale(&self, seq: u64, what: &str) -> bool {
        if seq != self.latest_seq {
            log::debug!(
                "Dropping stale {} response (seq {}, latest {})",
                what,
                seq,
                self.latest_seq
            );
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NextPage,
    PreviousPage,
    SetOrder(OrderSpec),
    ToggleOrder(OrderColumn),
    FilterTitle(String),
    FilterFrom(String),
    FilterTo(String),
    OpenPopup(i64),
    ClosePopup,
    PageLoaded {
        seq: u64,
        response: PageResponse,
    },
    CharactersLoaded {
        seq: u64,
        episode_id: i64,
        characters: Vec<Character>,
    },
    PageCountLoaded {
        seq: u64,
        pages: i64,
    },
    FetchFailed {
        seq: u64,
        request: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPage { seq: u64, query: PageQuery },
    FetchCharacters { seq: u64, episode_id: i64 },
    FetchPageCount { seq: u64, total_matching: i64 },
}

impl Effect {
    pub fn seq(&self) -> u64 {
        match self {
            Effect::FetchPage { seq, .. }
            | Effect::FetchCharacters { seq, .. }
            | Effect::FetchPageCount { seq, .. } => *seq,
        }
    }

    /// Endpoint name used in failure reports.
    pub fn request_name(&self) -> &'static str {
        match self {
            Effect::FetchPage { .. } => "page",
            Effect::FetchCharacters { .. } => "characters",
            Effect::FetchPageCount { .. } => "num_of_pages",
        }
    }
}

/// Apply one action. Changing page, order or filter issues a fresh page
/// fetch; a no-op change issues nothing.
pub fn reduce(state: &mut CatalogState, action: Action, now_ms: i64) -> Vec<Effect> {
    let before = state.criteria();

    match action {
        Action::NextPage => {
            if state.current_page >= state.num_of_pages {
                log::info!("Already on last page.");
                return Vec::new();
            }
            state.current_page += 1;
        }
        Action::PreviousPage => {
            if state.current_page <= 1 {
                log::info!("Already on first page.");
                return Vec::new();
            }
            state.current_page -= 1;
        }
        Action::SetOrder(order) => state.order = order,
        Action::ToggleOrder(column) => state.order = state.order.toggled(column),
        Action::FilterTitle(title) => {
            state.current_page = 1;
            state.filter.title_substring = title;
        }
        Action::FilterFrom(input) => {
            if input.trim().is_empty() {
                state.filter.date_from = 0;
            } else if let Some(ms) = parse_date_input(&input) {
                state.current_page = 1;
                state.filter.date_from = ms;
            }
        }
        Action::FilterTo(input) => {
            if input.trim().is_empty() {
                state.filter.date_to = now_ms;
            } else if let Some(ms) = parse_date_input(&input) {
                state.current_page = 1;
                state.filter.date_to = ms;
            }
        }
        Action::OpenPopup(episode_id) => {
            match state.rows.iter().find(|row| row.episode.id == episode_id) {
                Some(row) => {
                    state.popup = Popup {
                        shown: true,
                        episode_id: Some(episode_id),
                        episode_code: row.episode.episode_code.clone(),
                        characters: row.characters.clone(),
                    };
                }
                None => log::warn!("Episode {} is not on the current page", episode_id),
            }
            return Vec::new();
        }
        Action::ClosePopup => {
            state.popup.shown = false;
            return Vec::new();
        }
        Action::PageLoaded { seq, response } => {
            if state.is_stale(seq, "page") {
                return Vec::new();
            }
            return apply_page(state, seq, response);
        }
        Action::CharactersLoaded {
            seq,
            episode_id,
            characters,
        } => {
            if state.is_stale(seq, "characters") {
                return Vec::new();
            }
            if state.popup.episode_id == Some(episode_id) {
                state.popup.characters = characters.clone();
            }
            if let Some(row) = state.rows.iter_mut().find(|r| r.episode.id == episode_id) {
                row.characters = characters;
            }
            return Vec::new();
        }
        Action::PageCountLoaded { seq, pages } => {
            if !state.is_stale(seq, "page count") {
                state.num_of_pages = pages.max(1);
            }
            return Vec::new();
        }
        Action::FetchFailed {
            seq,
            request,
            reason,
        } => {
            log::error!("{} request (seq {}) failed: {}", request, seq, reason);
            return Vec::new();
        }
    }

    if state.criteria() == before {
        return Vec::new();
    }
    state.refetch()
}

fn apply_page(state: &mut CatalogState, seq: u64, response: PageResponse) -> Vec<Effect> {
    if let PageResponse::InvalidInput { reason, .. } = &response {
        log::warn!("Server rejected page query: {}", reason);
    }

    let total_matching = response.total_matching();
    let rows: Vec<EpisodeRow> = match response {
        PageResponse::Ok { episodes, .. } => episodes
            .into_iter()
            .map(|episode| EpisodeRow {
                episode,
                characters: Vec::new(),
            })
            .collect(),
        PageResponse::Empty { .. } | PageResponse::InvalidInput { .. } => Vec::new(),
    };

    state.total_matching = total_matching;
    state.rows = rows;

    let mut effects: Vec<Effect> = state
        .rows
        .iter()
        .map(|row| Effect::FetchCharacters {
            seq,
            episode_id: row.episode.id,
        })
        .collect();
    effects.push(Effect::FetchPageCount {
        seq,
        total_matching,
    });
    effects
}

/// Parse a `YYYY.MM.DD` date filter (any single separator, 20xx years) to
/// UTC-midnight epoch milliseconds.
pub fn parse_date_input(input: &str) -> Option<i64> {
    static DATE_INPUT: OnceLock<Option<Regex>> = OnceLock::new();
    let re = DATE_INPUT
        .get_or_init(|| Regex::new(r"^(20\d{2}).(0[1-9]|1[0-2]).(0[1-9]|[12]\d|3[01])$").ok())
        .as_ref()?;

    let caps = re.captures(input.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Owns the state and the clock the date filters reset against.
pub struct Store {
    state: CatalogState,
    clock: Clock,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_clock(|| Utc::now().timestamp_millis())
    }

    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        let clock: Clock = Box::new(clock);
        Self {
            state: CatalogState::new(clock()),
            clock,
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Initial fetch for the default criteria.
    pub fn start(&mut self) -> Vec<Effect> {
        self.state.refetch()
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        let now_ms = (self.clock)();
        reduce(&mut self.state, action, now_ms)
    }
}
