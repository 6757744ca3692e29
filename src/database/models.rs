use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub title: String,
    /// Air date as epoch milliseconds (UTC midnight of the broadcast day).
    pub air_date: i64,
    /// Season/episode label such as `S01E01`.
    pub episode_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeCharacterLink {
    pub episode_id: i64,
    pub character_id: i64,
}

/// Row counts reported by diagnostics and the importer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub episodes: i64,
    pub characters: i64,
    pub links: i64,
}

// ============================================================================
// Ordering
// ============================================================================

/// The six orderings the catalog supports. Wire codes 1..=6 follow
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSpec {
    EpisodeAsc,
    EpisodeDesc,
    DateAsc,
    DateDesc,
    TitleAsc,
    TitleDesc,
}

/// Column a sort toggle acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderColumn {
    Episode,
    Date,
    Title,
}

impl Default for OrderSpec {
    fn default() -> Self {
        Self::EpisodeAsc
    }
}

impl OrderSpec {
    pub const ALL: [OrderSpec; 6] = [
        Self::EpisodeAsc,
        Self::EpisodeDesc,
        Self::DateAsc,
        Self::DateDesc,
        Self::TitleAsc,
        Self::TitleDesc,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::EpisodeAsc),
            2 => Some(Self::EpisodeDesc),
            3 => Some(Self::DateAsc),
            4 => Some(Self::DateDesc),
            5 => Some(Self::TitleAsc),
            6 => Some(Self::TitleDesc),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::EpisodeAsc => 1,
            Self::EpisodeDesc => 2,
            Self::DateAsc => 3,
            Self::DateDesc => 4,
            Self::TitleAsc => 5,
            Self::TitleDesc => 6,
        }
    }

    /// `ORDER BY` clause for the episodes table. Ties fall back to the
    /// primary key so page boundaries are stable across requests.
    pub fn sql_order_by(self) -> &'static str {
        match self {
            Self::EpisodeAsc => "episode ASC, ep_id ASC",
            Self::EpisodeDesc => "episode DESC, ep_id ASC",
            Self::DateAsc => "air_date ASC, ep_id ASC",
            Self::DateDesc => "air_date DESC, ep_id ASC",
            Self::TitleAsc => "title ASC, ep_id ASC",
            Self::TitleDesc => "title DESC, ep_id ASC",
        }
    }

    pub fn column(self) -> OrderColumn {
        match self {
            Self::EpisodeAsc | Self::EpisodeDesc => OrderColumn::Episode,
            Self::DateAsc | Self::DateDesc => OrderColumn::Date,
            Self::TitleAsc | Self::TitleDesc => OrderColumn::Title,
        }
    }

    pub fn is_ascending(self) -> bool {
        matches!(self, Self::EpisodeAsc | Self::DateAsc | Self::TitleAsc)
    }

    /// Clicking a column header: ascending first, descending if that column
    /// is already ascending.
    pub fn toggled(self, column: OrderColumn) -> Self {
        let ascending = self.column() == column && self.is_ascending();
        match (column, ascending) {
            (OrderColumn::Episode, false) => Self::EpisodeAsc,
            (OrderColumn::Episode, true) => Self::EpisodeDesc,
            (OrderColumn::Date, false) => Self::DateAsc,
            (OrderColumn::Date, true) => Self::DateDesc,
            (OrderColumn::Title, false) => Self::TitleAsc,
            (OrderColumn::Title, true) => Self::TitleDesc,
        }
    }
}

impl std::fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EpisodeAsc => write!(f, "episode ascending"),
            Self::EpisodeDesc => write!(f, "episode descending"),
            Self::DateAsc => write!(f, "date ascending"),
            Self::DateDesc => write!(f, "date descending"),
            Self::TitleAsc => write!(f, "title ascending"),
            Self::TitleDesc => write!(f, "title descending"),
        }
    }
}
