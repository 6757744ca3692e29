//! One-time import of episodes and characters from the public API.
//!
//! The API is paginated as `{info: {pages}, results: [...]}`. Episode
//! results reference characters by URL; the trailing number of each URL is
//! the character id.


use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::database::{Character, Database, Episode, EpisodeCharacterLink};
use crate::error::{AppError, AppResult};

const MAX_ATTEMPTS: usize = 3;
const PAGE_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize)]
struct ApiPage<T> {
    info: ApiInfo,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    pages: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEpisode {
    pub id: i64,
    pub name: String,
    pub air_date: String,
    pub episode: String,
    #[serde(default)]
    pub characters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCharacter {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub episodes: usize,
    pub characters: usize,
    pub links: usize,
    pub skipped_episodes: usize,
}

pub struct Importer {
    db: Arc<Database>,
    client: reqwest::Client,
    api_base: String,
    backoff: Vec<Duration>,
}

impl Importer {
    pub fn new(db: Arc<Database>, api_base: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            db,
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            backoff: vec![Duration::from_secs(2), Duration::from_secs(8)],
        })
    }

    /// Delays between attempts; attempt `n` waits `backoff[n - 1]`.
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn run(&self) -> AppResult<ImportSummary> {
        log::info!("Fetching data from {} - this might take a while", self.api_base);

        let api_episodes: Vec<ApiEpisode> = self.fetch_all("episode").await?;
        let (episodes, links, skipped_episodes) = convert_episodes(api_episodes);
        log::info!(
            "Fetched {} episodes ({} skipped) with {} character links",
            episodes.len(),
            skipped_episodes,
            links.len()
        );

        let api_characters: Vec<ApiCharacter> = self.fetch_all("character").await?;
        let characters: Vec<Character> = api_characters
            .into_iter()
            .map(|c| Character {
                id: c.id,
                name: c.name,
            })
            .collect();
        log::info!("Fetched {} characters", characters.len());

        let db = self.db.clone();
        let summary = tokio::task::spawn_blocking(move || -> anyhow::Result<ImportSummary> {
            Ok(ImportSummary {
                episodes: db.insert_episodes(&episodes)?,
                links: db.insert_links(&links)?,
                characters: db.insert_characters(&characters)?,
                skipped_episodes,
            })
        })
        .await??;

        log::info!(
            "Import complete: {} episodes, {} characters, {} links inserted",
            summary.episodes,
            summary.characters,
            summary.links
        );
        Ok(summary)
    }

    /// Fetch page 1 to learn the page count, then the remaining pages.
    async fn fetch_all<T: DeserializeOwned>(&self, resource: &str) -> AppResult<Vec<T>> {
        let first: ApiPage<T> = self.fetch_page(resource, 1).await?;
        let pages = first.info.pages;
        let mut results = first.results;

        let rest: Vec<ApiPage<T>> = stream::iter(2..=pages)
            .map(|page| self.fetch_page::<T>(resource, page))
            .buffered(PAGE_FETCH_CONCURRENCY)
            .try_collect()
            .await?;
        for page in rest {
            results.extend(page.results);
        }

        log::debug!("{}: {} result(s) over {} page(s)", resource, results.len(), pages);
        Ok(results)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        page: i64,
    ) -> AppResult<ApiPage<T>> {
        let url = format!("{}/{}?page={}", self.api_base, resource, page);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch(&url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let delay = self
                        .backoff
                        .get(attempt - 1)
                        .copied()
                        .unwrap_or_default();
                    log::warn!(
                        "Fetch attempt {} for {} failed, retrying in {:?}: {}",
                        attempt,
                        url,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(AppError::Http(format!(
                        "Fetching {} failed after {} attempts: {}",
                        url, MAX_ATTEMPTS, e
                    )))
                }
            }
        }
    }

    async fn try_fetch<T: DeserializeOwned>(&self, url: &str) -> AppResult<ApiPage<T>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }
        Ok(response.json::<ApiPage<T>>().await?)
    }
}

/// Turn API episodes into store rows plus their character links. Episodes
/// whose air date cannot be read are skipped and counted.
pub fn convert_episodes(
    api_episodes: Vec<ApiEpisode>,
) -> (Vec<Episode>, Vec<EpisodeCharacterLink>, usize) {
    let mut episodes = Vec::with_capacity(api_episodes.len());
    let mut links = Vec::new();
    let mut skipped = 0;

    for ep in api_episodes {
        let Some(air_date) = parse_air_date(&ep.air_date) else {
            log::warn!(
                "Skipping episode {} ({}): unreadable air date {:?}",
                ep.id,
                ep.name,
                ep.air_date
            );
            skipped += 1;
            continue;
        };

        links.extend(ep.characters.iter().filter_map(|url| {
            let id = character_id_from_url(url);
            if id.is_none() {
                log::warn!("Episode {}: no character id in {:?}", ep.id, url);
            }
            id.map(|character_id| EpisodeCharacterLink {
                episode_id: ep.id,
                character_id,
            })
        }));

        episodes.push(Episode {
            id: ep.id,
            title: ep.name,
            air_date,
            episode_code: ep.episode,
        });
    }

    (episodes, links, skipped)
}

/// Trailing number of a character URL, e.g. `.../character/42` -> 42.
pub fn character_id_from_url(url: &str) -> Option<i64> {
    let trimmed = url.trim().trim_end_matches('/');
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[start..].parse().ok()
}

/// Air dates arrive as `December 2, 2013`; store UTC midnight in epoch ms.
pub fn parse_air_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}
