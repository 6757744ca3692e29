use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::store::PageQuery;
use crate::api::types::{CharactersResponse, PageCountResponse, PageResponse};
use crate::error::{AppError, AppResult};

/// Thin wrapper over the three catalog endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> AppResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid server URL {:?}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "Server URL {:?} cannot carry a path",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `GET /api/page/...`; the title segment is left off when empty.
    pub async fn fetch_page(&self, query: &PageQuery) -> AppResult<PageResponse> {
        let mut segments = vec![
            "api".to_string(),
            "page".to_string(),
            query.page.to_string(),
            query.order.code().to_string(),
            query.filter.date_from.to_string(),
            query.filter.date_to.to_string(),
        ];
        if !query.filter.title_substring.is_empty() {
            segments.push(query.filter.title_substring.clone());
        }
        let url = self.endpoint(&segments)?;
        self.get_json(url).await
    }

    pub async fn fetch_num_of_pages(&self, total_matching: i64) -> AppResult<PageCountResponse> {
        let url = self.endpoint(&["api", "num_of_pages", total_matching.to_string().as_str()])?;
        self.get_json(url).await
    }

    pub async fn fetch_characters(&self, episode_id: i64) -> AppResult<CharactersResponse> {
        let url = self.endpoint(&["api", "characters_of_episode", episode_id.to_string().as_str()])?;
        self.get_json(url).await
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> AppResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Server URL {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }
        Ok(response.json::<T>().await?)
    }
}
