//! Runs store effects against the server.
//!
//! Each effect becomes one spawned task whose result is sent back as an
//! action. Results are applied on the session's owner, one at a time, so the
//! store never needs a lock.

use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::http::ApiClient;
use super::store::{Action, CatalogState, Effect, Store};
use crate::api::types::{CharactersResponse, PageCountResponse};

pub struct Session {
    store: Store,
    client: ApiClient,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
    cancel: CancellationToken,
    in_flight: usize,
}

impl Session {
    pub fn new(client: ApiClient, store: Store) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            client,
            tx,
            rx,
            cancel: CancellationToken::new(),
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &CatalogState {
        self.store.state()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Issue the initial page fetch.
    pub fn start(&mut self) {
        let effects = self.store.start();
        self.spawn_all(effects);
    }

    pub fn dispatch(&mut self, action: Action) {
        let effects = self.store.dispatch(action);
        self.spawn_all(effects);
    }

    /// Wait for one fetch result and apply it. Returns `false` when nothing
    /// is in flight or the session was shut down.
    pub async fn apply_next(&mut self) -> bool {
        if self.in_flight == 0 || self.cancel.is_cancelled() {
            return false;
        }
        let action = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            action = self.rx.recv() => action,
        };
        let Some(action) = action else {
            return false;
        };
        self.in_flight -= 1;
        self.dispatch(action);
        true
    }

    /// Apply results until every fetch (including the ones they trigger)
    /// has completed.
    pub async fn settle(&mut self) {
        while self.apply_next().await {}
    }

    /// Cancel outstanding fetches. Their results are never applied.
    pub fn shutdown(&mut self) {
        log::debug!("Shutting down browse session ({} fetch(es) in flight)", self.in_flight);
        self.cancel.cancel();
        self.in_flight = 0;
    }

    fn spawn_all(&mut self, effects: Vec<Effect>) {
        if self.cancel.is_cancelled() {
            return;
        }
        for effect in effects {
            self.in_flight += 1;
            let client = self.client.clone();
            let seq = effect.seq();
            let request = effect.request_name();
            spawn_reporting(
                self.tx.clone(),
                self.cancel.clone(),
                seq,
                request,
                async move { perform(&client, effect).await },
            );
        }
    }
}

/// Run `fetch` on its own task and send exactly one action back unless
/// cancelled. A panicking fetch is reported as `FetchFailed` so the session's
/// in-flight count still drains.
pub(crate) fn spawn_reporting<F>(
    tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
    seq: u64,
    request: &'static str,
    fetch: F,
) where
    F: Future<Output = Action> + Send + 'static,
{
    tokio::spawn(async move {
        let mut work = tokio::spawn(fetch);
        let action = tokio::select! {
            _ = cancel.cancelled() => {
                work.abort();
                return;
            }
            joined = &mut work => match joined {
                Ok(action) => action,
                Err(e) => {
                    log::error!("{} fetch task (seq {}) died: {}", request, seq, e);
                    Action::FetchFailed {
                        seq,
                        request: request.to_string(),
                        reason: format!("fetch task failed: {}", e),
                    }
                }
            },
        };
        let _ = tx.send(action);
    });
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run one effect to completion, folding transport errors into
/// `FetchFailed`.
pub async fn perform(client: &ApiClient, effect: Effect) -> Action {
    match effect {
        Effect::FetchPage { seq, query } => match client.fetch_page(&query).await {
            Ok(response) => Action::PageLoaded { seq, response },
            Err(e) => failed(seq, "page", e),
        },
        Effect::FetchCharacters { seq, episode_id } => {
            match client.fetch_characters(episode_id).await {
                Ok(CharactersResponse::Ok { characters }) => Action::CharactersLoaded {
                    seq,
                    episode_id,
                    characters,
                },
                Ok(CharactersResponse::InvalidInput { reason, .. }) => Action::FetchFailed {
                    seq,
                    request: "characters".to_string(),
                    reason,
                },
                Err(e) => failed(seq, "characters", e),
            }
        }
        Effect::FetchPageCount {
            seq,
            total_matching,
        } => match client.fetch_num_of_pages(total_matching).await {
            Ok(PageCountResponse::Ok { pages }) => Action::PageCountLoaded { seq, pages },
            Ok(PageCountResponse::InvalidInput { reason, .. }) => Action::FetchFailed {
                seq,
                request: "num_of_pages".to_string(),
                reason,
            },
            Err(e) => failed(seq, "num_of_pages", e),
        },
    }
}

fn failed(seq: u64, request: &str, err: crate::error::AppError) -> Action {
    Action::FetchFailed {
        seq,
        request: request.to_string(),
        reason: err.to_string(),
    }
}
