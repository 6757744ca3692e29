//! Terminal browse client: reducer-driven state, an HTTP runtime that feeds
//! results back as actions, and a text view.

pub mod browse;
pub mod http;
pub mod runtime;
pub mod store;
pub mod view;

#[cfg(test)]
mod tests;

pub use http::ApiClient;
pub use runtime::Session;
pub use store::{Action, CatalogState, Effect, EpisodeRow, PageQuery, Popup, Store};
pub use view::{format_air_date, render};
