use axum::extract::{Path, State};
use axum::Json;

use super::types::{PageCountResponse, PageResponse};
use super::{parse_int, AppState};
use crate::database::OrderSpec;
use crate::error::AppError;
use crate::query::{self, FilterSpec};

/// Validated form of the page route parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub order: OrderSpec,
    pub filter: FilterSpec,
}

impl PageRequest {
    pub fn parse(
        page: &str,
        order: &str,
        from: &str,
        to: &str,
        title: Option<&str>,
    ) -> Result<Self, String> {
        let page = parse_int("page", page)?;
        if page < 0 {
            return Err(format!("page must not be negative (got {})", page));
        }
        let code = parse_int("order", order)?;
        let order = OrderSpec::from_code(code)
            .ok_or_else(|| format!("order must be between 1 and 6 (got {})", code))?;
        let date_from = parse_int("fromFilter", from)?;
        let date_to = parse_int("toFilter", to)?;

        Ok(Self {
            page,
            order,
            filter: FilterSpec::new(title.unwrap_or_default(), date_from, date_to),
        })
    }
}

/// GET /api/page/:id/:type/:fromFilter/:toFilter
pub async fn get_page(
    State(state): State<AppState>,
    Path((page, order, from, to)): Path<(String, String, String, String)>,
) -> Result<Json<PageResponse>, AppError> {
    page_response(state, &page, &order, &from, &to, None).await
}

/// GET /api/page/:id/:type/:fromFilter/:toFilter/:nameFilter
pub async fn get_page_with_title(
    State(state): State<AppState>,
    Path((page, order, from, to, title)): Path<(String, String, String, String, String)>,
) -> Result<Json<PageResponse>, AppError> {
    page_response(state, &page, &order, &from, &to, Some(&title)).await
}

async fn page_response(
    state: AppState,
    page: &str,
    order: &str,
    from: &str,
    to: &str,
    title: Option<&str>,
) -> Result<Json<PageResponse>, AppError> {
    let request = match PageRequest::parse(page, order, from, to, title) {
        Ok(request) => request,
        Err(reason) => {
            log::warn!("Rejected page request: {}", reason);
            return Ok(Json(PageResponse::invalid(reason)));
        }
    };

    log::debug!(
        "get_page {} ({}), title={:?}, dates {}..={}",
        request.page,
        request.order,
        request.filter.title_substring,
        request.filter.date_from,
        request.filter.date_to
    );

    let service = state.query.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        service.query_page(request.page, request.order, &request.filter)
    })
    .await?
    .map_err(|e| state.record_failure("get_page", e.into()))?;

    Ok(Json(PageResponse::from(outcome)))
}

/// GET /api/num_of_pages/:num
pub async fn get_num_of_pages(Path(num): Path<String>) -> Json<PageCountResponse> {
    match parse_int("num", &num) {
        Ok(n) if n >= 0 => Json(PageCountResponse::Ok {
            pages: query::total_pages(n),
        }),
        Ok(n) => Json(PageCountResponse::invalid(format!(
            "match count must not be negative (got {})",
            n
        ))),
        Err(reason) => Json(PageCountResponse::invalid(reason)),
    }
}
