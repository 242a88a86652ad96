//! A stand-in for the contest platform's REST API, served on an ephemeral port
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret";
pub const SLUG: &str = "spring-cup";
pub const CONTEST_NAME: &str = "Spring Cup 2024";

/// `Basic base64("admin@example.com:secret")`
const AUTHORIZATION: &str = "Basic YWRtaW5AZXhhbXBsZS5jb206c2VjcmV0";

#[derive(Debug)]
pub struct FakeApi {
    /// Value of the `status` flag on the contest listing
    pub contests_status: bool,

    /// Size of the leaderboard for `SLUG`
    pub total_entries: usize,

    /// Leaderboard requests at this offset answer 500
    pub fail_at_offset: Option<usize>,

    /// Row at this index comes back with `"score": null`
    pub null_score_at: Option<usize>,

    /// Row at this index is missing its `hacker` field
    pub malformed_at: Option<usize>,

    /// Leaderboard pages served so far
    pub pages_served: AtomicUsize,
}

impl FakeApi {
    pub fn new(total_entries: usize) -> Self {
        FakeApi {
            contests_status: true,
            total_entries,
            fail_at_offset: None,
            null_score_at: None,
            malformed_at: None,
            pages_served: AtomicUsize::new(0),
        }
    }

    /// Serve the API and return its base URL
    pub async fn spawn(self) -> (String, Arc<FakeApi>) {
        let fake = Arc::new(self);
        let app = Router::new()
            .route("/administration/contests", get(contests))
            .route("/contests/:slug/leaderboard", get(leaderboard))
            .with_state(fake.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), fake)
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: usize,
    limit: usize,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(AUTHORIZATION)
}

async fn contests(
    State(fake): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "status": false }))).into_response();
    }
    if page.offset != 0 {
        return Json(json!({ "status": true, "models": [] })).into_response();
    }

    Json(json!({
        "status": fake.contests_status,
        "models": [
            { "id": 1, "slug": "autumn-open", "name": "Autumn Open" },
            { "id": 2, "slug": SLUG, "name": CONTEST_NAME },
        ],
        "total": 2,
    }))
    .into_response()
}

/// Entry `i` is `user{i}` with rank `total - i`, so the API order is the
/// reverse of the ranking
async fn leaderboard(
    State(fake): State<Arc<FakeApi>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if slug != SLUG {
        return StatusCode::NOT_FOUND.into_response();
    }
    if fake.fail_at_offset == Some(page.offset) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    fake.pages_served.fetch_add(1, Ordering::SeqCst);

    let total = fake.total_entries;
    let end = (page.offset + page.limit).min(total);
    let models: Vec<_> = (page.offset.min(end)..end)
        .map(|i| {
            if fake.malformed_at == Some(i) {
                return json!({ "rank": total - i, "score": 1.0 });
            }
            let score = if fake.null_score_at == Some(i) {
                json!(null)
            } else {
                json!((total - i) as f64 * 0.5)
            };
            json!({
                "rank": total - i,
                "hacker": format!("user{}", i),
                "score": score,
                "time_taken": i * 37,
                "country": "Nowhere",
            })
        })
        .collect();

    Json(json!({ "models": models, "total": total })).into_response()
}
