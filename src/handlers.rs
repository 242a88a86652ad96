#![cfg(feature = "web")]

use axum::{
    Form,
    body::Body,
    extract::{Path as AxumPath, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app::AppState;
use crate::client::{Credentials, LeaderboardEntry};
use crate::error::{AppError, Result};
use crate::files;
use crate::report::{self, format_elapsed_time};

const FLASH_COOKIE: &str = "flash";
const TOP_N: usize = 3;
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Credential form posted from the entry page
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Contest choice posted from the picker, credentials riding along in
/// hidden fields
#[derive(Debug, Deserialize)]
pub struct ExportForm {
    pub slug: String,
    pub email: String,
    pub password: String,
}

/// One row of the top-3 table
#[derive(Debug, Serialize)]
struct TopRow {
    rank: u32,
    hacker: String,
    score: String,
    time_taken: Option<String>,
}

/// Result of a successful export
struct Export {
    contest_name: String,
    file_name: String,
    entry_count: usize,
    top: Vec<LeaderboardEntry>,
}

/// Serve the entry page with the credential form
///
/// A pending flash notice is shown once and cleared.
pub async fn serve_login_page(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let notice = jar
        .get(FLASH_COOKIE)
        .and_then(|cookie| {
            urlencoding::decode(cookie.value())
                .ok()
                .map(|value| value.into_owned())
        });
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));

    match render(&state, "login", &json!({ "notice": notice })) {
        Ok(page) => (jar, page).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Check credentials by listing contests, then show the contest picker
pub async fn handle_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let credentials = Credentials::new(form.email, form.password);

    let contests = match state.client.list_contests(&credentials).await {
        Ok(contests) => contests,
        Err(e) => return redirect_with_notice(jar, e),
    };

    let data = json!({
        "contests": contests,
        "email": credentials.email,
        "password": credentials.password,
    });

    match render(&state, "contests", &data) {
        Ok(page) => page.into_response(),
        Err(e) => redirect_with_notice(jar, e),
    }
}

/// Export the chosen contest and show its top three
///
/// Credentials are re-checked by listing contests again, and the slug must
/// be one of them. The whole leaderboard is written to the downloads
/// directory before the page renders.
///
/// # Arguments
/// * `state` - Shared client, config and templates
/// * `jar` - Signed cookies, used only to carry a notice on failure
/// * `form` - Chosen slug plus the credentials from the hidden fields
///
/// # Returns
/// * `Response` - The top-3 page with a download link, or a redirect to `/`
///   with a flash notice (bad credentials, unknown slug, write failure)
///
/// # Examples
/// ```text
/// POST /top3
/// slug=spring-cup&email=admin%40example.com&password=secret
///
/// 200 OK, page links to /download_file/Spring_Cup_2024.xlsx
/// ```
pub async fn handle_export(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<ExportForm>,
) -> Response {
    let credentials = Credentials::new(form.email, form.password);

    let export = match export_contest(&state, &credentials, &form.slug).await {
        Ok(export) => export,
        Err(e) => return redirect_with_notice(jar, e),
    };

    let include_time = state.config.columns.include_time;
    let top: Vec<TopRow> = export
        .top
        .iter()
        .map(|entry| TopRow {
            rank: entry.rank,
            hacker: entry.hacker.clone(),
            score: format_score(entry.score),
            time_taken: include_time.then(|| format_elapsed_time(entry.time_taken)),
        })
        .collect();

    let data = json!({
        "contest_name": export.contest_name,
        "entry_count": export.entry_count,
        "include_time": include_time,
        "top3": top,
        "file_name": export.file_name,
        "download_url": format!("/download_file/{}", urlencoding::encode(&export.file_name)),
    });

    match render(&state, "top3", &data) {
        Ok(page) => page.into_response(),
        Err(e) => redirect_with_notice(jar, e),
    }
}

/// Send a generated report as an attachment
///
/// Under the delete-after-download policy the file is removed once the
/// body has been sent.
pub async fn handle_download(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AxumPath(file_name): AxumPath<String>,
) -> Response {
    let config = &state.config;
    let opened = files::open_download(&config.downloads_dir, &file_name, config.cleanup).await;

    let download = match opened {
        Ok(download) => download,
        Err(e) => return redirect_with_notice(jar, e),
    };

    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    let length = download.bytes.len();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(download.into_stream()),
    )
        .into_response()
}

async fn export_contest(
    state: &AppState,
    credentials: &Credentials,
    slug: &str,
) -> Result<Export> {
    let contests = state.client.list_contests(credentials).await?;
    let contest = contests
        .into_iter()
        .find(|contest| contest.slug == slug)
        .ok_or_else(|| AppError::ContestNotFound(slug.to_string()))?;

    let entries = state
        .client
        .fetch_full_leaderboard(credentials, &contest.slug)
        .await;

    let report = report::build_report(&entries, state.config.columns);
    let bytes = report.to_xlsx()?;

    let file_name = files::report_file_name(&contest);
    files::write_report(&bytes, &state.config.downloads_dir, &file_name)?;
    info!(
        "exported {} entries of {} to {}",
        entries.len(),
        contest.slug,
        file_name
    );

    Ok(Export {
        contest_name: files::report_stem(&contest),
        file_name,
        entry_count: entries.len(),
        top: report::select_top_n(&entries, TOP_N),
    })
}

fn render(state: &AppState, name: &str, data: &serde_json::Value) -> Result<Html<String>> {
    Ok(Html(state.templates.render(name, data)?))
}

/// Redirect to the entry page, carrying the error's notice in a flash cookie
fn redirect_with_notice(jar: SignedCookieJar, err: AppError) -> Response {
    if err.is_user_facing() {
        info!("{}", err);
    } else {
        error!("{}", err);
    }

    let cookie = Cookie::build((FLASH_COOKIE, urlencoding::encode(err.notice()).into_owned()))
        .path("/")
        .http_only(true);

    (jar.add(cookie), Redirect::to("/")).into_response()
}

fn internal_error(err: AppError) -> Response {
    error!("{}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.notice()).into_response()
}

/// Whole scores print without a trailing `.0`
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}
