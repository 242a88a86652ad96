/*!
# Leaderboard Export

A small web front-end that signs in to a contest platform's REST API,
pulls a contest's complete leaderboard and hands it back as an XLSX
spreadsheet.

## Overview

A user submits their platform credentials, picks one of the contests the
account administers, and gets a preview of the top three entries together
with a download link for the full export. Credentials are never stored;
they are passed through as HTTP basic auth on every API call.

## Architecture

### Leaderboard Client
- Lists administered contests (this call doubles as the credential check)
- Fetches a full leaderboard page by page until an empty page comes back

### Report Builder
- Lays leaderboard entries out as `Rank, Username, Score[, Time Taken]`
- Formats elapsed times as `H : M : S` / `M : S`
- Writes the workbook with `rust_xlsxwriter`

### File Lifecycle Manager
- Writes reports into a shared downloads directory
- Removes them after download, or sweeps stale ones on a timer,
  depending on the configured [`CleanupPolicy`]

### Web Layer
- axum routes for sign-in, export and download
- Flash notices carried across redirects in a signed cookie

## Modules

- **config**: process-wide settings
- **error**: shared error type
- **client**: contest platform client
- **report**: report layout and XLSX serialization
- **files**: downloads directory management
- **app**: router, shared state and server startup
- **handlers**: request handlers

## Endpoints

- `GET /` - Sign-in form
- `POST /` - Credential check and contest picker
- `POST /top3`, `POST /download` - Export a contest and preview its top three
- `GET /download_file/{file_name}` - Download a generated report
*/

pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod report;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod handlers;

/// Re-export the common types to make them easier to use
pub use client::{Contest, Credentials, LeaderboardClient, LeaderboardEntry};
pub use config::Config;
pub use error::AppError;
pub use files::CleanupPolicy;
pub use report::{Report, ReportColumns};
