use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{AppError, Result};

/// A contest as listed by the platform's administration endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    /// Unique short identifier, used in leaderboard URLs
    pub slug: String,

    /// Display name, also the basis of the report file name
    pub name: String,
}

/// One participant's row in a contest leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(deserialize_with = "de_rank")]
    pub rank: u32,

    /// Username
    pub hacker: String,

    #[serde(default, deserialize_with = "de_score")]
    pub score: f64,

    /// Elapsed time in whole seconds
    #[serde(default, deserialize_with = "de_seconds")]
    pub time_taken: u64,
}

/// Basic-auth pair passed straight through to the platform
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The `{status, models}` wrapper both endpoints respond with
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: bool,
    #[serde(default = "Vec::new")]
    models: Vec<T>,
}

/// Read-only client for the contest platform's REST API
#[derive(Debug, Clone)]
pub struct LeaderboardClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl LeaderboardClient {
    /// Create a client rooted at `base_url` (e.g. `https://www.hackerrank.com/rest`)
    pub fn new(base_url: impl Into<String>, page_size: u32, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {}", e)))?;

        Ok(LeaderboardClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        })
    }

    /// List the contests administered by the account
    ///
    /// Doubles as the credential check. The platform's signaling is coarse, so
    /// a transport failure, a non-success status, an undecodable body and a
    /// falsy `status` flag all collapse to the same error.
    ///
    /// # Arguments
    /// * `credentials` - Platform email and password, sent as basic auth
    ///
    /// # Returns
    /// * `Result<Vec<Contest>>` - The first page (up to `page_size`) of contests,
    ///   or [`AppError::Auth`]
    ///
    /// # Examples
    /// ```no_run
    /// use leaderboard_export::{Credentials, LeaderboardClient};
    /// use std::time::Duration;
    ///
    /// # async fn demo() -> leaderboard_export::error::Result<()> {
    /// let client = LeaderboardClient::new("https://www.hackerrank.com/rest", 100, Duration::from_secs(30))?;
    /// let contests = client.list_contests(&Credentials::new("me@example.com", "pw")).await?;
    /// for contest in contests {
    ///     println!("{} ({})", contest.name, contest.slug);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_contests(&self, credentials: &Credentials) -> Result<Vec<Contest>> {
        let url = format!("{}/administration/contests", self.base_url);

        let envelope: Envelope<Contest> = match self.get_page(&url, credentials, 0).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return Err(AppError::Auth),
            Err(e) => {
                info!("contest listing failed for {}: {}", credentials.email, e);
                return Err(AppError::Auth);
            }
        };

        if !envelope.status {
            return Err(AppError::Auth);
        }

        debug!(
            "listed {} contests for {}",
            envelope.models.len(),
            credentials.email
        );
        Ok(envelope.models)
    }

    /// Fetch every leaderboard page for `slug`
    ///
    /// Pages are requested until one comes back empty. A non-success status or
    /// a failed request ends the loop and whatever was accumulated so far is
    /// returned; there are no retries. Rows are decoded one by one, so a single
    /// malformed row is logged and skipped without ending the fetch.
    ///
    /// # Arguments
    /// * `credentials` - Platform email and password, sent as basic auth
    /// * `slug` - The contest's short identifier
    ///
    /// # Returns
    /// * `Vec<LeaderboardEntry>` - Entries in the order the API paginated them
    ///
    /// # Examples
    /// ```no_run
    /// use leaderboard_export::{Credentials, LeaderboardClient};
    /// use std::time::Duration;
    ///
    /// # async fn demo() -> leaderboard_export::error::Result<()> {
    /// let client = LeaderboardClient::new("https://www.hackerrank.com/rest", 100, Duration::from_secs(30))?;
    /// let creds = Credentials::new("me@example.com", "pw");
    /// let entries = client.fetch_full_leaderboard(&creds, "spring-cup").await;
    /// println!("{} entries", entries.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_full_leaderboard(
        &self,
        credentials: &Credentials,
        slug: &str,
    ) -> Vec<LeaderboardEntry> {
        let url = format!("{}/contests/{}/leaderboard", self.base_url, slug);
        let mut entries = Vec::new();
        let mut offset = 0u32;

        loop {
            // Rows stay raw JSON here so one bad row cannot sink the page
            let page: Envelope<serde_json::Value> =
                match self.get_page(&url, credentials, offset).await {
                    Ok(Some(page)) => page,
                    Ok(None) => {
                        warn!(
                            "leaderboard for {} stopped at offset {} after a non-success status, {} entries kept",
                            slug,
                            offset,
                            entries.len()
                        );
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "leaderboard for {} stopped at offset {}: {}, {} entries kept",
                            slug,
                            offset,
                            e,
                            entries.len()
                        );
                        break;
                    }
                };

            if page.models.is_empty() {
                break;
            }

            debug!(
                "leaderboard {} offset {}: {} entries",
                slug,
                offset,
                page.models.len()
            );

            for (i, row) in page.models.into_iter().enumerate() {
                match serde_json::from_value::<LeaderboardEntry>(row) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!(
                        "leaderboard {} skipped row {}: {}",
                        slug,
                        offset as usize + i,
                        e
                    ),
                }
            }
            offset += self.page_size;
        }

        entries
    }

    /// GET one page; `Ok(None)` for a non-success status
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        credentials: &Credentials,
        offset: u32,
    ) -> Result<Option<Envelope<T>>, reqwest::Error> {
        let response = self
            .http
            .get(url)
            .query(&[("offset", offset), ("limit", self.page_size)])
            .basic_auth(&credentials.email, Some(&credentials.password))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("{} returned {}", url, response.status());
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }
}

/// Ranks come back as numbers, but some payloads carry them as strings
fn de_rank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rank {
        Number(f64),
        Text(String),
    }

    match Rank::deserialize(deserializer)? {
        Rank::Number(n) if n >= 0.0 => Ok(n as u32),
        Rank::Number(n) => Err(de::Error::custom(format!("negative rank {}", n))),
        Rank::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid rank `{}`", s))),
    }
}

/// Scores may be null for participants without a submission
fn de_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(0.0))
}

/// Elapsed time may be fractional or null; keep whole seconds
fn de_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| v.max(0.0) as u64).unwrap_or(0))
}
