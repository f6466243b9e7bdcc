// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Code::Stats API client and response model.
///
/// The client performs a single `GET /api/users/{username}` request and hands
/// the raw status and body back to the caller; interpreting the status is the
/// pipeline's job.
use std::{fmt, future::Future, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use masterror::AppError;
use reqwest::Client;
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, MapAccess, Visitor},
};
use serde_json::{Value, value::RawValue};
use tracing::{debug, info, trace};

use crate::{
    config::CodeStatsUser,
    error::Error,
    language::RawEntry,
    retry::{RetryConfig, retry_with_backoff},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10,);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Raw response returned by a [`StatsSource`].
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FetchResponse
{
    /// HTTP status code.
    pub status: u16,
    /// Response body, when one could be read.
    pub body:   Option<String,>,
}

impl FetchResponse
{
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self,) -> bool
    {
        (200..300).contains(&self.status,)
    }
}

/// Source of per-language statistics.
pub trait StatsSource
{
    /// Fetches the statistics document for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] for transport-level failures. Non-success HTTP
    /// statuses are reported through [`FetchResponse::status`].
    fn fetch(&self, user: &CodeStatsUser,)
    -> impl Future<Output = Result<FetchResponse, AppError,>,>;
}

/// HTTP implementation of [`StatsSource`] backed by `reqwest`.
#[derive(Debug, Clone,)]
pub struct CodeStatsClient
{
    client: Client,
    retry:  RetryConfig,
}

impl CodeStatsClient
{
    /// Builds a client with the default timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, AppError,>
    {
        Self::with_retry(RetryConfig::default(),)
    }

    /// Builds a client with a custom retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the HTTP client cannot be initialized.
    pub fn with_retry(retry: RetryConfig,) -> Result<Self, AppError,>
    {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT,)
            .user_agent(USER_AGENT,)
            .build()
            .map_err(|e| AppError::service(format!("failed to initialize HTTP client: {e}"),),)?;

        Ok(Self {
            client,
            retry,
        },)
    }

    async fn fetch_once(&self, url: &str,) -> Result<FetchResponse, AttemptError,>
    {
        let response = self.client.get(url,).send().await.map_err(AttemptError::Transport,)?;
        let status = response.status();
        let body = match response.text().await {
            Ok(body,) => Some(body,),
            Err(e,) => {
                debug!("Failed to read response body: {e}");
                None
            }
        };

        let fetched = FetchResponse {
            status: status.as_u16(),
            body,
        };

        if status.is_server_error() { Err(AttemptError::Server(fetched,),) } else { Ok(fetched,) }
    }
}

impl StatsSource for CodeStatsClient
{
    async fn fetch(&self, user: &CodeStatsUser,) -> Result<FetchResponse, AppError,>
    {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} [{elapsed_precise}] {msg}",)
                .unwrap_or_else(|_| ProgressStyle::default_spinner(),),
        );
        spinner.enable_steady_tick(Duration::from_millis(120,),);
        spinner.set_message(format!("Fetching statistics for {}...", user.username),);

        info!("Requesting {}", user.api_url);
        let outcome = retry_with_backoff(
            &self.retry,
            "Code::Stats request",
            || self.fetch_once(&user.api_url,),
            |_| true,
        )
        .await;
        spinner.finish_and_clear();

        match outcome {
            Ok(response,) => Ok(response,),
            Err(AttemptError::Server(response,),) => Ok(response,),
            Err(AttemptError::Transport(e,),) => {
                Err(AppError::service(format!("request to {} failed: {e}", user.api_url),),)
            }
        }
    }
}

/// Failure of a single request attempt. Both kinds are worth retrying.
#[derive(Debug,)]
enum AttemptError
{
    Transport(reqwest::Error,),
    Server(FetchResponse,),
}

impl fmt::Display for AttemptError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        match self {
            Self::Transport(e,) => write!(f, "{e}"),
            Self::Server(response,) => write!(f, "server responded with status {}", response.status),
        }
    }
}

/// Statistics document returned by `GET /api/users/{username}`.
///
/// Only `languages` is required. The summary fields are informational and
/// read as `None` when they carry an unexpected type.
#[derive(Debug, Clone, Deserialize,)]
pub struct CodeStatsProfile
{
    /// Account name echoed by the service.
    #[serde(default, deserialize_with = "lenient")]
    pub user:      Option<String,>,
    /// Total experience across all languages.
    #[serde(default, deserialize_with = "lenient")]
    pub total_xp:  Option<f64,>,
    /// Experience gained recently.
    #[serde(default, deserialize_with = "lenient")]
    pub new_xp:    Option<f64,>,
    /// Per-language records in document order.
    pub languages: LanguageTable,
}

/// Per-language records in the order they appear in the JSON document.
///
/// Repeated keys are kept as separate entries instead of overwriting each
/// other; ranking decides what to do with them. A record that cannot be
/// decoded, such as one holding an out-of-range number, becomes an entry
/// without a metric instead of failing the whole table.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct LanguageTable(pub Vec<RawEntry,>,);

impl LanguageTable
{
    /// Consumes the table, yielding raw entries.
    pub fn into_entries(self,) -> Vec<RawEntry,>
    {
        self.0
    }
}

impl<'de,> Deserialize<'de,> for LanguageTable
{
    fn deserialize<D,>(deserializer: D,) -> Result<Self, D::Error,>
    where
        D: Deserializer<'de,>,
    {
        struct TableVisitor;

        impl<'de,> Visitor<'de,> for TableVisitor
        {
            type Value = LanguageTable;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_,>,) -> fmt::Result
            {
                formatter.write_str("an object mapping language names to records",)
            }

            fn visit_map<A,>(self, mut map: A,) -> Result<Self::Value, A::Error,>
            where
                A: MapAccess<'de,>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0,),);
                while let Some((label, raw,),) = map.next_entry::<String, Box<RawValue,>>()? {
                    let record = serde_json::from_str::<Value,>(raw.get(),).unwrap_or_else(|e| {
                        trace!("Language '{label}' has an undecodable record: {e}");
                        Value::Null
                    },);
                    entries.push(RawEntry::from_record(label, &record,),);
                }
                Ok(LanguageTable(entries,),)
            }
        }

        deserializer.deserialize_map(TableVisitor,)
    }
}

/// Decodes an optional field, mapping values of the wrong type to `None`.
fn lenient<'de, D, T,>(deserializer: D,) -> Result<Option<T,>, D::Error,>
where
    D: Deserializer<'de,>,
    T: DeserializeOwned,
{
    let raw = Box::<RawValue,>::deserialize(deserializer,)?;
    Ok(serde_json::from_str::<Option<T,>>(raw.get(),).ok().flatten(),)
}

/// Decodes a statistics document.
///
/// # Errors
///
/// Returns [`Error::Payload`] when the body is not JSON or lacks a
/// `languages` object.
///
/// # Examples
///
/// ```
/// use codestats_readme::parse_profile;
///
/// let profile = parse_profile(r#"{"user":"dev","languages":{"Rust":{"xps":10}}}"#,)?;
/// assert_eq!(profile.languages.0.len(), 1);
/// # Ok::<(), codestats_readme::Error>(())
/// ```
pub fn parse_profile(body: &str,) -> Result<CodeStatsProfile, Error,>
{
    Ok(serde_json::from_str(body,)?,)
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    const SAMPLE: &str = r#"{
        "user": "testuser",
        "total_xp": 1234,
        "new_xp": 5,
        "machines": { "dev": { "xps": 1234, "new_xps": 5 } },
        "dates": { "2024-01-01": 1234 },
        "languages": {
            "Markdown": { "new_xps": 2, "xps": 220306 },
            "JavaScript": { "new_xps": 0, "xps": 188377 },
            "SQL": { "new_xps": 0, "xps": 360 }
        }
    }"#;

    #[test]
    fn parses_full_response_in_document_order()
    {
        let profile = parse_profile(SAMPLE,).expect("valid payload",);

        assert_eq!(profile.user.as_deref(), Some("testuser"));
        assert_eq!(profile.total_xp, Some(1234.0));
        assert_eq!(profile.new_xp, Some(5.0));
        let labels: Vec<&str,> = profile.languages.0.iter().map(|entry| entry.label.as_str(),).collect();
        assert_eq!(labels, vec!["Markdown", "JavaScript", "SQL"]);
        assert_eq!(profile.languages.0[0].metric, Some(json!(220306)));
    }

    #[test]
    fn empty_languages_object_is_accepted()
    {
        let profile = parse_profile(r#"{"user":"newuser","languages":{}}"#,).expect("valid payload",);
        assert!(profile.languages.0.is_empty());
    }

    #[test]
    fn duplicate_language_keys_are_preserved()
    {
        let profile =
            parse_profile(r#"{"languages":{"Rust":{"xps":1},"Go":{"xps":2},"Rust":{"xps":3}}}"#,)
                .expect("valid payload",);

        let entries = profile.languages.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], RawEntry::new("Rust", Some(json!(3)),));
    }

    #[test]
    fn malformed_language_records_are_kept_for_validation()
    {
        let profile =
            parse_profile(r#"{"languages":{"a":null,"b":{"xps":"x"},"c":{"level":2}}}"#,)
                .expect("valid payload",);

        let metrics: Vec<Option<Value,>,> =
            profile.languages.0.into_iter().map(|entry| entry.metric,).collect();
        assert_eq!(metrics, vec![None, Some(json!("x")), None]);
    }

    #[test]
    fn overflowing_metric_drops_only_its_entry()
    {
        let profile = parse_profile(r#"{"languages":{"a":{"xps":1e400},"b":{"xps":5}}}"#,)
            .expect("valid payload",);

        let entries = profile.languages.into_entries();
        assert_eq!(entries, vec![RawEntry::new("a", None,), RawEntry::new("b", Some(json!(5)),)]);

        let chart = crate::language::rank(entries, crate::language::DEFAULT_LIMIT,);
        assert_eq!(chart.labels(), vec!["b"]);
    }

    #[test]
    fn malformed_summary_fields_do_not_reject_payload()
    {
        let profile = parse_profile(r#"{"user":"u","total_xp":"lots","languages":{"b":{"xps":5}}}"#,)
            .expect("valid payload",);
        assert_eq!(profile.user.as_deref(), Some("u"));
        assert_eq!(profile.total_xp, None);
        assert_eq!(profile.languages.0.len(), 1);

        let profile =
            parse_profile(r#"{"user":42,"new_xp":[1],"total_xp":null,"languages":{"b":{"xps":5}}}"#,)
                .expect("valid payload",);
        assert_eq!(profile.user, None);
        assert_eq!(profile.new_xp, None);
        assert_eq!(profile.total_xp, None);
        assert_eq!(profile.languages.0.len(), 1);
    }

    #[test]
    fn missing_languages_is_a_payload_error()
    {
        let error = parse_profile(r#"{"user":"dev"}"#,).expect_err("expected error",);
        assert!(matches!(error, Error::Payload { .. }));
    }

    #[test]
    fn invalid_json_is_a_payload_error()
    {
        assert!(matches!(parse_profile("<html>"), Err(Error::Payload { .. })));
        assert!(matches!(parse_profile(r#"{"languages":[]}"#), Err(Error::Payload { .. })));
    }

    #[test]
    fn fetch_response_success_range()
    {
        let response = |status| FetchResponse {
            status,
            body: None,
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(199).is_success());
        assert!(!response(301).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn client_builds_with_default_policy()
    {
        let client = CodeStatsClient::new().expect("client builds",);
        assert_eq!(client.retry, RetryConfig::default());
    }
}
