// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// End-to-end refresh: fetch statistics, rank, render, splice, persist and
/// notify.
///
/// Every stage runs sequentially on the calling task. Fetch and payload
/// problems abort the run before the document is touched; document and
/// rendering problems are logged and the completion callback still fires.
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    chart::ChartRenderer,
    codestats::{StatsSource, parse_profile},
    config::{Config, GitSettings},
    error::{Error, io_error},
    git::{GitCommitResult, GitCommitter},
    language::{DEFAULT_LIMIT, RankedChart, RawEntry, rank},
    readme::{has_section, replace_section_bytes, section_footer, section_header},
};

/// What happened to the document during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document was rewritten with the new section.
    Written,
    /// The spliced document was identical to the original; nothing written.
    Unchanged,
    /// The document could not be read; it was left untouched.
    ReadFailed(String),
    /// The document is not valid UTF-8; it was left untouched.
    NotText,
    /// Writing the spliced document failed.
    WriteFailed(String)
}

impl WriteOutcome {
    /// Returns `true` when the document could not be read or written.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ReadFailed(_) | Self::NotText | Self::WriteFailed(_))
    }
}

/// Why a run stopped before touching the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The request never produced a response.
    Transport(String),
    /// The service answered with a non-success status.
    Status(u16),
    /// The response body could not be decoded.
    Payload(String)
}

/// Result of a single refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run stopped before the document stage; the callback did not fire.
    Skipped(SkipReason),
    /// The document stage ran and the callback fired once.
    Completed {
        /// Number of languages rendered.
        languages: usize,
        /// Document write result.
        write:     WriteOutcome
    }
}

/// Ranks raw entries and renders them, substituting an empty chart when the
/// renderer fails.
///
/// # Example
///
/// ```
/// use codestats_readme::{BarChart, RawEntry, build_chart};
/// use serde_json::json;
///
/// let text = build_chart(vec![RawEntry::new("Rust", Some(json!(-1)))], &BarChart::default(), 42);
/// assert_eq!(text, "");
/// ```
pub fn build_chart<I, R>(entries: I, renderer: &R, width: usize) -> String
where
    I: IntoIterator<Item = RawEntry>,
    R: ChartRenderer + ?Sized
{
    render_chart(&rank(entries, DEFAULT_LIMIT), renderer, width)
}

fn render_chart<R>(chart: &RankedChart, renderer: &R, width: usize) -> String
where
    R: ChartRenderer + ?Sized
{
    if chart.is_empty() {
        return String::new();
    }

    match renderer.render(chart, width) {
        Ok(text) => text,
        Err(e) => {
            warn!("Chart generation failed, using an empty chart: {e}");
            String::new()
        }
    }
}

/// Splices `chart` into the configured document and writes it back.
///
/// Never fails: every problem is logged and reflected in the returned
/// [`WriteOutcome`].
pub async fn update_readme(config: &Config, chart: &str) -> WriteOutcome {
    let path = config.readme_file.as_path();
    info!("Reading README from {}", path.display());

    let original = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(source) => {
            let failure = io_error(path, source);
            error!("Error reading README file: {failure}");
            return WriteOutcome::ReadFailed(failure.to_display_string());
        }
    };

    let header = if config.show.title {
        section_header(Utc::now())
    } else {
        String::new()
    };
    let footer = if config.show.link {
        section_footer(&config.codestats.profile_url)
    } else {
        String::new()
    };

    let updated = replace_section_bytes(&original, chart, &header, &footer);
    if updated.is_empty() && !original.is_empty() {
        error!(
            "README at {} is not UTF-8 text; leaving it untouched",
            path.display()
        );
        return WriteOutcome::NotText;
    }

    if updated.as_bytes() == original.as_slice() {
        if !has_section(&updated) {
            warn!(
                "No codestats section markers found in {}",
                path.display()
            );
        }
        info!("No changes to README");
        return WriteOutcome::Unchanged;
    }

    info!("Writing updated README to {}", path.display());
    match tokio::fs::write(path, updated).await {
        Ok(()) => {
            info!("README updated successfully");
            WriteOutcome::Written
        }
        Err(source) => {
            let failure = io_error(path, source);
            error!("Error writing README file: {failure}");
            WriteOutcome::WriteFailed(failure.to_display_string())
        }
    }
}

/// Runs one refresh.
///
/// `on_complete` is invoked exactly once after the document write attempt,
/// whatever its outcome, and never when the run is skipped.
///
/// # Example
///
/// ```no_run
/// use codestats_readme::{BarChart, CodeStatsClient, Config, ConfigInputs, run};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_inputs(ConfigInputs {
///     username: Some("octocat"),
///     ..ConfigInputs::default()
/// })?;
/// let client = CodeStatsClient::new()?;
/// let outcome = run(&config, &client, &BarChart::default(), |write| {
///     println!("document: {write:?}");
/// })
/// .await;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
pub async fn run<S, R, F>(config: &Config, source: &S, renderer: &R, on_complete: F) -> RunOutcome
where
    S: StatsSource + ?Sized,
    R: ChartRenderer + ?Sized,
    F: FnOnce(&WriteOutcome)
{
    let response = match source.fetch(&config.codestats).await {
        Ok(response) => response,
        Err(e) => {
            error!("API request failed: {e}");
            return RunOutcome::Skipped(SkipReason::Transport(e.to_string()));
        }
    };

    if !response.is_success() {
        error!("API request failed with status: {}", response.status);
        return RunOutcome::Skipped(SkipReason::Status(response.status));
    }

    let profile = match response
        .body
        .as_deref()
        .ok_or(Error::EmptyPayload)
        .and_then(parse_profile)
    {
        Ok(profile) => profile,
        Err(e) => {
            error!("Error parsing API response: {e}");
            return RunOutcome::Skipped(SkipReason::Payload(e.to_display_string()));
        }
    };

    debug!(
        "Received {} language records for {}",
        profile.languages.0.len(),
        profile.user.as_deref().unwrap_or(&config.codestats.username)
    );

    let chart = rank(profile.languages.into_entries(), DEFAULT_LIMIT);
    let languages = chart.len();
    let text = render_chart(&chart, renderer, config.graph_width);

    let write = update_readme(config, &text).await;
    on_complete(&write);

    RunOutcome::Completed {
        languages,
        write
    }
}

/// Decides whether the commit step should run for `outcome`.
///
/// With `commit_on_write_failure` set the commit proceeds regardless of the
/// write outcome, matching the action's historical behaviour.
pub fn should_commit(git: &GitSettings, outcome: &WriteOutcome) -> bool {
    git.enabled && (git.commit_on_write_failure || !outcome.is_failure())
}

/// Completion step: commits and pushes the document when policy allows.
///
/// Commit failures are logged and swallowed.
pub fn commit_changes(
    config: &Config,
    committer: &GitCommitter,
    outcome: &WriteOutcome
) -> Option<GitCommitResult> {
    if !should_commit(&config.git, outcome) {
        info!("Skipping commit (document outcome: {outcome:?})");
        return None;
    }

    match committer.commit_and_push(&config.readme_file, &config.git.message, &config.git.author) {
        Ok(result) => Some(result),
        Err(e) => {
            error!("Git operations failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, fs, path::Path};

    use masterror::AppError;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        chart::BarChart,
        codestats::FetchResponse,
        config::{CodeStatsUser, ConfigInputs}
    };

    const TEMPLATE: &str =
        "# Profile\n<!-- START_SECTION:codestats -->\nold chart\n<!-- END_SECTION:codestats -->\nFooter text\n";

    enum Stub {
        Respond(u16, Option<String>),
        Fail(&'static str)
    }

    impl StatsSource for Stub {
        async fn fetch(&self, _user: &CodeStatsUser) -> Result<FetchResponse, AppError> {
            match self {
                Self::Respond(status, body) => Ok(FetchResponse {
                    status: *status,
                    body:   body.clone()
                }),
                Self::Fail(message) => Err(AppError::service(*message))
            }
        }
    }

    struct Failing;

    impl ChartRenderer for Failing {
        fn render(&self, _chart: &RankedChart, _width: usize) -> Result<String, AppError> {
            Err(AppError::service("renderer exploded"))
        }
    }

    fn config_for(path: &Path) -> Config {
        Config::from_inputs(ConfigInputs {
            username: Some("tester"),
            readme_file: path.to_str(),
            ..ConfigInputs::default()
        })
        .expect("valid config")
    }

    fn ok_body(languages: serde_json::Value) -> Stub {
        Stub::Respond(
            200,
            Some(json!({ "user": "tester", "languages": languages }).to_string())
        )
    }

    fn scenario_entries() -> Vec<RawEntry> {
        [
            ("js", 100),
            ("ts", 220),
            ("py", 50),
            ("go", 120),
            ("rs", 90),
            ("rb", 80),
            ("php", 70),
            ("java", 30)
        ]
        .into_iter()
        .map(|(label, xps)| RawEntry::from_record(label, &json!({ "xps": xps })))
        .collect()
    }

    #[test]
    fn build_chart_keeps_top_languages() {
        let chart = build_chart(scenario_entries(), &BarChart::default(), 20);

        let labels: Vec<&str> = chart
            .lines()
            .map(|line| line.split('|').next().unwrap_or_default().trim())
            .collect();
        assert_eq!(labels, vec!["ts", "go", "js", "rs", "rb", "php"]);
        assert!(!chart.contains("java"));
        assert!(!chart.contains("py"));
    }

    #[test]
    fn build_chart_without_valid_entries_is_empty() {
        let entries = vec![
            RawEntry::new("a", Some(json!(-5))),
            RawEntry::new("b", Some(json!("x"))),
            RawEntry::new("c", Some(json!(null)))
        ];
        assert_eq!(build_chart(entries, &BarChart::default(), 42), "");
    }

    #[test]
    fn renderer_failure_yields_empty_chart() {
        assert_eq!(build_chart(scenario_entries(), &Failing, 42), "");
    }

    #[tokio::test]
    async fn successful_run_rewrites_section_and_notifies_once() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let config = config_for(&path);
        let calls = Cell::new(0);

        let outcome = run(
            &config,
            &ok_body(json!({ "Rust": { "xps": 300 }, "Go": { "xps": 100 } })),
            &BarChart::default(),
            |write| {
                assert_eq!(write, &WriteOutcome::Written);
                calls.set(calls.get() + 1);
            }
        )
        .await;

        assert_eq!(outcome, RunOutcome::Completed {
            languages: 2,
            write:     WriteOutcome::Written
        });
        assert_eq!(calls.get(), 1);

        let updated = fs::read_to_string(&path).expect("failed to read README");
        assert!(updated.starts_with("# Profile\n"));
        assert!(updated.ends_with("\nFooter text\n"));
        assert!(!updated.contains("old chart"));
        assert!(updated.contains("```text\n  Rust | "));
        assert!(updated.contains("    Go | "));
    }

    #[tokio::test]
    async fn header_and_footer_follow_configuration() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let mut config = config_for(&path);
        config.show.title = true;
        config.show.link = true;

        run(&config, &ok_body(json!({ "Rust": { "xps": 1 } })), &BarChart::default(), |_| {}).await;

        let updated = fs::read_to_string(&path).expect("failed to read README");
        assert!(updated.contains(
            "<!-- START_SECTION:codestats -->\n*Language experience level (Last update "
        ));
        assert!(updated.contains(
            "```\n\n> My [CodeStats profile](https://codestats.net/users/tester) in detail.\n<!-- END_SECTION:codestats -->"
        ));
    }

    #[tokio::test]
    async fn no_valid_languages_leaves_empty_fenced_block() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let config = config_for(&path);

        let outcome = run(
            &config,
            &ok_body(json!({ "a": { "xps": -5 }, "b": { "xps": "x" }, "c": null })),
            &BarChart::default(),
            |_| {}
        )
        .await;

        assert_eq!(outcome, RunOutcome::Completed {
            languages: 0,
            write:     WriteOutcome::Written
        });
        let updated = fs::read_to_string(&path).expect("failed to read README");
        assert!(updated.contains(
            "<!-- START_SECTION:codestats -->\n```text\n```\n<!-- END_SECTION:codestats -->"
        ));
    }

    #[tokio::test]
    async fn non_success_status_skips_document_and_callback() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let config = config_for(&path);
        let calls = Cell::new(0);

        let outcome = run(
            &config,
            &Stub::Respond(404, Some("{}".to_owned())),
            &BarChart::default(),
            |_| calls.set(calls.get() + 1)
        )
        .await;

        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::Status(404)));
        assert_eq!(calls.get(), 0);
        assert_eq!(fs::read_to_string(&path).expect("read"), TEMPLATE);
    }

    #[tokio::test]
    async fn transport_failure_skips_run() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let config = config_for(&path);
        let calls = Cell::new(0);

        let outcome = run(&config, &Stub::Fail("connection refused"), &BarChart::default(), |_| {
            calls.set(calls.get() + 1)
        })
        .await;

        assert!(matches!(outcome, RunOutcome::Skipped(SkipReason::Transport(_))));
        assert_eq!(calls.get(), 0);
        assert_eq!(fs::read_to_string(&path).expect("read"), TEMPLATE);
    }

    #[tokio::test]
    async fn malformed_payload_skips_run() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let config = config_for(&path);

        for stub in [
            Stub::Respond(200, Some("not json".to_owned())),
            Stub::Respond(200, Some(r#"{"user":"x"}"#.to_owned())),
            Stub::Respond(200, None)
        ] {
            let calls = Cell::new(0);
            let outcome = run(&config, &stub, &BarChart::default(), |_| {
                calls.set(calls.get() + 1)
            })
            .await;

            assert!(matches!(outcome, RunOutcome::Skipped(SkipReason::Payload(_))));
            assert_eq!(calls.get(), 0);
        }
        assert_eq!(fs::read_to_string(&path).expect("read"), TEMPLATE);
    }

    #[tokio::test]
    async fn missing_document_still_notifies() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("MISSING.md");
        let config = config_for(&path);
        let seen = Cell::new(false);

        let outcome = run(&config, &ok_body(json!({ "Rust": { "xps": 1 } })), &BarChart::default(), |write| {
            assert!(matches!(write, WriteOutcome::ReadFailed(_)));
            seen.set(true);
        })
        .await;

        assert!(seen.get());
        assert!(matches!(outcome, RunOutcome::Completed {
            write: WriteOutcome::ReadFailed(_),
            ..
        }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn document_without_markers_is_unchanged() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, "# Nothing to replace\n").expect("failed to write README");
        let config = config_for(&path);

        let write = update_readme(&config, "chart\n").await;

        assert_eq!(write, WriteOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).expect("read"), "# Nothing to replace\n");
    }

    #[tokio::test]
    async fn non_utf8_document_is_left_untouched() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        let bytes = [0x23, 0x20, 0xff, 0xfe, 0x0a];
        fs::write(&path, bytes).expect("failed to write README");
        let config = config_for(&path);

        let write = update_readme(&config, "chart\n").await;

        assert_eq!(write, WriteOutcome::NotText);
        assert_eq!(fs::read(&path).expect("read"), bytes);
    }

    #[tokio::test]
    async fn unreadable_document_path_still_notifies() {
        let dir = tempdir().expect("failed to create tempdir");
        let config = config_for(dir.path());
        let seen = Cell::new(false);

        let outcome = run(&config, &ok_body(json!({ "Rust": { "xps": 1 } })), &BarChart::default(), |write| {
            assert!(write.is_failure());
            seen.set(true);
        })
        .await;

        assert!(seen.get());
        assert!(matches!(outcome, RunOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn write_failure_still_notifies_once() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("README.md");
        fs::write(&path, TEMPLATE).expect("failed to write README");
        let mut permissions = fs::metadata(&path).expect("metadata").permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).expect("failed to set permissions");
        if fs::OpenOptions::new().write(true).open(&path).is_ok() {
            // Privileged users ignore file permissions.
            return;
        }
        let config = config_for(&path);
        let calls = Cell::new(0);

        let outcome = run(&config, &ok_body(json!({ "Rust": { "xps": 1 } })), &BarChart::default(), |write| {
            assert!(matches!(write, WriteOutcome::WriteFailed(_)));
            assert!(should_commit(&config.git, write));
            calls.set(calls.get() + 1);
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(outcome, RunOutcome::Completed {
            languages: 1,
            write: WriteOutcome::WriteFailed(_)
        }));
        assert_eq!(fs::read_to_string(&path).expect("read"), TEMPLATE);
    }

    #[test]
    fn commit_policy_proceeds_regardless_of_write_outcome_by_default() {
        let config = config_for(Path::new("README.md"));

        assert!(should_commit(&config.git, &WriteOutcome::Written));
        assert!(should_commit(&config.git, &WriteOutcome::Unchanged));
        assert!(should_commit(&config.git, &WriteOutcome::WriteFailed("disk full".to_owned())));
        assert!(should_commit(&config.git, &WriteOutcome::ReadFailed("missing".to_owned())));
    }

    #[test]
    fn commit_policy_can_require_successful_write() {
        let mut config = config_for(Path::new("README.md"));
        config.git.commit_on_write_failure = false;

        assert!(should_commit(&config.git, &WriteOutcome::Written));
        assert!(should_commit(&config.git, &WriteOutcome::Unchanged));
        assert!(!should_commit(&config.git, &WriteOutcome::WriteFailed("disk full".to_owned())));
        assert!(!should_commit(&config.git, &WriteOutcome::NotText));
    }

    #[test]
    fn disabled_commit_never_runs() {
        let mut config = config_for(Path::new("README.md"));
        config.git.enabled = false;

        assert!(!should_commit(&config.git, &WriteOutcome::Written));
        assert_eq!(
            commit_changes(&config, &GitCommitter::new(), &WriteOutcome::Written),
            None
        );
    }
}
