// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Command-line interface for the codestats README updater.
//!
//! Every option can be supplied either as a flag or through the environment
//! variables a GitHub Action exposes to its entrypoint. Only a configuration
//! error terminates the process with a failure status; fetch, document and
//! git problems are logged and the run ends normally.

use std::process;

use clap::Parser;
use codestats_readme::{
    BarChart, CodeStatsClient, Config, ConfigInputs, Error, GitCommitter, RunOutcome, SkipReason,
    commit_changes, run,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Refresh the Code::Stats chart embedded in a README.
#[derive(Debug, Parser, Default,)]
#[command(name = "codestats-readme", version, about = "Render Code::Stats experience into a README")]
struct Cli
{
    /// Code::Stats account to render.
    #[arg(long = "username", env = "INPUT_CODESTATS_USERNAME", value_name = "USER")]
    username: Option<String,>,

    /// Markdown document holding the codestats section.
    #[arg(long = "readme", env = "INPUT_README_FILE", value_name = "PATH")]
    readme_file: Option<String,>,

    /// Commit author name.
    #[arg(long = "author", env = "GITHUB_ACTOR", value_name = "NAME")]
    git_author: Option<String,>,

    /// Commit message used for the refresh.
    #[arg(long = "commit-message", env = "INPUT_COMMIT_MESSAGE", value_name = "TEXT")]
    commit_message: Option<String,>,

    /// Chart width in character cells.
    #[arg(long = "graph-width", env = "INPUT_GRAPH_WIDTH", value_name = "CELLS")]
    graph_width: Option<String,>,

    /// Emit the "last update" header above the chart.
    #[arg(
        long = "show-title",
        env = "INPUT_SHOW_TITLE",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    show_title: Option<String,>,

    /// Emit the profile link below the chart.
    #[arg(
        long = "show-link",
        env = "INPUT_SHOW_LINK",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    show_link: Option<String,>,

    /// Verbose diagnostics.
    #[arg(
        long = "debug",
        env = "INPUT_DEBUG",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    debug: Option<String,>,

    /// Commit and push the refreshed document.
    #[arg(long = "commit", env = "INPUT_COMMIT", value_name = "BOOL")]
    commit: Option<String,>,

    /// Commit even when the document could not be read or written.
    #[arg(
        long = "commit-on-write-failure",
        env = "INPUT_COMMIT_ON_WRITE_FAILURE",
        value_name = "BOOL"
    )]
    commit_on_write_failure: Option<String,>,
}

impl Cli
{
    fn inputs(&self,) -> ConfigInputs<'_,>
    {
        ConfigInputs {
            username:                self.username.as_deref(),
            readme_file:             self.readme_file.as_deref(),
            git_author:              self.git_author.as_deref(),
            commit_message:          self.commit_message.as_deref(),
            graph_width:             self.graph_width.as_deref(),
            show_title:              self.show_title.as_deref(),
            show_link:               self.show_link.as_deref(),
            debug:                   self.debug.as_deref(),
            commit:                  self.commit.as_deref(),
            commit_on_write_failure: self.commit_on_write_failure.as_deref(),
        }
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    if let Err(error,) = execute(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Builds the configuration and performs one refresh.
///
/// # Errors
///
/// Returns [`Error::Config`] before any network activity when the inputs are
/// invalid, or a service error when the HTTP client cannot be created.
async fn execute(cli: Cli,) -> Result<(), Error,>
{
    let config = Config::from_inputs(cli.inputs(),)?;
    init_tracing(config.debug,);

    let client = CodeStatsClient::new()?;
    let committer = GitCommitter::new().verbose(config.debug,);

    let outcome = run(&config, &client, &BarChart::default(), |write| {
        if let Some(result,) = commit_changes(&config, &committer, write,) {
            info!("Git: committed={} pushed={}", result.committed, result.pushed);
        }
    },)
    .await;

    report(&outcome,);
    Ok((),)
}

fn init_tracing(debug: bool,)
{
    let fallback = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback,),);

    // A subscriber may already be installed when embedded in another process.
    let _ = tracing_subscriber::fmt().with_env_filter(filter,).with_target(false,).try_init();
}

fn report(outcome: &RunOutcome,)
{
    match outcome {
        RunOutcome::Skipped(SkipReason::Transport(message,),) => {
            warn!("Run skipped, request failed: {message}");
        }
        RunOutcome::Skipped(SkipReason::Status(status,),) => {
            warn!("Run skipped, service answered with status {status}");
        }
        RunOutcome::Skipped(SkipReason::Payload(message,),) => {
            warn!("Run skipped, unreadable response: {message}");
        }
        RunOutcome::Completed {
            languages,
            write,
        } => {
            info!("Rendered {languages} languages, document: {write:?}");
        }
    }
}
