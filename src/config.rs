// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Runtime configuration assembled once at startup.
//!
//! Raw inputs arrive as optional strings (environment variables or CLI flags)
//! and are normalized into an immutable [`Config`]. Empty strings are treated
//! as absent so workflow inputs left blank fall back to their defaults. No
//! other module reads process state; the value is passed by reference.

use std::path::PathBuf;

use crate::{chart::DEFAULT_WIDTH, error::Error};

/// Base URL of the Code::Stats service.
pub const CODESTATS_BASE_URL: &str = "https://codestats.net";
/// Document updated when no path is configured.
pub const DEFAULT_README_FILE: &str = "./README.md";
/// Commit author used when no identity is configured.
pub const DEFAULT_GIT_AUTHOR: &str = "CodeStats bot";
/// Commit message used when no override is configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update codestats metrics";

/// Code::Stats account the chart is rendered for.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct CodeStatsUser
{
    /// Account name.
    pub username:    String,
    /// JSON API endpoint for the account.
    pub api_url:     String,
    /// Public profile page for the account.
    pub profile_url: String,
}

impl CodeStatsUser
{
    /// Derives API and profile URLs for `username` under `base_url`.
    pub fn new(username: &str, base_url: &str,) -> Self
    {
        let base = base_url.trim_end_matches('/',);
        Self {
            username:    username.to_owned(),
            api_url:     format!("{base}/api/users/{username}"),
            profile_url: format!("{base}/users/{username}"),
        }
    }
}

/// Settings for the commit step.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct GitSettings
{
    /// Author identity attached to the commit.
    pub author:                  String,
    /// Commit message.
    pub message:                 String,
    /// Whether the commit step runs at all.
    pub enabled:                 bool,
    /// Whether the commit still runs when the document could not be read or
    /// written.
    pub commit_on_write_failure: bool,
}

/// Optional decorations around the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default,)]
pub struct ShowSettings
{
    /// Emit the "last update" header.
    pub title: bool,
    /// Emit the profile link footer.
    pub link:  bool,
}

/// Immutable configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Config
{
    /// Account whose statistics are rendered.
    pub codestats:   CodeStatsUser,
    /// Commit step settings.
    pub git:         GitSettings,
    /// Chart width in character cells.
    pub graph_width: usize,
    /// Document holding the generated section.
    pub readme_file: PathBuf,
    /// Chart decorations.
    pub show:        ShowSettings,
    /// Verbose diagnostics.
    pub debug:       bool,
}

/// Raw, unvalidated configuration inputs.
///
/// Every field mirrors one environment variable; `None` and `Some("")` both
/// mean "not provided".
#[derive(Debug, Clone, Copy, Default,)]
pub struct ConfigInputs<'input,>
{
    /// `INPUT_CODESTATS_USERNAME`
    pub username:                Option<&'input str,>,
    /// `INPUT_README_FILE`
    pub readme_file:             Option<&'input str,>,
    /// `GITHUB_ACTOR`
    pub git_author:              Option<&'input str,>,
    /// `INPUT_COMMIT_MESSAGE`
    pub commit_message:          Option<&'input str,>,
    /// `INPUT_GRAPH_WIDTH`
    pub graph_width:             Option<&'input str,>,
    /// `INPUT_SHOW_TITLE`
    pub show_title:              Option<&'input str,>,
    /// `INPUT_SHOW_LINK`
    pub show_link:               Option<&'input str,>,
    /// `INPUT_DEBUG`; any value except `false`/`0`/`no`, including an empty
    /// one, enables debug output.
    pub debug:                   Option<&'input str,>,
    /// `INPUT_COMMIT`
    pub commit:                  Option<&'input str,>,
    /// `INPUT_COMMIT_ON_WRITE_FAILURE`
    pub commit_on_write_failure: Option<&'input str,>,
}

impl Config
{
    /// Normalizes raw inputs into a configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the username is missing or unusable in a
    /// URL, or when a boolean toggle holds something other than
    /// `true`/`false`/`1`/`0`/`yes`/`no`.
    ///
    /// # Examples
    ///
    /// ```
    /// use codestats_readme::{Config, ConfigInputs};
    ///
    /// let config = Config::from_inputs(ConfigInputs {
    ///     username: Some("octocat",),
    ///     ..ConfigInputs::default()
    /// },)?;
    /// assert_eq!(config.codestats.api_url, "https://codestats.net/api/users/octocat");
    /// assert_eq!(config.graph_width, 42);
    /// # Ok::<(), codestats_readme::Error>(())
    /// ```
    pub fn from_inputs(inputs: ConfigInputs<'_,>,) -> Result<Self, Error,>
    {
        let username = provided(inputs.username,)
            .ok_or_else(|| Error::config("CODESTATS_USERNAME has to be set",),)?;
        validate_username(username,)?;

        let readme_file = provided(inputs.readme_file,).unwrap_or(DEFAULT_README_FILE,);
        let author = provided(inputs.git_author,).unwrap_or(DEFAULT_GIT_AUTHOR,);
        let message = provided(inputs.commit_message,).unwrap_or(DEFAULT_COMMIT_MESSAGE,);

        Ok(Self {
            codestats:   CodeStatsUser::new(username, CODESTATS_BASE_URL,),
            git:         GitSettings {
                author:                  author.to_owned(),
                message:                 message.to_owned(),
                enabled:                 parse_flag("COMMIT", inputs.commit, true,)?,
                commit_on_write_failure: parse_flag(
                    "COMMIT_ON_WRITE_FAILURE",
                    inputs.commit_on_write_failure,
                    true,
                )?,
            },
            graph_width: parse_width(inputs.graph_width,),
            readme_file: PathBuf::from(readme_file,),
            show:        ShowSettings {
                title: parse_flag("SHOW_TITLE", inputs.show_title, false,)?,
                link:  parse_flag("SHOW_LINK", inputs.show_link, false,)?,
            },
            debug:       inputs.debug.is_some_and(|raw| {
                !matches!(raw.trim().to_lowercase().as_str(), "false" | "0" | "no")
            },),
        },)
    }
}

fn provided(value: Option<&str,>,) -> Option<&str,>
{
    value.map(str::trim,).filter(|value| !value.is_empty(),)
}

fn validate_username(username: &str,) -> Result<(), Error,>
{
    if username.chars().any(|ch| ch.is_whitespace() || matches!(ch, '/' | '?' | '#' | '%'),) {
        return Err(Error::config(format!(
            "CODESTATS_USERNAME '{username}' contains characters not allowed in a URL path"
        ),),);
    }
    Ok((),)
}

/// Parses the chart width; missing, non-numeric or zero values fall back to
/// [`DEFAULT_WIDTH`].
fn parse_width(value: Option<&str,>,) -> usize
{
    provided(value,)
        .and_then(|raw| raw.parse::<usize>().ok(),)
        .filter(|width| *width > 0,)
        .unwrap_or(DEFAULT_WIDTH,)
}

fn parse_flag(name: &str, value: Option<&str,>, default: bool,) -> Result<bool, Error,>
{
    let Some(raw,) = value else {
        return Ok(default,);
    };

    match raw.trim().to_lowercase().as_str() {
        "" => Ok(default,),
        "true" | "1" | "yes" => Ok(true,),
        "false" | "0" | "no" => Ok(false,),
        _ => Err(Error::config(format!("{name} must be a boolean value, got '{raw}'"),),),
    }
}
