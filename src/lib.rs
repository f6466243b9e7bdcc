//! Renders Code::Stats language experience as a bar chart inside a README.
//!
//! The library fetches per-language statistics, keeps the six languages with
//! the most experience, renders them as a horizontal bar chart and splices the
//! chart into the `<!-- START_SECTION:codestats -->` /
//! `<!-- END_SECTION:codestats -->` region of a Markdown document. A
//! completion hook lets the binary commit and push the refreshed document.

mod chart;
mod codestats;
mod config;
mod error;
mod git;
mod language;
mod pipeline;
mod readme;
mod retry;

pub use chart::{BAR_CHARACTER, BarChart, ChartRenderer, DEFAULT_WIDTH};
pub use codestats::{
    CodeStatsClient, CodeStatsProfile, FetchResponse, LanguageTable, StatsSource, parse_profile,
};
pub use config::{
    CODESTATS_BASE_URL, CodeStatsUser, Config, ConfigInputs, DEFAULT_COMMIT_MESSAGE,
    DEFAULT_GIT_AUTHOR, DEFAULT_README_FILE, GitSettings, ShowSettings,
};
pub use error::{Error, io_error};
pub use git::{GitCommitResult, GitCommitter, author_identity};
pub use language::{
    DEFAULT_LIMIT, EntryVerdict, LanguageMetric, METRIC_FIELD, RankedChart, RawEntry, RejectReason,
    classify, rank, validate_metric,
};
pub use pipeline::{
    RunOutcome, SkipReason, WriteOutcome, build_chart, commit_changes, run, should_commit,
    update_readme,
};
pub use readme::{
    END_MARKER, START_MARKER, has_section, replace_section, replace_section_bytes, section_footer,
    section_header,
};
pub use retry::{RetryConfig, retry_with_backoff};
