// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Git operations for committing and pushing the refreshed README.
///
/// Failures are reported to the caller, which logs them; nothing here
/// retries.
use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use masterror::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const NOREPLY_DOMAIN: &str = "users.noreply.github.com";

/// Result of the commit-and-push step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct GitCommitResult
{
    /// Whether a commit was created.
    pub committed: bool,
    /// Whether the commit was pushed to the remote.
    pub pushed:    bool,
}

/// Commits a single file and pushes it to the tracked remote branch.
#[derive(Debug, Clone, Default,)]
pub struct GitCommitter
{
    workdir: Option<PathBuf,>,
    verbose: bool,
}

impl GitCommitter
{
    /// Creates a committer operating in the process working directory.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Runs git inside `workdir` instead of the process working directory.
    pub fn in_dir<P,>(mut self, workdir: P,) -> Self
    where
        P: Into<PathBuf,>,
    {
        self.workdir = Some(workdir.into(),);
        self
    }

    /// Logs `git status` before committing.
    pub fn verbose(mut self, verbose: bool,) -> Self
    {
        self.verbose = verbose;
        self
    }

    /// Stages `file_path`, commits it with `message` under `author` and
    /// pushes.
    ///
    /// When staging produces no changes nothing is committed or pushed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when git cannot be spawned or any git command
    /// exits unsuccessfully.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::path::Path;
    ///
    /// use codestats_readme::GitCommitter;
    ///
    /// # fn example() -> Result<(), masterror::AppError> {
    /// let result = GitCommitter::new().commit_and_push(
    ///     Path::new("README.md",),
    ///     "Update codestats metrics",
    ///     "CodeStats bot",
    /// )?;
    /// println!("committed: {}, pushed: {}", result.committed, result.pushed);
    /// # Ok(())
    /// # }
    /// ```
    pub fn commit_and_push(
        &self,
        file_path: &Path,
        message: &str,
        author: &str,
    ) -> Result<GitCommitResult, AppError,>
    {
        if self.verbose {
            let status = self.output(&["status", "--short"],)?;
            debug!("git status:\n{}", String::from_utf8_lossy(&status.stdout,));
        }

        let file = file_path.to_string_lossy();
        self.run(&["add", "--", file.as_ref()],)?;

        if !self.has_staged_changes(file.as_ref(),)? {
            info!("No changes to commit for {}", file_path.display());
            return Ok(GitCommitResult {
                committed: false, pushed: false,
            },);
        }

        let identity = author_identity(author,);
        let (name, email,) = split_identity(&identity,);
        self.run(&[
            "-c",
            &format!("user.name={name}"),
            "-c",
            &format!("user.email={email}"),
            "commit",
            "--author",
            &identity,
            "-m",
            message,
            "--",
            file.as_ref(),
        ],)?;
        info!("Committed {} as {}", file_path.display(), identity);

        self.run(&["push"],)?;
        info!("Pushed README update");

        Ok(GitCommitResult {
            committed: true, pushed: true,
        },)
    }

    /// Staged changes limited to `file`; other staged paths are ignored.
    fn has_staged_changes(&self, file: &str,) -> Result<bool, AppError,>
    {
        let output = self.output(&["diff", "--cached", "--quiet", "--", file],)?;
        Ok(!output.status.success(),)
    }

    fn command(&self,) -> Command
    {
        let mut command = Command::new("git",);
        if let Some(dir,) = &self.workdir {
            command.current_dir(dir,);
        }
        command
    }

    fn output(&self, args: &[&str],) -> Result<Output, AppError,>
    {
        self.command()
            .args(args,)
            .output()
            .map_err(|e| AppError::service(format!("git {} failed: {e}", args.join(" ")),),)
    }

    fn run(&self, args: &[&str],) -> Result<(), AppError,>
    {
        let output = self.output(args,)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr,);
            return Err(AppError::service(format!(
                "git {} failed: {}",
                args.join(" ",),
                stderr.trim()
            ),),);
        }

        Ok((),)
    }
}

/// Expands an author name into a `Name <email>` identity git accepts.
///
/// Values that already carry an address are returned unchanged. Bare names
/// get a GitHub no-reply address derived from the name.
///
/// # Examples
///
/// ```
/// use codestats_readme::author_identity;
///
/// assert_eq!(author_identity("octocat"), "octocat <octocat@users.noreply.github.com>");
/// assert_eq!(author_identity("Jane <jane@example.com>"), "Jane <jane@example.com>");
/// ```
pub fn author_identity(author: &str,) -> String
{
    let trimmed = author.trim();
    if trimmed.contains('<',) && trimmed.ends_with('>',) {
        return trimmed.to_owned();
    }

    let mut local = String::with_capacity(trimmed.len(),);
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '[' | ']' | '.' | '_') {
            local.push(ch.to_ascii_lowercase(),);
        } else if !local.ends_with('-',) {
            local.push('-',);
        }
    }
    let local = local.trim_matches('-',);
    let local = if local.is_empty() { "bot" } else { local };

    format!("{trimmed} <{local}@{NOREPLY_DOMAIN}>")
}

fn split_identity(identity: &str,) -> (&str, &str,)
{
    match identity.split_once('<',) {
        Some((name, rest,),) => (name.trim(), rest.trim_end_matches('>',).trim(),),
        None => (identity, "",),
    }
}
