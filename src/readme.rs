// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Replaces the Code::Stats section of a README with a freshly rendered chart.
///
/// The section is delimited by two HTML comments:
///
/// ```text
/// <!-- START_SECTION:codestats -->
/// ...
/// <!-- END_SECTION:codestats -->
/// ```
///
/// Everything outside the first delimited region is copied through untouched.
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{NoExpand, Regex};
use tracing::{debug, error};

/// Marker written at the start of the generated section.
pub const START_MARKER: &str = "<!-- START_SECTION:codestats -->";
/// Marker written at the end of the generated section.
pub const END_MARKER: &str = "<!-- END_SECTION:codestats -->";

const FENCE_OPEN: &str = "```text\n";
const FENCE_CLOSE: &str = "```\n";

static SECTION_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(
        r"<!--.*START_SECTION:codestats.*-->[\s\S]*?<!--.*END_SECTION:codestats.*-->",
    )
    .expect("section pattern is valid")
});

/// Replaces the first marker-delimited section of `document`.
///
/// The matched span, markers included, is replaced with the canonical START
/// marker, `header`, a fenced `text` block holding `content`, `footer` and
/// the canonical END marker. Documents without a START/END pair are returned
/// unchanged. Only the first section is replaced.
///
/// # Example
///
/// ```
/// use codestats_readme::replace_section;
///
/// let readme = "# Title\n<!-- START_SECTION:codestats -->\nold\n<!-- END_SECTION:codestats -->\n";
/// let updated = replace_section(readme, "NEW\n", "", "");
/// assert_eq!(
///     updated,
///     "# Title\n<!-- START_SECTION:codestats -->\n```text\nNEW\n```\n<!-- END_SECTION:codestats -->\n"
/// );
/// ```
pub fn replace_section(document: &str, content: &str, header: &str, footer: &str) -> String {
    let replacement = section_body(content, header, footer);
    match SECTION_PATTERN.find(document) {
        Some(found) => {
            debug!(
                "Replacing section spanning bytes {}..{}",
                found.start(),
                found.end()
            );
            SECTION_PATTERN
                .replacen(document, 1, NoExpand(&replacement))
                .into_owned()
        }
        None => {
            debug!("No codestats section markers found; document left unchanged");
            document.to_owned()
        }
    }
}

/// Byte-oriented variant of [`replace_section`].
///
/// Returns an empty string when `document` is not valid UTF-8. Callers must
/// treat the empty result for a non-empty input as a failure and leave the
/// original document in place.
pub fn replace_section_bytes(document: &[u8], content: &str, header: &str, footer: &str) -> String {
    match std::str::from_utf8(document) {
        Ok(text) => replace_section(text, content, header, footer),
        Err(e) => {
            error!("replace_section: document is not valid UTF-8 text: {e}");
            String::new()
        }
    }
}

/// Returns `true` when `document` holds a START/END marker pair.
pub fn has_section(document: &str) -> bool {
    SECTION_PATTERN.is_match(document)
}

/// Header line announcing the last update time.
///
/// The timestamp uses the RFC 1123 form, e.g. `Tue, 01 Jan 2030 00:00:00 GMT`.
pub fn section_header(updated_at: DateTime<Utc>) -> String {
    format!(
        "*Language experience level (Last update {})*\n\n",
        updated_at.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// Footer line linking to the public Code::Stats profile.
pub fn section_footer(profile_url: &str) -> String {
    format!("\n> My [CodeStats profile]({profile_url}) in detail.\n")
}

fn section_body(content: &str, header: &str, footer: &str) -> String {
    let mut body = String::with_capacity(
        START_MARKER.len()
            + END_MARKER.len()
            + header.len()
            + content.len()
            + footer.len()
            + FENCE_OPEN.len()
            + FENCE_CLOSE.len()
            + 1
    );
    body.push_str(START_MARKER);
    body.push('\n');
    body.push_str(header);
    body.push_str(FENCE_OPEN);
    body.push_str(content);
    body.push_str(FENCE_CLOSE);
    body.push_str(footer);
    body.push_str(END_MARKER);
    body
}
