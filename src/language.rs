// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Validation and ranking of per-language experience entries.
//!
//! Upstream statistics arrive as loosely typed JSON records. Every record is
//! classified into an [`EntryVerdict`] before ranking so malformed values are
//! rejected in one place instead of being inspected throughout the pipeline.
//! The resulting [`RankedChart`] is ordered by experience, descending, with
//! ties kept in input order, and never holds more than the requested number
//! of entries.

use serde_json::Value;
use tracing::trace;

/// Number of languages rendered when the caller does not choose a limit.
pub const DEFAULT_LIMIT: usize = 6;

/// Field carrying the accumulated experience points inside a language record.
pub const METRIC_FIELD: &str = "xps";

/// Raw language entry as supplied by the statistics source.
///
/// `metric` is `None` when the record did not carry the metric field at all;
/// otherwise it holds whatever JSON value was present.
#[derive(Debug, Clone, PartialEq,)]
pub struct RawEntry
{
    /// Language or category name.
    pub label:  String,
    /// Unvalidated metric value.
    pub metric: Option<Value,>,
}

impl RawEntry
{
    /// Creates an entry from a label and an optional raw metric.
    pub fn new<L,>(label: L, metric: Option<Value,>,) -> Self
    where
        L: Into<String,>,
    {
        Self {
            label: label.into(), metric,
        }
    }

    /// Creates an entry from a full language record such as
    /// `{"xps": 1200, "new_xps": 4}`.
    ///
    /// Records that are not JSON objects, or objects without the metric field,
    /// produce an entry with an absent metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use codestats_readme::RawEntry;
    /// use serde_json::json;
    ///
    /// let entry = RawEntry::from_record("Rust", &json!({ "xps": 1200, "new_xps": 4 }),);
    /// assert_eq!(entry.metric, Some(json!(1200)));
    /// ```
    pub fn from_record<L,>(label: L, record: &Value,) -> Self
    where
        L: Into<String,>,
    {
        let metric = record.as_object().and_then(|fields| fields.get(METRIC_FIELD,),).cloned();
        Self::new(label, metric,)
    }
}

/// Validated language entry.
#[derive(Debug, Clone, PartialEq,)]
pub struct LanguageMetric
{
    /// Language or category name.
    pub label:  String,
    /// Finite, non-negative experience points.
    pub metric: f64,
}

/// Reason a raw entry was rejected during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum RejectReason
{
    /// The label was empty.
    EmptyLabel,
    /// The record carried no metric, or the metric was `null`.
    MissingMetric,
    /// The metric was present but not a JSON number.
    NotNumeric,
    /// The metric was below zero.
    Negative,
    /// The metric was NaN or infinite.
    NotFinite,
}

impl RejectReason
{
    /// Short description suitable for log output.
    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::EmptyLabel => "empty label",
            Self::MissingMetric => "missing metric",
            Self::NotNumeric => "metric is not a number",
            Self::Negative => "metric is negative",
            Self::NotFinite => "metric is not finite",
        }
    }
}

/// Outcome of classifying a single raw entry.
#[derive(Debug, Clone, PartialEq,)]
pub enum EntryVerdict
{
    /// The entry passed validation.
    Valid(LanguageMetric,),
    /// The entry was rejected and will not be ranked.
    Rejected
    {
        /// Label of the rejected entry, kept for diagnostics.
        label:  String,
        /// Why the entry was rejected.
        reason: RejectReason,
    },
}

/// Classifies a raw entry as valid or rejected.
///
/// An entry is valid when its label is non-empty and its metric is a JSON
/// number that is finite and not negative.
pub fn classify(entry: RawEntry,) -> EntryVerdict
{
    let RawEntry {
        label,
        metric,
    } = entry;

    let checked = if label.is_empty() {
        Err(RejectReason::EmptyLabel,)
    } else {
        match metric {
            None | Some(Value::Null,) => Err(RejectReason::MissingMetric,),
            Some(Value::Number(number,),) => {
                number.as_f64().ok_or(RejectReason::NotNumeric,).and_then(validate_metric,)
            }
            Some(_,) => Err(RejectReason::NotNumeric,),
        }
    };

    match checked {
        Ok(metric,) => EntryVerdict::Valid(LanguageMetric {
            label,
            metric,
        },),
        Err(reason,) => EntryVerdict::Rejected {
            label,
            reason,
        },
    }
}

/// Checks a numeric metric and normalizes negative zero.
pub fn validate_metric(value: f64,) -> Result<f64, RejectReason,>
{
    if !value.is_finite() {
        return Err(RejectReason::NotFinite,);
    }
    if value < 0.0 {
        return Err(RejectReason::Negative,);
    }
    if value == 0.0 { Ok(0.0,) } else { Ok(value,) }
}

/// Filtered, ordered and truncated language entries ready for rendering.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct RankedChart
{
    entries: Vec<LanguageMetric,>,
}

impl RankedChart
{
    /// Entries in rank order.
    pub fn entries(&self,) -> &[LanguageMetric]
    {
        &self.entries
    }

    /// Iterates over entries in rank order.
    pub fn iter(&self,) -> std::slice::Iter<'_, LanguageMetric,>
    {
        self.entries.iter()
    }

    /// Number of ranked entries.
    pub fn len(&self,) -> usize
    {
        self.entries.len()
    }

    /// Returns `true` when no entry survived validation.
    pub fn is_empty(&self,) -> bool
    {
        self.entries.is_empty()
    }

    /// Largest metric in the chart, if any.
    pub fn max_metric(&self,) -> Option<f64,>
    {
        self.entries.first().map(|entry| entry.metric,)
    }

    /// Labels in rank order.
    pub fn labels(&self,) -> Vec<&str,>
    {
        self.entries.iter().map(|entry| entry.label.as_str(),).collect()
    }
}

impl<'a,> IntoIterator for &'a RankedChart
{
    type IntoIter = std::slice::Iter<'a, LanguageMetric,>;
    type Item = &'a LanguageMetric;

    fn into_iter(self,) -> Self::IntoIter
    {
        self.iter()
    }
}

/// Validates, orders and truncates raw entries.
///
/// Invalid entries are dropped without error. Valid entries are sorted by
/// metric, largest first; entries with equal metrics keep their input order.
/// At most `limit` entries are kept. Duplicate labels are treated as distinct
/// entries.
///
/// # Examples
///
/// ```
/// use codestats_readme::{RawEntry, rank};
/// use serde_json::json;
///
/// let chart = rank(
///     vec![
///         RawEntry::new("a", Some(json!(-5)),),
///         RawEntry::new("b", Some(json!("x")),),
///         RawEntry::new("c", Some(json!(null)),),
///         RawEntry::new("d", Some(json!(42)),),
///     ],
///     6,
/// );
/// assert_eq!(chart.labels(), vec!["d"]);
/// ```
pub fn rank<I,>(entries: I, limit: usize,) -> RankedChart
where
    I: IntoIterator<Item = RawEntry,>,
{
    let mut valid: Vec<LanguageMetric,> = entries
        .into_iter()
        .filter_map(|entry| match classify(entry,) {
            EntryVerdict::Valid(metric,) => Some(metric,),
            EntryVerdict::Rejected {
                label,
                reason,
            } => {
                trace!("Dropping language '{}': {}", label, reason.as_str());
                None
            }
        },)
        .collect();

    // Vec::sort_by is stable, so equal metrics keep their input order.
    valid.sort_by(|left, right| right.metric.total_cmp(&left.metric,),);
    valid.truncate(limit,);

    RankedChart {
        entries: valid,
    }
}
