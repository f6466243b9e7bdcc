// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Horizontal bar chart rendering for ranked language entries.
///
/// The renderer keeps the order of the [`RankedChart`] it receives; ranking
/// and truncation already happened upstream.
use masterror::AppError;

use crate::RankedChart;

/// Chart width used when no width is configured.
pub const DEFAULT_WIDTH: usize = 42;

/// Block character used to draw bars.
pub const BAR_CHARACTER: char = '█';

/// Converts a ranked chart into preformatted text.
pub trait ChartRenderer
{
    /// Renders one line per entry with bars scaled to `width` cells.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the chart cannot be rendered. Callers are
    /// expected to recover by substituting an empty chart.
    fn render(&self, chart: &RankedChart, width: usize,) -> Result<String, AppError,>;
}

/// Default renderer producing `  label | ████     | value` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct BarChart
{
    bar: char,
}

impl BarChart
{
    /// Creates a renderer drawing bars with the given character.
    pub fn with_bar(bar: char,) -> Self
    {
        Self {
            bar,
        }
    }
}

impl Default for BarChart
{
    fn default() -> Self
    {
        Self::with_bar(BAR_CHARACTER,)
    }
}

impl ChartRenderer for BarChart
{
    /// # Example
    ///
    /// ```
    /// use codestats_readme::{BarChart, ChartRenderer, RawEntry, rank};
    /// use serde_json::json;
    ///
    /// let chart = rank(
    ///     vec![RawEntry::new("Rust", Some(json!(10)),), RawEntry::new("Go", Some(json!(5)),)],
    ///     6,
    /// );
    /// let text = BarChart::default().render(&chart, 4,).expect("renderable chart",);
    /// assert_eq!(text, "  Rust | ████ | 10\n    Go | ██   | 5\n");
    /// ```
    fn render(&self, chart: &RankedChart, width: usize,) -> Result<String, AppError,>
    {
        if chart.is_empty() {
            return Ok(String::new(),);
        }
        if width == 0 {
            return Err(AppError::validation("chart width must be positive",),);
        }

        let max = chart.iter().map(|entry| entry.metric,).fold(0.0_f64, f64::max,);
        if !max.is_finite() {
            return Err(AppError::validation("chart values must be finite",),);
        }

        let label_width =
            chart.iter().map(|entry| entry.label.chars().count(),).max().unwrap_or_default();

        let mut output = String::new();
        for entry in chart {
            let shown = bar_length(entry.metric, max, width,);
            let bar: String = std::iter::repeat_n(self.bar, shown,).collect();
            output.push_str(&format!(
                "  {label:>label_width$} | {bar}{blank} | {value}\n",
                label = entry.label,
                blank = " ".repeat(width - shown),
                value = entry.metric,
            ),);
        }

        Ok(output,)
    }
}

/// Number of bar cells for `value` relative to `max`.
///
/// A zero maximum yields empty bars for every entry.
fn bar_length(value: f64, max: f64, width: usize,) -> usize
{
    if max <= 0.0 {
        return 0;
    }
    let proportion = (value / max).clamp(0.0, 1.0,);
    ((width as f64) * proportion).round() as usize
}
