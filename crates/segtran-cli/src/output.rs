//! Output formatting and writing utilities
//!
//! Results (translations, reports, tables) go to stdout; status messages go
//! to stderr so that `segtran translate paper.txt > paper.en.txt` stays clean.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use segtran_core::{JobReport, OffsetRange, SegmentResult, SegmentState};
use serde::Serialize;
use std::io::{self, Write};
use tracing::trace;

/// Trait for formatting serializable values in the selected output format
pub trait OutputFormatter {
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
    status: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer on stdout/stderr
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
            status: Box::new(io::stderr()),
        }
    }

    /// Create an output writer with custom writers; progress bars are disabled
    pub fn with_writers(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        writer: Box<dyn Write>,
        status: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            show_progress: false,
            quiet,
            writer,
            status,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    fn status_line(&mut self, content: &str) -> Result<()> {
        writeln!(self.status, "{}", content)?;
        self.status.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.status_line(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.status_line(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.status_line(&message.green().to_string())
        } else {
            self.status_line(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.use_color {
            self.status_line(&message.yellow().to_string())
        } else {
            self.status_line(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut value_json = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut value_json);
        trace!(
            "Outputting data: {}",
            serde_json::to_string(&value_json).unwrap_or_else(|_| "[failed to serialize]".to_string())
        );

        let formatted = self.format.format(value)?;
        if formatted.ends_with('\n') {
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Create a progress bar for long operations
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(length);
        pb.set_style(default_progress_style());
        pb.set_message(message.to_string());
        Some(pb)
    }

    /// Write a table (human format only)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        let rendered = render_table(headers, &rows);
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            if self.use_color {
                self.writeln(&header.bold().to_string())?;
            } else {
                self.writeln(header)?;
            }
        }
        for line in lines {
            self.writeln(line)?;
        }
        Ok(())
    }
}

/// Progress bar style used while segments are dispatched
pub fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Render rows under headers with columns padded to the widest cell
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let pad = |cell: &str, width: usize| {
        let fill = width.saturating_sub(cell.chars().count());
        format!("{}{}", cell, " ".repeat(fill))
    };

    let mut out = String::new();
    let header_row = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i]))
        .collect::<Vec<_>>()
        .join(" │ ");
    out.push_str(header_row.trim_end());
    out.push('\n');

    let separator = widths
        .iter()
        .map(|w| "─".repeat(*w))
        .collect::<Vec<_>>()
        .join("─┼─");
    out.push_str(&separator);
    out.push('\n');

    for row in rows {
        let row_str = row
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(width) => pad(cell, *width),
                None => cell.clone(),
            })
            .collect::<Vec<_>>()
            .join(" │ ");
        out.push_str(row_str.trim_end());
        out.push('\n');
    }
    out
}

/// Label for a slot state as shown to users
pub fn state_label(state: Option<SegmentState>) -> &'static str {
    match state {
        None => "unset",
        Some(SegmentState::Pending) => "pending",
        Some(SegmentState::Streaming) => "streaming",
        Some(SegmentState::Completed) => "completed",
        Some(SegmentState::Error) => "error",
    }
}

/// One segment result as a card: header line with offsets, then the text
pub fn format_segment_card(result: &SegmentResult, total: usize, range: Option<&OffsetRange>) -> String {
    let span = range
        .map(|r| format!(" [{}..{})", r.start, r.end))
        .unwrap_or_default();
    format!(
        "── Segment {}/{}{} ({}) ──\n{}\n",
        result.index + 1,
        total,
        span,
        state_label(result.state),
        result.content
    )
}

/// Rows for the `--show-offsets` table
pub fn offset_rows(report: &JobReport) -> Vec<Vec<String>> {
    report
        .segments
        .iter()
        .map(|result| {
            let range = report.offsets.get(result.index);
            vec![
                (result.index + 1).to_string(),
                range.map(|r| r.start.to_string()).unwrap_or_default(),
                range.map(|r| r.end.to_string()).unwrap_or_default(),
                range.map(|r| r.len().to_string()).unwrap_or_default(),
                state_label(result.state).to_string(),
            ]
        })
        .collect()
}

/// One-line summary of a finished job
pub fn format_summary(report: &JobReport) -> String {
    let seconds = report.elapsed_ms as f64 / 1000.0;
    if report.failed == 0 {
        format!(
            "✓ Translated {} segment(s) in {:.1}s",
            report.completed, seconds
        )
    } else {
        format!(
            "Translated {}/{} segment(s) in {:.1}s; {} failed",
            report.completed, report.total, seconds, report.failed
        )
    }
}

/// First `max` characters of `text` on one line
pub fn preview(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let trimmed = flat.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max).collect();
        format!("{}…", head)
    }
}
