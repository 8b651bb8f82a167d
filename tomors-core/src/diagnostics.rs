//! Severity-tagged diagnostics emitted while validating and ingesting.
//!
//! Each [`crate::Dataset`] owns one [`DiagnosticLog`]. It keeps every
//! diagnostic of the current read in memory, forwards those at or above its
//! threshold to the `log` facade, and appends them to a log file next to the
//! input file. The file sink is attached once per log path, so repeated reads
//! of the same file never duplicate output.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Target used for all records forwarded to the `log` facade.
pub const LOG_TARGET: &str = "tomors";

/// Diagnostic severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Parses a level name (`DEBUG`, `INFO`, `WARN`, `WARNING`, `ERROR`),
    /// ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Corresponding `log` level.
    #[must_use]
    pub fn to_log_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }

    /// Level name as written to the log file.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl From<Severity> for log::LevelFilter {
    fn from(severity: Severity) -> Self {
        severity.to_log_level().to_level_filter()
    }
}

/// Terminal marker of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Outcome {
    Ok,
    Failed,
}

/// One validation or materialization step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub outcome: Outcome,
}

impl Diagnostic {
    /// A step that succeeded.
    pub fn ok(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            outcome: Outcome::Ok,
        }
    }

    /// A step that failed.
    pub fn failed(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            outcome: Outcome::Failed,
        }
    }

    /// Picks `ok` at `pass` severity or `failed` at `fail` severity.
    pub fn check(passed: bool, pass: Severity, fail: Severity, message: impl Into<String>) -> Self {
        if passed {
            Self::ok(pass, message)
        } else {
            Self::failed(fail, message)
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = match self.outcome {
            Outcome::Ok => "ok",
            Outcome::Failed => "failed",
        };
        write!(f, "{} [{marker}]", self.message)
    }
}

#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    writer: LineWriter<File>,
}

/// Per-dataset diagnostic sink.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    threshold: Severity,
    file: Option<FileSink>,
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    /// Creates a sink with the given threshold and no file.
    #[must_use]
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            file: None,
            entries: Vec::new(),
        }
    }

    /// Current threshold.
    #[must_use]
    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: Severity) {
        self.threshold = threshold;
    }

    /// Sets the threshold from a level name.
    ///
    /// An unrecognized name leaves the threshold unchanged, emits a warning
    /// and returns `false`.
    pub fn set_level(&mut self, level: &str) -> bool {
        if let Some(threshold) = Severity::parse(level) {
            self.threshold = threshold;
            true
        } else {
            self.emit(Diagnostic::failed(
                Severity::Warning,
                format!(
                    "log level '{level}' not recognized, keeping {}",
                    self.threshold.label()
                ),
            ));
            false
        }
    }

    /// Path of the attached log file, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|sink| sink.path.as_path())
    }

    /// Appends output to `path`. Attaching the current path again is a no-op.
    ///
    /// # Errors
    /// Returns an error if the log file cannot be opened for appending.
    pub fn attach_file(&mut self, path: &Path) -> std::io::Result<()> {
        if self.file_path() == Some(path) {
            return Ok(());
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.file = Some(FileSink {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
        });
        Ok(())
    }

    /// Stops writing to the log file.
    pub fn detach_file(&mut self) {
        self.file = None;
    }

    /// Records a diagnostic and forwards it if it passes the threshold.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity >= self.threshold {
            log::log!(target: LOG_TARGET, diagnostic.severity.to_log_level(), "{diagnostic}");
            if let Some(sink) = self.file.as_mut() {
                let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                let line = format!(
                    "{stamp} - {LOG_TARGET} - {} - {diagnostic}",
                    diagnostic.severity.label()
                );
                if let Err(err) = writeln!(sink.writer, "{line}") {
                    log::warn!(target: LOG_TARGET, "cannot write {}: {err}", sink.path.display());
                }
            }
        }
        self.entries.push(diagnostic);
    }

    /// Diagnostics recorded since the last [`Self::clear`].
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Forgets recorded diagnostics; the threshold and file stay attached.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
