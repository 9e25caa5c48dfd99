// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Renders progress, diagnostics and results in normal, quiet or JSON-lines mode.

use serde::Serialize;
use std::time::Instant;

use crate::config::Change;
use crate::diagnostics::{Diagnostic, Severity};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only warnings, errors and the final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print one planned attribute change.
    pub fn change(&self, change: &Change) {
        match self.mode {
            OutputMode::Normal => println!("  ~ {change}"),
            OutputMode::Quiet => {}
            OutputMode::Json => emit(&JsonEvent {
                event: "change",
                message: &change.to_string(),
                severity: None,
                duration_secs: None,
            }),
        }
    }

    /// Print a diagnostic; info entries are hidden in quiet mode.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        match (self.mode, diagnostic.severity) {
            (OutputMode::Json, severity) => emit(&JsonEvent {
                event: "diagnostic",
                message: &diagnostic.message,
                severity: Some(severity),
                duration_secs: None,
            }),
            (OutputMode::Quiet, Severity::Info) => {}
            (_, Severity::Info) => println!("  · {}", diagnostic.message),
            (_, Severity::Warning) => eprintln!("Warning: {}", diagnostic.message),
            (_, Severity::Error) => eprintln!("Error: {}", diagnostic.message),
        }
    }

    /// Print every diagnostic in order.
    pub fn diagnostics<'a>(&self, entries: impl IntoIterator<Item = &'a Diagnostic>) {
        for diagnostic in entries {
            self.diagnostic(diagnostic);
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({elapsed:.1}s)");
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => emit(&JsonEvent {
                event: "success",
                message,
                severity: None,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    severity: None,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn emit(event: &JsonEvent<'_>) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_events_carry_severity_only_when_set() {
        let event = JsonEvent {
            event: "diagnostic",
            message: "DB instance (orders) deleted",
            severity: Some(Severity::Warning),
            duration_secs: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"diagnostic","message":"DB instance (orders) deleted","severity":"warning"}"#
        );
    }

    #[test]
    fn timer_is_zero_until_started() {
        let mut output = Output::new(OutputMode::Quiet);
        assert_eq!(output.duration(), None);
        output.start_timer();
        assert!(output.duration().is_some());
    }
}
