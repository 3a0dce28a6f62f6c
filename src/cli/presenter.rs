//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Width of the amplitude meter in cells
const METER_WIDTH: usize = 30;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Recording progress: elapsed time, with the limit when one is set
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: Option<u64>) -> String {
        match total_ms {
            Some(total) => {
                let percent = if total > 0 {
                    (elapsed_ms as f64 / total as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };
                let bar_width = 20;
                let filled = ((percent / 100.0) * bar_width as f64) as usize;
                let empty = bar_width - filled;

                format!(
                    "[{}{}] {} / {}",
                    "█".repeat(filled).cyan(),
                    "░".repeat(empty),
                    format_elapsed(elapsed_ms),
                    format_elapsed(total)
                )
            }
            None => format_elapsed(elapsed_ms),
        }
    }

    /// Update recording progress
    pub fn update_recording_progress(&self, elapsed_ms: u64, total_ms: Option<u64>) {
        let progress = self.format_progress(elapsed_ms, total_ms);
        self.update_spinner(&format!("Recording... {}", progress));
    }

    /// Redraw the live amplitude meter in place on stderr
    pub fn meter(&self, peak: f32, rms: f32) {
        eprint!("\r{}", format_meter(peak, rms));
        let _ = io::stderr().flush();
    }

    /// End the meter line
    pub fn finish_meter(&self) {
        eprintln!();
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// `m:ss.t` for elapsed milliseconds
pub fn format_elapsed(ms: u64) -> String {
    format!("{}:{:02}.{}", ms / 60_000, (ms / 1000) % 60, (ms % 1000) / 100)
}

/// Bar filled to `rms` with a marker at `peak`, both in 0.0..=1.0
pub fn format_meter(peak: f32, rms: f32) -> String {
    let cells = |level: f32| (level.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize;
    let filled = cells(rms);
    let peak_at = cells(peak).max(filled);

    let mut bar = String::with_capacity(METER_WIDTH * 3);
    for i in 0..METER_WIDTH {
        if i < filled {
            bar.push('█');
        } else if i + 1 == peak_at {
            bar.push('|');
        } else {
            bar.push('░');
        }
    }

    let colored_bar = if peak >= 0.99 {
        bar.red()
    } else if peak >= 0.7 {
        bar.yellow()
    } else {
        bar.green()
    };
    format!("[{}] peak {:>5.3} rms {:>5.3}", colored_bar, peak, rms)
}
