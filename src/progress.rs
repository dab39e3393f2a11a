//! Spinner shown while a long-running operation is polled.

use indicatif::{ProgressBar, ProgressStyle};
use reconcile::PollObserver;
use std::io::IsTerminal;
use std::time::Duration;

/// Reports poll status on stderr. Hidden when quiet or not on a terminal.
pub struct Spinner {
    bar: ProgressBar,
    label: String,
}

impl Spinner {
    pub fn new(label: impl Into<String>, quiet: bool) -> Self {
        let bar = if quiet || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {elapsed:.dim}") {
                bar.set_style(style);
            }
            bar
        };
        Self {
            bar,
            label: label.into(),
        }
    }
}

impl PollObserver for Spinner {
    fn on_status(&mut self, status: &str, attempt: u32) {
        if attempt == 1 {
            self.bar.enable_steady_tick(Duration::from_millis(120));
        }
        self.bar.set_message(format!("{}: {status}", self.label));
        log::debug!("{}: poll {attempt} -> {status}", self.label);
    }

    fn on_finished(&mut self, status: &str) {
        log::debug!("{}: finished with {status}", self.label);
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner_accepts_updates() {
        let mut spinner = Spinner::new("resource_group rg1", true);
        spinner.on_status("InProgress", 1);
        spinner.on_status("InProgress", 2);
        spinner.on_finished("Succeeded");
        assert!(spinner.bar.is_finished());
    }
}
