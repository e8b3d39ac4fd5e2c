use indicatif::{ProgressBar, ProgressStyle};
use media_ingest_core::{Decision, DecisionSink, ProgressReporter};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter: one spinner per folder, decision lines printed above it.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_pass_start(&self, folders: usize, records: usize) {
        eprintln!(
            "  Resolving {} unprocessed records in {} folders",
            records, folders
        );
    }

    fn on_folder_start(&self, folder: &str, records: usize) {
        self.set_bar(spinner(format!("{} ({} records)", folder, records)));
    }

    fn on_folder_complete(&self, _folder: &str, _decisions: usize) {
        self.finish_bar();
    }

    fn on_pass_complete(&self, decisions: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Resolve complete: {} decisions in {:.2}s",
            decisions, duration_secs
        );
    }
}

impl DecisionSink for CliReporter {
    fn emit(&self, decision: &Decision) {
        let line = decision.to_string();
        match self.bar.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(pb) => pb.suspend(|| println!("{}", line)),
                None => println!("{}", line),
            },
            Err(_) => println!("{}", line),
        }
    }
}
