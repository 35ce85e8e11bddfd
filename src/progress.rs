//! Batch progress: an indicatif bar on a terminal, or periodic log lines
//! when the output is going to a file.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

const BAR_TEMPLATE: &str = "{spinner} {pos}/{len} [{bar:40}] {percent}% eta {eta} {msg}";

pub struct BatchProgress {
    bar: ProgressBar,
    total: u64,
    done: u64,
    /// Log a line every this many items instead of drawing the bar
    log_every: Option<u64>,
}

/// Whether item `done` of `total` gets a log line.
fn is_log_point(done: u64, total: u64, every: u64) -> bool {
    done == total || done % every.max(1) == 0
}

impl BatchProgress {
    pub fn new(total: u64, log_every: Option<u64>) -> Self {
        let bar = if log_every.is_some() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        };
        Self {
            bar,
            total,
            done: 0,
            log_every,
        }
    }

    /// Run `f` with the bar cleared, so log lines do not tear it.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    /// Mark one item (named by its catalog number) as done.
    pub fn advance(&mut self, catalog: &str) {
        self.done += 1;
        self.bar.set_message(catalog.to_string());
        self.bar.inc(1);
        if let Some(every) = self.log_every {
            if is_log_point(self.done, self.total, every) {
                let pct = 100.0 * self.done as f64 / self.total.max(1) as f64;
                info!("[lookup] {}/{} ({:.1}%)", self.done, self.total, pct);
            }
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
