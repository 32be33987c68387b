use crate::frame::{Dimensions, ScaleFactor};

use std::fmt::Write;
use crossbeam_channel::{Sender, TrySendError};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// Whole-number completion percentage of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressReport(u8);

impl ProgressReport {
    pub const RUNNING_CAP: u8 = 99;
    pub const COMPLETE: ProgressReport = ProgressReport(100);

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

/// Turns a frame counter into reports that never go backwards and stay
/// below 100 until `complete` is called.
#[derive(Debug)]
pub struct ProgressTracker {
    estimated_total: u64,
    last: ProgressReport,
}

impl ProgressTracker {
    pub fn new(estimated_total: u64) -> Self {
        Self { estimated_total, last: ProgressReport::default() }
    }

    pub fn advance(&mut self, processed: u64) -> ProgressReport {
        let percent = if self.estimated_total == 0 {
            u64::from(ProgressReport::RUNNING_CAP)
        } else {
            (processed.saturating_mul(100) / self.estimated_total).min(u64::from(ProgressReport::RUNNING_CAP))
        };
        let report = ProgressReport(percent as u8);
        if report > self.last {
            self.last = report;
        }
        self.last
    }

    pub fn complete(&mut self) -> ProgressReport {
        self.last = ProgressReport::COMPLETE;
        self.last
    }
}

/// Receives a report after every processed frame. Called once per frame, so
/// implementations must return quickly.
pub trait ProgressObserver {
    fn on_progress(&mut self, report: ProgressReport);
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressReport),
{
    fn on_progress(&mut self, report: ProgressReport) {
        self(report)
    }
}

/// Forwards reports over a channel, dropping them when the receiver lags.
pub struct ChannelObserver {
    sender: Sender<ProgressReport>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ProgressReport>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, report: ProgressReport) {
        match self.sender.try_send(report) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => tracing::trace!(percent = report.percent(), "progress receiver lagging, report dropped"),
        }
    }
}

pub struct ProgressBarObserver {
    progress_bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new(label: &str, source: Dimensions, destination: Dimensions, scale: ScaleFactor, encoder: &str) -> Self {
        let progress_bar = ProgressBar::new(100);
        let progress_template = "[{elapsed_precise}] [{eta_precise}] [{wide_bar:.white/green}] {percent} {msg}";
        let options_template = format!(
            "[resolution: {} -> {}] [scale: {}] [encoder: {}]",
            source,
            destination,
            scale,
            encoder
        );
        let progress_style = ProgressStyle::default_bar()
            .template(&format!("{}\n{}\n{}", label, options_template, progress_template))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░-")
            .with_key("percent", |state: &ProgressState, w: &mut dyn Write| {
                let _ = write!(w, "({:.0}%)", state.fraction() * 100.0);
            });
        progress_bar.set_style(progress_style);
        Self { progress_bar }
    }

    pub fn abandon(&self) {
        self.progress_bar.abandon_with_message("cancelled");
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_progress(&mut self, report: ProgressReport) {
        self.progress_bar.set_position(u64::from(report.percent()));
        if report.is_complete() {
            self.progress_bar.finish();
        }
    }
}
