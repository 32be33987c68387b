mod extract;
mod merge;
mod progress;
mod sink;
mod source;

pub use extract::FfmpegSource;
pub use merge::{EncodeConfig, FfmpegSink};
pub use progress::{ChannelObserver, ProgressBarObserver, ProgressObserver, ProgressReport, ProgressTracker};
pub use sink::{Artifact, FrameSink};
pub use source::{FrameSource, Pull, SourceMetadata};

use crate::error::{Error, Result};
use crate::frame::{Dimensions, Frame, ScaleFactor};
use crate::resample;
use crate::sharpen;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_TARGET_FRAME_RATE: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JobOptions {
    pub scale: ScaleFactor,
    pub target_frame_rate: f64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            scale: ScaleFactor::default(),
            target_frame_rate: DEFAULT_TARGET_FRAME_RATE,
        }
    }
}

impl JobOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.target_frame_rate.is_finite() || self.target_frame_rate <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "target frame rate must be positive, got {}",
                self.target_frame_rate
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Initializing,
    Running,
    Completed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }
}

/// Per-run bookkeeping, alive from a successful `start` until the job ends.
#[derive(Debug)]
pub struct FrameJob {
    source: Dimensions,
    destination: Dimensions,
    scale: ScaleFactor,
    processed: u64,
    estimated_total: u64,
    progress: ProgressTracker,
}

impl FrameJob {
    fn new(source: Dimensions, scale: ScaleFactor, estimated_total: u64) -> Result<Self> {
        Ok(Self {
            source,
            destination: source.scaled(scale)?,
            scale,
            processed: 0,
            estimated_total,
            progress: ProgressTracker::new(estimated_total),
        })
    }

    pub fn source(&self) -> Dimensions {
        self.source
    }

    pub fn destination(&self) -> Dimensions {
        self.destination
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn estimated_total(&self) -> u64 {
        self.estimated_total
    }

    fn transform(&self, frame: Frame) -> Result<Frame> {
        if frame.dimensions != self.source || !frame.is_well_formed() {
            return Err(Error::frame_format(format!(
                "frame {} is {} with {} bytes, job expects {} with {} bytes",
                frame.index,
                frame.dimensions,
                frame.data.len(),
                self.source,
                self.source.buffer_len()
            )));
        }
        let (upscaled, dimensions) = resample::upscale(&frame.data, self.source, self.scale)?;
        let sharpened = sharpen::sharpen(&upscaled, dimensions)?;
        Ok(Frame::new(frame.index, dimensions, sharpened))
    }
}

/// Floor of `duration * frame_rate`; zero when either is unusable.
pub fn estimate_total_frames(duration: f64, frame_rate: f64) -> u64 {
    let total = duration * frame_rate;
    if total.is_finite() && total > 0.0 {
        total.floor() as u64
    } else {
        0
    }
}

/// Shared flag used to stop a running job at the next frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Advanced(ProgressReport),
    Finished(JobState),
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobOutcome {
    pub state: JobState,
    pub frames: u64,
    pub destination: Option<Dimensions>,
    pub artifact: Option<Artifact>,
}

impl JobOutcome {
    fn empty(state: JobState) -> Self {
        Self { state, frames: 0, destination: None, artifact: None }
    }
}

/// Drives one job at a time through
/// `Idle -> Initializing -> Running -> Completed | Cancelled`.
///
/// Each call to [`Pipeline::step`] moves exactly one frame from the source,
/// through the resampler and the sharpener, into the sink.
pub struct Pipeline<S, K, O> {
    source: S,
    sink: K,
    observer: O,
    options: JobOptions,
    state: JobState,
    job: Option<FrameJob>,
    cancel: CancelHandle,
    last_report: Option<ProgressReport>,
    outcome: Option<JobOutcome>,
}

impl<S, K, O> Pipeline<S, K, O>
where
    S: FrameSource,
    K: FrameSink,
    O: ProgressObserver,
{
    pub fn new(source: S, sink: K, observer: O, options: JobOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            source,
            sink,
            observer,
            options,
            state: JobState::Idle,
            job: None,
            cancel: CancelHandle::default(),
            last_report: None,
            outcome: None,
        })
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn job(&self) -> Option<&FrameJob> {
        self.job.as_ref()
    }

    pub fn progress(&self) -> Option<ProgressReport> {
        self.last_report
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_parts(self) -> (S, K, O) {
        (self.source, self.sink, self.observer)
    }

    /// Reads source metadata and arms the sink. Frames are only pulled once
    /// this has returned `Ok`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != JobState::Idle {
            return Err(Error::invalid_state(format!("cannot start a job while {:?}", self.state)));
        }
        self.state = JobState::Initializing;
        self.last_report = None;
        self.outcome = None;

        match self.initialize() {
            Ok(job) => {
                self.job = Some(job);
                self.state = JobState::Running;
                Ok(())
            }
            Err(e) => {
                self.abort(&e);
                Err(e)
            }
        }
    }

    fn initialize(&mut self) -> Result<FrameJob> {
        let metadata = self.source.metadata()?;
        let estimated_total = estimate_total_frames(metadata.duration, self.options.target_frame_rate);
        let job = FrameJob::new(metadata.dimensions, self.options.scale, estimated_total)?;

        self.sink.arm(job.destination, self.options.target_frame_rate)?;
        info!(
            source = %job.source,
            destination = %job.destination,
            scale = %job.scale,
            estimated_total,
            "job started"
        );
        Ok(job)
    }

    pub fn step(&mut self) -> Result<Step> {
        match self.state {
            JobState::Running => {}
            JobState::Completed | JobState::Cancelled => return Ok(Step::Finished(self.state)),
            JobState::Idle | JobState::Initializing => {
                return Err(Error::invalid_state(format!("cannot step a job while {:?}", self.state)));
            }
        }

        if self.cancel.is_cancelled() {
            info!("cancellation requested, discarding output");
            self.teardown();
            return Ok(Step::Finished(self.state));
        }

        match self.advance() {
            Ok(step) => Ok(step),
            Err(e) => {
                self.abort(&e);
                Err(e)
            }
        }
    }

    /// Starts the job and steps it until it reaches a terminal state.
    pub fn run(&mut self) -> Result<JobOutcome> {
        self.start()?;
        while let Step::Advanced(_) = self.step()? {}
        Ok(self.outcome.clone().unwrap_or_else(|| JobOutcome::empty(self.state)))
    }

    /// Returns a finished pipeline to `Idle` so another job can start.
    pub fn reset(&mut self) -> Result<()> {
        if !self.state.is_terminal() && self.state != JobState::Idle {
            return Err(Error::invalid_state(format!("cannot reset a job while {:?}", self.state)));
        }
        self.state = JobState::Idle;
        self.job = None;
        self.last_report = None;
        self.outcome = None;
        self.cancel.clear();
        Ok(())
    }

    fn advance(&mut self) -> Result<Step> {
        let job = self.job.as_mut().ok_or_else(|| Error::invalid_state("running without a job"))?;

        match self.source.pull()? {
            Pull::Frame(frame) => {
                let index = frame.index;
                let processed = job.transform(frame)?;
                self.sink.push(processed)?;
                job.processed += 1;
                let report = job.progress.advance(job.processed);
                debug!(frame = index, percent = report.percent(), "frame processed");
                self.last_report = Some(report);
                self.observer.on_progress(report);
                Ok(Step::Advanced(report))
            }
            Pull::EndOfStream | Pull::Paused => {
                let artifact = self.sink.finalize()?;
                let report = job.progress.complete();
                let outcome = JobOutcome {
                    state: JobState::Completed,
                    frames: job.processed,
                    destination: Some(job.destination),
                    artifact: Some(artifact),
                };
                info!(frames = outcome.frames, "job completed");
                self.state = JobState::Completed;
                self.job = None;
                self.outcome = Some(outcome);
                self.last_report = Some(report);
                self.observer.on_progress(report);
                Ok(Step::Finished(JobState::Completed))
            }
        }
    }

    fn abort(&mut self, error: &Error) {
        warn!(error = %error, "job aborted");
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Err(e) = self.sink.discard() {
            warn!(error = %e, "failed to discard sink output");
        }
        let (frames, destination) = self
            .job
            .take()
            .map(|job| (job.processed, Some(job.destination)))
            .unwrap_or((0, None));
        self.state = JobState::Cancelled;
        self.outcome = Some(JobOutcome { state: JobState::Cancelled, frames, destination, artifact: None });
    }
}
