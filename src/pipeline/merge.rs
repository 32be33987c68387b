use super::sink::{Artifact, FrameSink};
use crate::error::{Error, Result};
use crate::frame::{Dimensions, Frame};
use crate::process::detach_process_group;

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub output: PathBuf,
    pub encoder: String,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn new(output: impl Into<PathBuf>, encoder: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            encoder: encoder.into(),
            overwrite: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.encoder.trim().is_empty() {
            return Err(Error::InvalidArgument("encoder must not be empty".to_string()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("output path must not be empty".to_string()));
        }
        if !self.overwrite && self.output.exists() {
            return Err(Error::InvalidArgument(format!("output file '{}' already exists", self.output.display())));
        }
        Ok(())
    }

    fn ffmpeg_args(&self, dimensions: Dimensions, frame_rate: f64) -> Vec<String> {
        let mut args: Vec<String> = vec![
            if self.overwrite { "-y" } else { "-n" }.to_string(),
            "-hide_banner".into(), "-loglevel".into(), "error".into(),
            "-f".into(), "rawvideo".into(),
            "-pix_fmt".into(), "rgba".into(),
            "-s".into(), dimensions.to_string(),
            "-r".into(), frame_rate.to_string(),
            "-i".into(), "pipe:0".into(),
            "-an".into(),
            // yuv420p needs even sides; 3x scaling of odd sources produces odd ones
            "-vf".into(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-c:v".into(), self.encoder.clone(),
            "-pix_fmt".into(), "yuv420p".into(),
        ];
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    dimensions: Dimensions,
}

impl Encoder {
    /// Reads stderr to the end on its own thread; the pipe must never fill
    /// while frames are still being written to stdin.
    fn drain_stderr(stderr: ChildStderr) -> JoinHandle<String> {
        thread::spawn(move || {
            let mut text = String::new();
            let mut stderr = stderr;
            let _ = stderr.read_to_string(&mut text);
            text
        })
    }

    fn diagnostics(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

/// Encodes pushed RGBA frames by piping them into an `ffmpeg` process.
///
/// The output file only counts as valid once `finalize` succeeds; `discard`
/// and drop both kill the encoder and delete what it wrote.
pub struct FfmpegSink {
    config: EncodeConfig,
    encoder: Option<Encoder>,
}

impl FfmpegSink {
    pub fn new(config: EncodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, encoder: None })
    }

    #[tracing::instrument(skip(self), fields(output = %self.config.output.display(), encoder = %self.config.encoder))]
    fn spawn_ffmpeg_process(&self, dimensions: Dimensions, frame_rate: f64) -> Result<Child> {
        let mut cmd = Command::new("ffmpeg");
        detach_process_group(&mut cmd)
            .args(self.config.ffmpeg_args(dimensions, frame_rate))
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| Error::sink(format!("failed to spawn ffmpeg process: {}", e)))
    }

    fn kill_and_remove(&mut self) -> Result<()> {
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };
        drop(encoder.stdin.take());
        let _ = encoder.child.kill();
        let _ = encoder.child.wait();
        let _ = encoder.diagnostics();
        match std::fs::remove_file(&self.config.output) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::sink(format!(
                "failed to remove partial output '{}': {}",
                self.config.output.display(),
                e
            ))),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn arm(&mut self, dimensions: Dimensions, frame_rate: f64) -> Result<()> {
        if self.encoder.is_some() {
            return Err(Error::sink("encoder is already armed"));
        }
        if let Some(parent) = self.config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::sink(format!("failed to create output directory '{}': {}", parent.display(), e)))?;
        }

        let mut child = self.spawn_ffmpeg_process(dimensions, frame_rate)?;
        let stdin = child.stdin.take();
        if stdin.is_none() {
            let _ = child.kill();
            return Err(Error::sink("failed to open ffmpeg stdin"));
        }
        let stderr = child.stderr.take().map(Encoder::drain_stderr);
        tracing::debug!(%dimensions, frame_rate, "encoder armed");
        self.encoder = Some(Encoder { child, stdin, stderr, dimensions });
        Ok(())
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        let encoder = self.encoder.as_mut().ok_or_else(|| Error::sink("frame pushed before the encoder was armed"))?;
        if frame.dimensions != encoder.dimensions || !frame.is_well_formed() {
            return Err(Error::sink(format!(
                "frame size mismatch: got {}, expected {}",
                frame.dimensions, encoder.dimensions
            )));
        }
        let stdin = encoder.stdin.as_mut().ok_or_else(|| Error::sink("encoder is already finalized"))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| Error::sink(format!("failed to write frame {} to ffmpeg stdin: {}", frame.index, e)))
    }

    fn finalize(&mut self) -> Result<Artifact> {
        let mut encoder = self.encoder.take().ok_or_else(|| Error::sink("finalize called before the encoder was armed"))?;
        if let Some(mut stdin) = encoder.stdin.take() {
            let _ = stdin.flush();
        }
        let status = encoder
            .child
            .wait()
            .map_err(|e| Error::sink(format!("failed to wait for ffmpeg to finish: {}", e)))?;
        let diagnostics = encoder.diagnostics();
        if !status.success() {
            let _ = std::fs::remove_file(&self.config.output);
            return Err(Error::sink(format!("ffmpeg exited with {}: {}", status, diagnostics)));
        }
        if !diagnostics.is_empty() {
            tracing::debug!(%diagnostics, "encoder diagnostics");
        }
        tracing::info!(output = %self.config.output.display(), "output written");
        Ok(Artifact::File(self.config.output.clone()))
    }

    fn discard(&mut self) -> Result<()> {
        self.kill_and_remove()
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            if let Err(e) = self.kill_and_remove() {
                tracing::warn!(error = %e, "failed to clean up unfinished output");
            }
        }
    }
}
