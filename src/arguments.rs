use crate::error::{Error, Result};
use crate::frame::ScaleFactor;
use crate::pipeline::{JobOptions, DEFAULT_TARGET_FRAME_RATE};

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use clap::Parser;

const VIDEO_FORMATS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "flv"];

#[derive(Parser, Debug)]
#[command(name = "bilinear_video_upscaler", version, about = "Enlarge a video with bilinear resampling and sharpening")]
pub struct Arguments {
    /// Input video file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output video file [default: upscaled_<scale>x_<input name> next to the input]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scale factor
    #[arg(short, long, default_value_t = 2, allow_negative_numbers = true)]
    pub scale: i64,

    /// Frame rate frames are sampled and encoded at
    #[arg(long, default_value_t = DEFAULT_TARGET_FRAME_RATE)]
    pub fps: f64,

    /// Video encoder passed to ffmpeg
    #[arg(short, long, default_value = "libx264")]
    pub encoder: String,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Arguments {
    pub fn job_options(&self) -> Result<JobOptions> {
        let options = JobOptions {
            scale: ScaleFactor::new(self.scale)?,
            target_frame_rate: self.fps,
        };
        options.validate()?;
        Ok(options)
    }

    /// Output path, defaulting to `upscaled_<scale>x_<file name>` beside the input.
    pub fn output_path(&self) -> Result<PathBuf> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let file_name = self
            .input
            .file_name()
            .ok_or_else(|| Error::InvalidArgument(format!("input has no file name: {}", self.input.display())))?;
        let name = format!("upscaled_{}x_{}", self.scale, file_name.to_string_lossy());
        Ok(self.input.with_file_name(name))
    }

    pub fn validate_input(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(Error::InvalidArgument(format!("input file not found: {}", self.input.display())));
        }
        if !is_video_file(&self.input) {
            return Err(Error::InvalidArgument(format!(
                "unsupported input format: {} (expected one of {})",
                self.input.display(),
                VIDEO_FORMATS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn check_ffmpeg(&self) -> Result<()> {
        for binary in ["ffmpeg", "ffprobe"] {
            let available = Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !available {
                return Err(Error::FfmpegNotAvailable);
            }
        }
        Ok(())
    }

    pub fn validate_encoder(&self) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .map_err(|_| Error::FfmpegNotAvailable)?;

        let encoders = String::from_utf8_lossy(&output.stdout);
        if !lists_encoder(&encoders, &self.encoder) {
            return Err(Error::UnsupportedEncoder(self.encoder.clone()));
        }
        Ok(())
    }
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_lowercase)
        .is_some_and(|ext| VIDEO_FORMATS.contains(&ext.as_str()))
}

/// `ffmpeg -encoders` prints one encoder per line as `<flags> <name> <description>`.
fn lists_encoder(listing: &str, encoder: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == encoder)
}
