use crate::error::{Error, Result};
use crate::frame::Dimensions;

use std::path::Path;
use std::process::Command;

/// Stream facts reported by `ffprobe` for the first video stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration: f64,
}

impl VideoInfo {
    #[tracing::instrument]
    pub fn probe(input: &Path) -> Result<Self> {
        let output = Command::new("ffprobe")
            .args([
                "-hide_banner", "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height,r_frame_rate:format=duration",
                "-of", "default=noprint_wrappers=1",
            ])
            .arg(input)
            .output()
            .map_err(|e| Error::source(format!("failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(Error::source(format!(
                "ffprobe failed for {}: {}",
                input.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let data = String::from_utf8(output.stdout)
            .map_err(|e| Error::source(format!("failed to parse ffprobe output: {}", e)))?;
        let info = Self::parse(&data)?;
        tracing::debug!(?info, "probed input");
        Ok(info)
    }

    fn parse(data: &str) -> Result<Self> {
        let mut width = None;
        let mut height = None;
        let mut frame_rate = None;
        let mut duration = None;

        for line in data.lines() {
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                match key {
                    "width" => width = Some(Self::parse_number::<u32>(key, value)?),
                    "height" => height = Some(Self::parse_number::<u32>(key, value)?),
                    "r_frame_rate" => frame_rate = Some(Self::parse_frame_rate(value)?),
                    // containers without a duration report "N/A"
                    "duration" if value != "N/A" => duration = Some(Self::parse_number::<f64>(key, value)?),
                    _ => {}
                }
            }
        }

        let missing = |name: &str| Error::source(format!("ffprobe did not report {}", name));
        Ok(Self {
            width: width.ok_or_else(|| missing("width"))?,
            height: height.ok_or_else(|| missing("height"))?,
            frame_rate: frame_rate.ok_or_else(|| missing("r_frame_rate"))?,
            duration: duration.unwrap_or(0.0),
        })
    }

    fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
        value
            .parse()
            .map_err(|_| Error::source(format!("failed to parse {}: {}", key, value)))
    }

    fn parse_frame_rate(value: &str) -> Result<f64> {
        let fps_parts: Vec<&str> = value.split('/').collect();
        if fps_parts.len() == 2 {
            let num = Self::parse_number::<f64>("frame rate numerator", fps_parts[0])?;
            let den = Self::parse_number::<f64>("frame rate denominator", fps_parts[1])?;
            if den == 0.0 {
                return Err(Error::source(format!("invalid frame rate: {}", value)));
            }
            Ok(num / den)
        } else {
            Err(Error::source(format!("invalid frame rate format: {}", value)))
        }
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        Dimensions::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_key_values() {
        let data = "width=640\nheight=360\nr_frame_rate=30000/1001\nduration=12.500000\n";
        let info = VideoInfo::parse(data).unwrap();
        assert_eq!((info.width, info.height), (640, 360));
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(info.duration, 12.5);
    }

    #[test]
    fn unknown_duration_defaults_to_zero() {
        let data = "width=2\nheight=2\nr_frame_rate=25/1\nduration=N/A\n";
        assert_eq!(VideoInfo::parse(data).unwrap().duration, 0.0);
    }

    #[test]
    fn missing_dimensions_are_reported() {
        let err = VideoInfo::parse("r_frame_rate=25/1\n").unwrap_err();
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn malformed_frame_rate_is_rejected() {
        assert!(VideoInfo::parse_frame_rate("25").is_err());
        assert!(VideoInfo::parse_frame_rate("25/0").is_err());
        assert_eq!(VideoInfo::parse_frame_rate("25/1").unwrap(), 25.0);
    }

    #[test]
    fn zero_width_stream_is_invalid() {
        let info = VideoInfo { width: 0, height: 10, frame_rate: 30.0, duration: 1.0 };
        assert!(matches!(info.dimensions(), Err(Error::InvalidDimensions(_))));
    }
}
