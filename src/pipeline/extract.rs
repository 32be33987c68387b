use super::source::{FrameSource, Pull, SourceMetadata};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::process::detach_process_group;
use crate::video::VideoInfo;

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;

use crossbeam_channel::{bounded, Receiver, RecvError, Sender};

/// One running `ffmpeg` decode and the channel its reader thread fills.
struct Decoder {
    child: Option<Child>,
    receiver: Receiver<Result<Frame>>,
}

impl Decoder {
    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Reaps the decoder after its output is exhausted.
    fn finish(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(Error::source(format!("ffmpeg exited with {}", status)));
            }
        }
        Ok(())
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decodes a video file with `ffmpeg` into RGBA frames at a fixed frame rate.
///
/// Decoding runs on a background thread one frame ahead of the caller.
/// Every call to `metadata` rewinds to the first frame, and dropping the
/// source stops the decoder.
pub struct FfmpegSource {
    input: PathBuf,
    frame_rate: f64,
    info: Option<VideoInfo>,
    decoder: Option<Decoder>,
}

impl FfmpegSource {
    const PNG_FOOTER_SIGNATURE: &'static [u8] = &[0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];
    const CHUNK_SIZE: usize = 1024 * 100; // 100KB
    const MAX_FRAME_BUFFER_SIZE: usize = 1024 * 1024 * 64; // 64MB

    pub fn new(input: impl Into<PathBuf>, frame_rate: f64) -> Self {
        Self {
            input: input.into(),
            frame_rate,
            info: None,
            decoder: None,
        }
    }

    fn find_png_footer(data: &[u8]) -> Option<usize> {
        data.windows(Self::PNG_FOOTER_SIGNATURE.len())
            .position(|window| window == Self::PNG_FOOTER_SIGNATURE)
            .map(|pos| pos + Self::PNG_FOOTER_SIGNATURE.len())
    }

    #[tracing::instrument(skip(self), fields(input = %self.input.display()))]
    fn spawn_ffmpeg_process(&self) -> Result<Child> {
        let mut cmd = Command::new("ffmpeg");
        detach_process_group(&mut cmd)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(&self.input)
            .args([
                "-an",
                "-r", &self.frame_rate.to_string(),
                "-pix_fmt", "rgba",
                "-vcodec", "png",
                "-f", "image2pipe",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| Error::source(format!("failed to spawn ffmpeg process: {}", e)))
    }

    /// Splits the next complete PNG off `frame_buffer`, reading more from
    /// `stdout` as needed. `Ok(None)` means the decoder has no more frames.
    fn next_png(
        frame_buffer: &mut Vec<u8>,
        read_chunk: &mut [u8],
        stdout: &mut impl Read,
    ) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(index) = Self::find_png_footer(frame_buffer) {
                return Ok(Some(frame_buffer.drain(..index).collect()));
            }
            if frame_buffer.len() > Self::MAX_FRAME_BUFFER_SIZE {
                return Err(Error::source(format!("frame buffer is too large: {}", frame_buffer.len())));
            }
            let size = stdout.read(read_chunk)?;
            if size == 0 {
                if !frame_buffer.is_empty() {
                    tracing::warn!(bytes = frame_buffer.len(), "decoder ended mid-frame");
                }
                return Ok(None);
            }
            frame_buffer.extend_from_slice(&read_chunk[..size]);
        }
    }

    fn process_stdout(mut stdout: ChildStdout, sender: Sender<Result<Frame>>) {
        let mut frame_buffer = Vec::new();
        let mut read_chunk = vec![0u8; Self::CHUNK_SIZE];
        let mut index = 0;

        loop {
            let frame = Self::next_png(&mut frame_buffer, &mut read_chunk, &mut stdout)
                .and_then(|bytes| bytes.map(|bytes| Frame::from_png_bytes(index, &bytes)).transpose());
            match frame {
                Ok(None) => break,
                Ok(Some(frame)) => {
                    if sender.send(Ok(frame)).is_err() {
                        break;
                    }
                    index += 1;
                }
                Err(e) => {
                    let _ = sender.send(Err(e));
                    break;
                }
            }
        }
    }

    fn start(&self) -> Result<Decoder> {
        let (sender, receiver) = bounded(1);
        let mut child = self.spawn_ffmpeg_process()?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::source("failed to open ffmpeg stdout"));
        };
        thread::spawn(move || Self::process_stdout(stdout, sender));
        Ok(Decoder { child: Some(child), receiver })
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&mut self) -> Result<SourceMetadata> {
        if let Some(mut decoder) = self.decoder.take() {
            tracing::debug!("stopping previous decode");
            decoder.stop();
        }
        let info = match self.info {
            Some(info) => info,
            None => {
                let info = VideoInfo::probe(&self.input)?;
                self.info = Some(info);
                info
            }
        };
        Ok(SourceMetadata {
            dimensions: info.dimensions()?,
            duration: info.duration,
            frame_rate: info.frame_rate,
        })
    }

    fn pull(&mut self) -> Result<Pull> {
        let decoder = match self.decoder.take() {
            Some(decoder) => decoder,
            None => self.start()?,
        };
        let decoder = self.decoder.insert(decoder);
        match decoder.receiver.recv() {
            Ok(Ok(frame)) => Ok(Pull::Frame(frame)),
            Ok(Err(e)) => Err(e),
            Err(RecvError) => {
                decoder.finish()?;
                Ok(Pull::EndOfStream)
            }
        }
    }
}
