use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{Result, VideoError};
use crate::video::io::{FrameSink, FrameSource};
use crate::video::types::{Frame, FrameRate, StreamDescriptor};

const STDERR_TAIL_LINES: usize = 5;

/// Stream information reported by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub descriptor: StreamDescriptor,
    pub codec: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Parse the JSON printed by `ffprobe -of json -show_entries stream=...`
pub fn parse_probe_output(json: &str) -> Result<ProbeInfo> {
    let output: ProbeOutput = serde_json::from_str(json).map_err(|e| VideoError::UnsupportedFormat {
        format: format!("unreadable ffprobe output: {}", e),
    })?;

    let stream = output.streams.into_iter().next().ok_or_else(|| VideoError::UnsupportedFormat {
        format: "no video stream".to_string(),
    })?;

    let codec = stream.codec_name.unwrap_or_else(|| "unknown".to_string());

    // avg_frame_rate matches what players report; r_frame_rate is the fallback
    // for streams where the average is unknown ("0/0")
    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(FrameRate::parse))
        .ok_or_else(|| VideoError::UnsupportedFormat {
            format: format!("{} stream without a usable frame rate", codec),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VideoError::UnsupportedFormat {
                format: format!("{} stream without frame dimensions", codec),
            }.into())
        }
    };

    Ok(ProbeInfo {
        descriptor: StreamDescriptor::new(frame_rate, width, height),
        codec,
    })
}

/// Video I/O backed by external ffmpeg/ffprobe processes
pub struct FfmpegVideoIo {
    config: VideoConfig,
}

impl FfmpegVideoIo {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn check_ffmpeg_available(&self) -> bool {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Read frame rate and dimensions of the first video stream
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> Result<ProbeInfo> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        File::open(path).map_err(|e| VideoError::SourceUnavailable {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;
        if !path.is_file() {
            return Err(VideoError::SourceUnavailable {
                path: path_str,
                reason: "not a regular file".to_string(),
            }.into());
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=codec_name,width,height,avg_frame_rate,r_frame_rate",
                "-of", "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::SourceUnavailable {
                path: path_str.clone(),
                reason: format!("failed to run {}: {}", self.config.ffprobe_path.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::UnsupportedFormat {
                format: format!("{}: {}", path_str, stderr.trim()),
            }.into());
        }

        let json = String::from_utf8_lossy(&output.stdout);
        let info = parse_probe_output(&json)?;

        info!("Video metadata: {}x{} @ {} fps ({})",
              info.descriptor.width, info.descriptor.height,
              info.descriptor.frame_rate, info.codec);

        Ok(info)
    }

    /// Open `path` for sequential RGB24 frame reads
    pub fn open_source<P: AsRef<Path>>(&self, path: P) -> Result<FfmpegSource> {
        let path = path.as_ref();
        let info = self.probe(path)?;

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(self.decoder_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::SourceUnavailable {
                path: path.display().to_string(),
                reason: format!("failed to spawn ffmpeg decoder: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::SourceUnavailable {
            path: path.display().to_string(),
            reason: "failed to capture ffmpeg stdout".to_string(),
        })?;

        let stderr = drain_stderr(child.stderr.take());

        debug!("Decoder started for {:?}", path);

        Ok(FfmpegSource {
            path: path.to_path_buf(),
            codec: info.codec,
            descriptor: info.descriptor,
            child,
            stdout: Some(stdout),
            stderr,
            frames_read: 0,
        })
    }

    /// Create `path` and open it for sequential frame writes
    pub fn open_destination<P: AsRef<Path>>(
        &self,
        path: P,
        descriptor: StreamDescriptor,
    ) -> Result<FfmpegSink> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        File::create(path).map_err(|e| VideoError::DestinationUnavailable {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let args = self.encoder_args(&descriptor);
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                let reason = if e.kind() == ErrorKind::NotFound {
                    format!("ffmpeg executable not found at {}", self.config.ffmpeg_path.display())
                } else {
                    format!("failed to spawn ffmpeg encoder: {}", e)
                };
                VideoError::DestinationUnavailable { path: path_str.clone(), reason }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::DestinationUnavailable {
            path: path_str.clone(),
            reason: "failed to capture ffmpeg stdin".to_string(),
        })?;
        let stderr = drain_stderr(child.stderr.take());

        debug!("Encoder started: ffmpeg {} {}", args.join(" "), path_str);

        Ok(FfmpegSink {
            path: path.to_path_buf(),
            codec: self.config.codec.clone(),
            descriptor,
            child: Some(child),
            stdin: Some(stdin),
            stderr,
            frames_written: 0,
        })
    }

    fn decoder_args(&self, path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(path.as_os_str().to_owned());
        args.extend(
            [
                "-map", "0:v:0",
                "-an",
                // Older than `-fps_mode`, still accepted by current releases
                "-vsync", "passthrough",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }

    fn encoder_args(&self, descriptor: &StreamDescriptor) -> Vec<String> {
        vec![
            "-hide_banner".to_owned(),
            "-loglevel".to_owned(),
            "error".to_owned(),
            "-y".to_owned(),
            "-f".to_owned(),
            "rawvideo".to_owned(),
            "-pix_fmt".to_owned(),
            "rgb24".to_owned(),
            "-s:v".to_owned(),
            format!("{}x{}", descriptor.width, descriptor.height),
            "-r".to_owned(),
            descriptor.frame_rate.to_string(),
            "-i".to_owned(),
            "-".to_owned(),
            "-an".to_owned(),
            "-c:v".to_owned(),
            self.config.codec.clone(),
            "-q:v".to_owned(),
            self.config.qscale().to_string(),
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
        ]
    }
}

/// Decoding side: ffmpeg writes packed RGB24 frames to our pipe
pub struct FfmpegSource {
    path: PathBuf,
    codec: String,
    descriptor: StreamDescriptor,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frames_read: u64,
}

impl FfmpegSource {
    fn mid_stream(&self, reason: String) -> VideoError {
        VideoError::MidStream { frame_index: self.frames_read, reason }
    }

    fn finish_decoder(&mut self) -> Result<()> {
        self.stdout = None;
        let status = self.child.wait().map_err(|e| self.mid_stream(e.to_string()))?;
        if status.success() {
            return Ok(());
        }

        let tail = stderr_tail(&mut self.stderr);
        // ffprobe accepted the container but the decoder never produced a frame
        if self.frames_read == 0 {
            return Err(VideoError::UnsupportedFormat {
                format: format!("{} stream in {} cannot be decoded: {}",
                                self.codec, self.path.display(), tail),
            }.into());
        }
        Err(self.mid_stream(format!(
            "ffmpeg decoder for {} exited with {}: {}",
            self.path.display(),
            status,
            tail
        )).into())
    }
}

impl FrameSource for FfmpegSource {
    fn descriptor(&self) -> StreamDescriptor {
        self.descriptor
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let frame_len = self.descriptor.frame_len();
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;

        while filled < frame_len {
            match stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.mid_stream(format!("failed to read from ffmpeg: {}", e)).into()),
            }
        }

        if filled == 0 {
            self.finish_decoder()?;
            debug!("Decoder reached end of stream after {} frames", self.frames_read);
            return Ok(None);
        }

        if filled < frame_len {
            return Err(self.mid_stream(format!(
                "truncated frame: {} of {} bytes",
                filled, frame_len
            )).into());
        }

        let frame = Frame::from_rgb_bytes(self.descriptor.width, self.descriptor.height, buffer)
            .ok_or_else(|| self.mid_stream("frame buffer size mismatch".to_string()))?;
        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if self.stdout.take().is_some() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Encoding side: we write packed RGB24 frames to ffmpeg's stdin
pub struct FfmpegSink {
    path: PathBuf,
    codec: String,
    descriptor: StreamDescriptor,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    frames_written: u64,
}

impl FfmpegSink {
    fn mid_stream(&self, reason: String) -> VideoError {
        VideoError::MidStream { frame_index: self.frames_written, reason }
    }

    fn encoder_failure(&self, what: String, tail: String) -> VideoError {
        if rejects_codec(&tail) {
            return VideoError::UnsupportedFormat {
                format: format!("codec '{}' rejected by ffmpeg: {}", self.codec, tail),
            };
        }
        self.mid_stream(format!("{}: {}", what, tail))
    }
}

/// Keep reading ffmpeg's stderr in the background so a chatty child never
/// blocks on a full pipe while we are busy with its stdin/stdout
fn drain_stderr(pipe: Option<ChildStderr>) -> Option<JoinHandle<String>> {
    pipe.map(|pipe| {
        thread::spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            for line in BufReader::new(pipe).lines().map_while(|line| line.ok()) {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join(" | ")
        })
    })
}

/// Last few lines ffmpeg printed; only call once the child has exited
fn stderr_tail(stderr: &mut Option<JoinHandle<String>>) -> String {
    stderr
        .take()
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn rejects_codec(stderr: &str) -> bool {
    stderr.contains("Unknown encoder") || stderr.contains("Encoder not found")
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        if !frame.matches(&self.descriptor) {
            return Err(self.mid_stream(format!(
                "frame is {}x{}, stream is {}x{}",
                frame.width(), frame.height(),
                self.descriptor.width, self.descriptor.height
            )).into());
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(self.mid_stream("encoder already closed".to_string()).into());
        };

        if let Err(e) = stdin.write_all(frame.as_rgb_bytes()) {
            // ffmpeg quits before reading any input when it cannot open the encoder
            self.stdin = None;
            if let Some(mut child) = self.child.take() {
                let _ = child.wait();
            }
            let tail = stderr_tail(&mut self.stderr);
            return Err(self.encoder_failure(format!("failed to write frame to ffmpeg: {}", e), tail).into());
        }

        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                warn!("Failed to flush ffmpeg stdin: {}", e);
            }
        }

        let status = child.wait().map_err(|e| self.mid_stream(e.to_string()))?;
        let tail = stderr_tail(&mut self.stderr);

        if !status.success() {
            return Err(self.encoder_failure(format!("ffmpeg encoder exited with {}", status), tail).into());
        }

        info!("Wrote {} frames to {:?}", self.frames_written, self.path);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Closing stdin lets ffmpeg finalize whatever was written so far
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}
