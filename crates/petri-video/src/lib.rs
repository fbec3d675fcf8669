//! Recording automaton runs to video.
//!
//! A [`Recorder`] streams raw RGB frames into an ffmpeg child process; a
//! [`GifRecorder`] encodes an animated GIF in pure Rust. [`record`] drives a
//! [`State`] for a number of generations and delivers one rendered frame per
//! generation, in order, to any [`FrameSink`].
//!
//! # Example
//!
//! ```no_run
//! use petri_automata::{Boundary, Kernel, Rule, State};
//! use petri_image::DrawParams;
//! use petri_video::{record, Recorder, VideoConfig};
//!
//! let mut state = State::random(
//!     &[128, 128],
//!     Kernel::moore(2)?,
//!     Rule::life(),
//!     Boundary::Wrap,
//!     0.3,
//!     7,
//! )?;
//! let draw = DrawParams::new([0, 0, 0], [255, 255, 255], 4)?;
//!
//! let mut recorder = Recorder::create("life.mp4", 512, 512, &VideoConfig::mp4(30))?;
//! record(&mut state, 300, &draw, &mut recorder)?;
//! recorder.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Recording to MP4/WebM requires ffmpeg on `PATH`; GIF output does not.

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbImage, Rgba, RgbaImage};
use thiserror::Error;

use petri_automata::State;
use petri_image::{render, DrawParams, RenderError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors from frame delivery and video encoding.
#[derive(Debug, Error)]
pub enum VideoError {
    /// The encoder binary could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// The binary that was invoked.
        program: String,
        /// The underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// A frame did not match the dimensions declared at construction.
    #[error("frame is {width}x{height}, expected {expected_width}x{expected_height}")]
    FrameSize {
        /// Declared frame width.
        expected_width: u32,
        /// Declared frame height.
        expected_height: u32,
        /// Width of the rejected frame.
        width: u32,
        /// Height of the rejected frame.
        height: u32,
    },

    /// An I/O failure on the output file or the encoder pipe. A broken pipe
    /// usually means the encoder exited early.
    #[error("encoder i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder exited with a failure status.
    #[error("encoder exited with {status}")]
    Encoder {
        /// The child's exit status.
        status: ExitStatus,
    },

    /// The recorder was closed; no more frames can be sent.
    #[error("recorder is closed")]
    Closed,

    /// GIF encoding failed.
    #[error("gif encoding failed: {0}")]
    Gif(#[from] image::ImageError),

    /// The frame rate must be at least 1.
    #[error("frame rate must be at least 1")]
    InvalidFrameRate,
}

/// Errors from a recorded run, tagged with the failing generation.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Rendering a generation to an image failed.
    #[error("rendering generation {generation} failed: {source}")]
    Render {
        /// The generation whose frame could not be rendered.
        generation: u64,
        /// The underlying render failure.
        #[source]
        source: RenderError,
    },

    /// Delivering a rendered frame to the sink failed.
    #[error("delivering the frame for generation {generation} failed: {source}")]
    Sink {
        /// The generation whose frame could not be delivered.
        generation: u64,
        /// The underlying sink failure.
        #[source]
        source: VideoError,
    },
}

/// Accepts rendered frames in generation order.
///
/// Implementations must treat a dimension mismatch as fatal and must write
/// frames out in the order they arrive.
pub trait FrameSink {
    /// Delivers one frame.
    fn push_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError>;
}

// ============================================================================
// The run-and-record driver
// ============================================================================

/// Runs the automaton and delivers one frame per generation.
///
/// The current state is rendered and delivered first, then the state is
/// stepped `ticks` times with a frame after each step: `ticks + 1` frames in
/// total, in strict generation order (`ticks` of 0 delivers a single frame).
/// The first render or delivery failure aborts the run; no further
/// generations are simulated. The sink is left open for the caller to close.
pub fn record<S: FrameSink>(
    state: &mut State,
    ticks: usize,
    params: &DrawParams,
    sink: &mut S,
) -> Result<(), RecordError> {
    deliver(state, params, sink)?;
    for _ in 0..ticks {
        state.step();
        deliver(state, params, sink)?;
    }
    Ok(())
}

fn deliver<S: FrameSink>(
    state: &State,
    params: &DrawParams,
    sink: &mut S,
) -> Result<(), RecordError> {
    let generation = state.generation();
    let frame = render(state.grid(), params)
        .map_err(|source| RecordError::Render { generation, source })?;
    sink.push_frame(&frame)
        .map_err(|source| RecordError::Sink { generation, source })?;
    Ok(())
}

// ============================================================================
// Video recording (via ffmpeg)
// ============================================================================

/// Output container/codec for [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VideoFormat {
    /// MP4 with H.264 codec.
    Mp4,
    /// WebM with VP9 codec.
    WebM,
}

/// Encoder settings for [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VideoConfig {
    /// Output format.
    pub format: VideoFormat,
    /// Frame rate (frames per second).
    pub fps: u32,
    /// Constant Rate Factor (quality). Lower = better. Default 23 for H264,
    /// 31 for VP9.
    pub crf: u32,
    /// Suppress encoder console output.
    pub quiet: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            format: VideoFormat::Mp4,
            fps: 30,
            crf: 23,
            quiet: true,
        }
    }
}

impl VideoConfig {
    /// Config for MP4 output at the given frame rate.
    pub fn mp4(fps: u32) -> Self {
        Self {
            format: VideoFormat::Mp4,
            fps,
            ..Self::default()
        }
    }

    /// Config for WebM output at the given frame rate.
    pub fn webm(fps: u32) -> Self {
        Self {
            format: VideoFormat::WebM,
            fps,
            crf: 31,
            quiet: true,
        }
    }

    /// Sets the quality (CRF). Lower = better quality, larger file.
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf;
        self
    }
}

/// Streams raw RGB frames into an ffmpeg child process.
///
/// The encoder is spawned at construction with its stdin piped; every frame
/// is written as raw `rgb24` bytes. [`Recorder::close`] ends the stream and
/// waits for ffmpeg to finalize the container. Dropping an unclosed recorder
/// closes it best-effort so the child never outlives an early unwind.
pub struct Recorder {
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    frames: u64,
    output: PathBuf,
    closed: bool,
}

impl Recorder {
    /// Spawns ffmpeg writing to `path`, expecting `width x height` frames.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        config: &VideoConfig,
    ) -> Result<Self, VideoError> {
        if config.fps == 0 {
            return Err(VideoError::InvalidFrameRate);
        }
        let output = path.as_ref().to_path_buf();
        let args = encoder_args(config, width, height, &output);

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| VideoError::Spawn {
                program: "ffmpeg".to_string(),
                source,
            })?;
        let stdin = child.stdin.take();

        Ok(Self {
            child,
            stdin,
            width,
            height,
            frames: 0,
            output,
            closed: false,
        })
    }

    /// Sends one frame to the encoder.
    ///
    /// The frame must match the dimensions declared at construction exactly;
    /// a mismatch is rejected before any bytes reach the pipe.
    pub fn send_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        if self.closed {
            return Err(VideoError::Closed);
        }
        check_frame_size(self.width, self.height, frame)?;
        match &mut self.stdin {
            Some(stdin) => stdin.write_all(frame.as_raw())?,
            None => return Err(VideoError::Closed),
        }
        self.frames += 1;
        Ok(())
    }

    /// Frames accepted so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// The output file path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Ends the frame stream and waits for the encoder to finalize the file.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn close(&mut self) -> Result<(), VideoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Dropping stdin sends EOF, which tells ffmpeg to flush and finish.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            return Err(VideoError::Encoder { status });
        }
        Ok(())
    }
}

impl FrameSink for Recorder {
    fn push_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        self.send_frame(frame)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frames)
            .field("output", &self.output)
            .field("closed", &self.closed)
            .finish()
    }
}

/// ffmpeg argument list for a raw RGB pipe into the configured encoder.
fn encoder_args(config: &VideoConfig, width: u32, height: u32, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if config.quiet {
        args.push("-loglevel".into());
        args.push("quiet".into());
    }
    args.push("-y".into()); // Overwrite output
    args.push("-f".into());
    args.push("rawvideo".into());
    args.push("-pixel_format".into());
    args.push("rgb24".into());
    args.push("-video_size".into());
    args.push(format!("{}x{}", width, height).into());
    args.push("-framerate".into());
    args.push(config.fps.to_string().into());
    args.push("-i".into());
    args.push("pipe:".into());

    match config.format {
        VideoFormat::Mp4 => {
            args.push("-c:v".into());
            args.push("libx264".into());
            args.push("-crf".into());
            args.push(config.crf.to_string().into());
            args.push("-pix_fmt".into());
            args.push("yuv420p".into()); // Compatibility
        }
        VideoFormat::WebM => {
            args.push("-c:v".into());
            args.push("libvpx-vp9".into());
            args.push("-crf".into());
            args.push(config.crf.to_string().into());
            args.push("-b:v".into());
            args.push("0".into()); // Use CRF mode
        }
    }

    args.push(output.as_os_str().to_os_string());
    args
}

// ============================================================================
// GIF recording (pure Rust)
// ============================================================================

/// Encodes frames into an animated GIF without external tools.
///
/// Same contract as [`Recorder`]: fixed frame dimensions, frames written in
/// arrival order, [`GifRecorder::finish`] to finalize the file.
pub struct GifRecorder {
    encoder: Option<GifEncoder<File>>,
    width: u32,
    height: u32,
    delay_ms: u32,
    frames: u64,
}

impl GifRecorder {
    /// Creates a GIF recorder writing to `path` at the given frame rate.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, VideoError> {
        if fps == 0 {
            return Err(VideoError::InvalidFrameRate);
        }
        let file = File::create(path)?;
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self {
            encoder: Some(encoder),
            width,
            height,
            delay_ms: 1000 / fps,
            frames: 0,
        })
    }

    /// Frames accepted so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Finalizes the GIF. Frames can no longer be pushed afterwards.
    pub fn finish(mut self) -> Result<(), VideoError> {
        self.encoder.take();
        Ok(())
    }
}

impl FrameSink for GifRecorder {
    fn push_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        check_frame_size(self.width, self.height, frame)?;
        let encoder = match &mut self.encoder {
            Some(encoder) => encoder,
            None => return Err(VideoError::Closed),
        };

        // GIF frames are RGBA.
        let mut rgba = RgbaImage::new(self.width, self.height);
        for (x, y, pixel) in frame.enumerate_pixels() {
            rgba.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], 255]));
        }
        let delay = Delay::from_numer_denom_ms(self.delay_ms, 1);
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        self.frames += 1;
        Ok(())
    }
}

impl std::fmt::Debug for GifRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifRecorder")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frames)
            .finish()
    }
}

fn check_frame_size(
    expected_width: u32,
    expected_height: u32,
    frame: &RgbImage,
) -> Result<(), VideoError> {
    let (width, height) = frame.dimensions();
    if (width, height) != (expected_width, expected_height) {
        return Err(VideoError::FrameSize {
            expected_width,
            expected_height,
            width,
            height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_automata::{Boundary, Grid, Kernel, Rule};

    fn blinker() -> State {
        State::from_grid(
            Grid::from_rows(&[
                vec![0, 0, 0, 0, 0],
                vec![0, 0, 0, 0, 0],
                vec![0, 1, 1, 1, 0],
                vec![0, 0, 0, 0, 0],
                vec![0, 0, 0, 0, 0],
            ])
            .unwrap(),
            Kernel::moore(2).unwrap(),
            Rule::life(),
            Boundary::Wrap,
        )
        .unwrap()
    }

    fn draw() -> DrawParams {
        DrawParams::new([0, 0, 0], [255, 255, 255], 1).unwrap()
    }

    struct CollectingSink {
        frames: Vec<RgbImage>,
    }

    impl FrameSink for CollectingSink {
        fn push_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    struct FailingSink {
        pushed: usize,
        fail_at: usize,
    }

    impl FrameSink for FailingSink {
        fn push_frame(&mut self, _frame: &RgbImage) -> Result<(), VideoError> {
            if self.pushed == self.fail_at {
                return Err(VideoError::Closed);
            }
            self.pushed += 1;
            Ok(())
        }
    }

    #[test]
    fn test_record_emits_ticks_plus_one_frames() {
        let mut state = blinker();
        let mut sink = CollectingSink { frames: Vec::new() };
        record(&mut state, 4, &draw(), &mut sink).unwrap();

        assert_eq!(sink.frames.len(), 5);
        assert_eq!(state.generation(), 4);
        // The blinker has period 2, so frames alternate in generation order.
        assert_eq!(sink.frames[0], sink.frames[2]);
        assert_eq!(sink.frames[1], sink.frames[3]);
        assert_ne!(sink.frames[0], sink.frames[1]);
    }

    #[test]
    fn test_record_zero_ticks_emits_initial_frame() {
        let mut state = blinker();
        let initial = render(state.grid(), &draw()).unwrap();
        let mut sink = CollectingSink { frames: Vec::new() };
        record(&mut state, 0, &draw(), &mut sink).unwrap();

        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0], initial);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_record_aborts_on_sink_failure() {
        let mut state = blinker();
        let mut sink = FailingSink {
            pushed: 0,
            fail_at: 2,
        };
        let err = record(&mut state, 10, &draw(), &mut sink).unwrap_err();

        match err {
            RecordError::Sink { generation, .. } => assert_eq!(generation, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        // The run stopped at the failing generation.
        assert_eq!(state.generation(), 2);
        assert_eq!(sink.pushed, 2);
    }

    #[test]
    fn test_record_aborts_on_render_failure() {
        // A 3D state cannot be rendered; the initial frame already fails.
        let mut state = State::dead(
            &[4, 4, 4],
            Kernel::moore(3).unwrap(),
            Rule::life(),
            Boundary::Wrap,
        )
        .unwrap();
        let mut sink = CollectingSink { frames: Vec::new() };
        let err = record(&mut state, 3, &draw(), &mut sink).unwrap_err();

        match err {
            RecordError::Render { generation, .. } => assert_eq!(generation, 0),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sink.frames.is_empty());
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_encoder_args_mp4() {
        let config = VideoConfig::mp4(30);
        let args = encoder_args(&config, 640, 480, Path::new("out.mp4"));
        let has = |s: &str| args.iter().any(|a| a.to_str() == Some(s));

        assert!(has("-loglevel"));
        assert!(has("rawvideo"));
        assert!(has("rgb24"));
        assert!(has("640x480"));
        assert!(has("30"));
        assert!(has("pipe:"));
        assert!(has("libx264"));
        assert!(has("yuv420p"));
        assert!(has("out.mp4"));
    }

    #[test]
    fn test_encoder_args_webm() {
        let config = VideoConfig::webm(24).with_crf(40);
        let args = encoder_args(&config, 64, 64, Path::new("out.webm"));
        let has = |s: &str| args.iter().any(|a| a.to_str() == Some(s));

        assert!(has("libvpx-vp9"));
        assert!(has("40"));
        assert!(!has("libx264"));
    }

    #[test]
    fn test_video_config_builders() {
        assert_eq!(VideoConfig::mp4(60).fps, 60);
        assert_eq!(VideoConfig::mp4(60).crf, 23);
        assert_eq!(VideoConfig::webm(24).crf, 31);
        assert_eq!(VideoConfig::default().with_crf(18).crf, 18);
    }

    #[test]
    fn test_gif_recorder_rejects_wrong_frame_size() {
        let path = std::env::temp_dir().join("petri_video_test_size.gif");
        let mut recorder = GifRecorder::create(&path, 10, 10, 5).unwrap();
        let frame = RgbImage::new(5, 5);

        let err = recorder.push_frame(&frame).unwrap_err();
        match err {
            VideoError::FrameSize {
                expected_width,
                expected_height,
                width,
                height,
            } => {
                assert_eq!((expected_width, expected_height), (10, 10));
                assert_eq!((width, height), (5, 5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(recorder.frame_count(), 0);

        drop(recorder);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_gif_recording_end_to_end() {
        let path = std::env::temp_dir().join("petri_video_test_blinker.gif");
        let mut state = blinker();
        let mut recorder = GifRecorder::create(&path, 5, 5, 5).unwrap();

        record(&mut state, 4, &draw(), &mut recorder).unwrap();
        assert_eq!(recorder.frame_count(), 5);
        recorder.finish().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_frame_rate() {
        let path = std::env::temp_dir().join("petri_video_test_fps.gif");
        assert!(matches!(
            GifRecorder::create(&path, 8, 8, 0),
            Err(VideoError::InvalidFrameRate)
        ));
        assert!(matches!(
            Recorder::create(&path, 8, 8, &VideoConfig::mp4(0)),
            Err(VideoError::InvalidFrameRate)
        ));
    }

    // Needs ffmpeg on PATH; run with `cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn test_ffmpeg_recording_end_to_end() {
        let path = std::env::temp_dir().join("petri_video_test_life.mp4");
        let mut state = State::random(
            &[64, 64],
            Kernel::moore(2).unwrap(),
            Rule::life(),
            Boundary::Wrap,
            0.3,
            64,
        )
        .unwrap();
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 4).unwrap();

        let mut recorder = Recorder::create(&path, 256, 256, &VideoConfig::mp4(10)).unwrap();
        record(&mut state, 50, &params, &mut recorder).unwrap();
        assert_eq!(recorder.frame_count(), 51);
        recorder.close().unwrap();
        // close() is idempotent.
        recorder.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0);
        let _ = std::fs::remove_file(&path);
    }
}
