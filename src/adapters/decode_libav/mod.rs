// Decode LibAV adapter - Sequential frame decoding using libav

use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as Scaler, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::codec::threading;
use ffmpeg_next::{codec, Packet, Rational};
use image::RgbImage;
use tracing::{debug, info};

use crate::domain::model::{Frame, StreamInfo};
use crate::engine::detector::FALLBACK_FRAME_RATE;
use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::FrameSource;

/// Frame source decoding the best video stream of a file to RGB
pub struct LibavFrameSource {
    input: Input,
    decoder: codec::decoder::Video,
    scaler: Scaler,
    stream_index: usize,
    info: StreamInfo,
    next_index: u64,
    eof_sent: bool,
}

impl LibavFrameSource {
    /// Open `path` and prepare its best video stream for decoding
    pub fn open(path: &Path) -> SceneCutResult<Self> {
        if !path.exists() {
            return Err(SceneCutError::InputFileNotFound {
                path: path.display().to_string(),
            });
        }

        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| SceneCutError::decode(format!("cannot open {}: {}", path.display(), e)))?;

        let (stream_index, parameters, frame_rate, frames) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| SceneCutError::decode(format!("no video stream in {}", path.display())))?;
            (
                stream.index(),
                stream.parameters(),
                rational_to_fps(stream.avg_frame_rate())
                    .or_else(|| rational_to_fps(stream.rate()))
                    .unwrap_or(FALLBACK_FRAME_RATE),
                stream.frames(),
            )
        };

        let threads = decode_thread_count();
        let decoder = codec::context::Context::from_parameters(parameters)
            .and_then(|mut context| {
                context.set_threading(threading::Config {
                    kind: threading::Type::Frame,
                    count: threads,
                    ..Default::default()
                });
                context.decoder().video()
            })
            .map_err(|e| SceneCutError::decode(format!("cannot create decoder: {}", e)))?;
        debug!("Decoding with {} threads", threads);

        let scaler = Scaler::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            Flags::BILINEAR,
        )?;

        let frame_count = estimate_frame_count(frames, input.duration(), frame_rate);
        let info = StreamInfo {
            frame_rate,
            frame_count,
            width: decoder.width(),
            height: decoder.height(),
        };
        info!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames",
            path.display(),
            info.width,
            info.height,
            info.frame_rate,
            frame_count.map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            info,
            next_index: 0,
            eof_sent: false,
        })
    }

    fn next_packet(&mut self) -> Option<Packet> {
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.stream_index {
                return Some(packet);
            }
        }
        None
    }

    fn to_frame(&mut self, decoded: &Video) -> SceneCutResult<Frame> {
        let mut rgb = Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| SceneCutError::decode(format!("pixel conversion failed: {}", e)))?;

        let (width, height) = (rgb.width(), rgb.height());
        let stride = rgb.stride(0);
        let row_bytes = width as usize * 3;
        let data = rgb.data(0);

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }

        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| SceneCutError::decode("decoded frame has unexpected size"))?;
        let frame = Frame {
            index: self.next_index,
            image,
        };
        self.next_index += 1;
        Ok(frame)
    }
}

impl FrameSource for LibavFrameSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_next_frame(&mut self) -> SceneCutResult<Option<Frame>> {
        let mut decoded = Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.to_frame(&decoded).map(Some);
            }
            if self.eof_sent {
                debug!("Decoder drained after {} frames", self.next_index);
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| SceneCutError::decode(format!("corrupt packet: {}", e)))?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

/// Frame rate of `path`'s best video stream, if it can be read
pub fn probe_frame_rate(path: &Path) -> Option<f64> {
    let input = ffmpeg_next::format::input(&path).ok()?;
    let stream = input.streams().best(Type::Video)?;
    rational_to_fps(stream.avg_frame_rate()).or_else(|| rational_to_fps(stream.rate()))
}

fn rational_to_fps(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(f64::from(rate))
    } else {
        None
    }
}

/// Decoder threads: three quarters of the cores, between 1 and 16
pub fn decode_thread_count() -> usize {
    let cores = num_cpus::get();
    ((cores * 3).div_ceil(4)).clamp(1, 16)
}

/// Container frame count, else duration (in AV_TIME_BASE units) times frame rate
fn estimate_frame_count(frames: i64, duration: i64, frame_rate: f64) -> Option<u64> {
    if frames > 0 {
        return Some(frames as u64);
    }
    if duration > 0 && frame_rate > 0.0 {
        let seconds = duration as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
        return Some((seconds * frame_rate).round() as u64);
    }
    None
}
