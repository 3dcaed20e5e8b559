//! CPAL output backend.
//!
//! A `cpal::Stream` is not `Send` on every platform, so each stream is built,
//! driven and dropped on its own `isotone-stream` thread. The control side
//! holds a [`CpalStream`] that forwards play/pause/close over a channel and
//! joins the thread on close, which guarantees the device has stopped
//! calling back by the time `close` returns.
//!
//! The engine renders mono; the adapter duplicates every sample into all
//! device channels and converts to the device sample format.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use super::{AudioBackend, RenderCallback, StreamConfig, StreamHandle};
use crate::error::{EngineError, Result};

/// Names of every output device on the default host.
pub fn output_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices().map_err(EngineError::device)? {
        names.push(dev.name().map_err(EngineError::device)?);
    }
    Ok(names)
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices().map_err(EngineError::device)? {
            if d.name().map_err(EngineError::device)? == name {
                return Ok(d);
            }
        }
        return Err(EngineError::Device(format!("requested device not found: {name}")));
    }
    host.default_output_device()
        .ok_or_else(|| EngineError::Device("no default output device".into()))
}

/// Settle on a concrete device config as close to `req` as the hardware allows.
///
/// Prefers mono at the requested rate, then the device's default channel
/// count at that rate, then the device's default config outright. The buffer
/// size is only pinned when the device reports it can take it.
fn negotiate(device: &cpal::Device, req: &StreamConfig) -> Result<(cpal::StreamConfig, cpal::SampleFormat, StreamConfig)> {
    let default = device.default_output_config().map_err(EngineError::device)?;
    let format = default.sample_format();
    let ranges: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(EngineError::device)?
        .filter(|r| r.sample_format() == format)
        .collect();

    let fits = |r: &&cpal::SupportedStreamConfigRange, ch: u16| {
        r.channels() == ch && r.min_sample_rate().0 <= req.sample_rate && req.sample_rate <= r.max_sample_rate().0
    };
    let chosen = ranges
        .iter()
        .find(|r| fits(r, 1))
        .or_else(|| ranges.iter().find(|r| fits(r, default.channels())));

    let (channels, sample_rate, buffer_range) = match chosen {
        Some(r) => (r.channels(), req.sample_rate, r.buffer_size().clone()),
        None => {
            warn!(
                requested = req.sample_rate,
                fallback = default.sample_rate().0,
                "sample rate not supported by device; using its default"
            );
            (default.channels(), default.sample_rate().0, default.buffer_size().clone())
        }
    };

    let buffer_size = match buffer_range {
        cpal::SupportedBufferSize::Range { min, max } if (min..=max).contains(&req.frames_per_buffer) => {
            cpal::BufferSize::Fixed(req.frames_per_buffer)
        }
        cpal::SupportedBufferSize::Range { min, max } => {
            warn!(requested = req.frames_per_buffer, min, max, "buffer size out of device range; using default");
            cpal::BufferSize::Default
        }
        cpal::SupportedBufferSize::Unknown => cpal::BufferSize::Fixed(req.frames_per_buffer),
    };

    let cfg = cpal::StreamConfig { channels, sample_rate: cpal::SampleRate(sample_rate), buffer_size };
    let actual = StreamConfig { sample_rate, channels: 1, frames_per_buffer: req.frames_per_buffer };
    Ok((cfg, format, actual))
}

/// Mono render callback plus scratch space, fanned out to device frames.
struct MonoAdapter {
    render: RenderCallback,
    scratch: Vec<f32>,
    channels: usize,
}

impl MonoAdapter {
    fn fill<T>(&mut self, output: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let frames = output.len() / self.channels;
        if self.scratch.len() < frames {
            // only when the device hands us a bigger block than negotiated
            self.scratch.resize(frames, 0.0);
        }
        let mono = &mut self.scratch[..frames];
        let render = &mut self.render;
        if panic::catch_unwind(AssertUnwindSafe(|| render(&mut *mono))).is_err() {
            mono.fill(0.0);
        }
        for (frame, &s) in output.chunks_mut(self.channels).zip(mono.iter()) {
            let v: T = T::from_sample(s);
            for ch in frame.iter_mut() { *ch = v; }
        }
    }
}

fn build_stream<T>(device: &cpal::Device, cfg: &cpal::StreamConfig, mut adapter: MonoAdapter) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| adapter.fill(output),
            |e: cpal::StreamError| error!("stream error: {e}"),
            None,
        )
        .map_err(EngineError::device)
}

fn open_on_this_thread(name: Option<&str>, req: &StreamConfig, render: RenderCallback) -> Result<(cpal::Stream, StreamConfig)> {
    let device = pick_device(name)?;
    let (cfg, format, actual) = negotiate(&device, req)?;
    info!(
        device = %device.name().unwrap_or_else(|_| "<unnamed>".into()),
        sample_rate = cfg.sample_rate.0,
        channels = cfg.channels,
        ?format,
        buffer = ?cfg.buffer_size,
        "opening output stream"
    );

    let adapter = MonoAdapter {
        render,
        scratch: vec![0.0; req.frames_per_buffer as usize],
        channels: usize::from(cfg.channels.max(1)),
    };
    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, adapter)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, adapter)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, adapter)?,
        other => return Err(EngineError::Device(format!("unsupported device sample format: {other:?}"))),
    };
    Ok((stream, actual))
}

enum StreamCmd {
    Play,
    Pause,
    Close,
}

fn stream_thread(
    name: Option<String>,
    req: StreamConfig,
    render: RenderCallback,
    cmd_rx: Receiver<StreamCmd>,
    reply_tx: Sender<Result<StreamConfig>>,
) {
    let stream = match open_on_this_thread(name.as_deref(), &req, render) {
        Ok((stream, actual)) => {
            if reply_tx.send(Ok(actual)).is_err() {
                return;
            }
            stream
        }
        Err(e) => {
            let _ = reply_tx.send(Err(e));
            return;
        }
    };

    // A dropped handle disconnects the channel and ends the loop too.
    while let Ok(cmd) = cmd_rx.recv() {
        let res = match cmd {
            StreamCmd::Play => stream.play().map_err(EngineError::device),
            StreamCmd::Pause => stream.pause().map_err(EngineError::device),
            StreamCmd::Close => break,
        };
        if reply_tx.send(res.map(|()| req)).is_err() {
            break;
        }
    }
    drop(stream);
    debug!("output stream closed");
}

/// Opens streams on the default host, optionally on a named device.
#[derive(Clone, Debug, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn with_device(name: impl Into<String>) -> Self { Self { device_name: Some(name.into()) } }
    #[inline] pub fn device_name(&self) -> Option<&str> { self.device_name.as_deref() }
}

impl AudioBackend for CpalBackend {
    type Stream = CpalStream;

    fn open(&mut self, config: &StreamConfig, callback: RenderCallback) -> Result<CpalStream> {
        let (cmd_tx, cmd_rx) = bounded(1);
        let (reply_tx, reply_rx) = bounded(1);
        let name = self.device_name.clone();
        let req = *config;

        let thread = thread::Builder::new()
            .name("isotone-stream".into())
            .spawn(move || stream_thread(name, req, callback, cmd_rx, reply_tx))
            .map_err(EngineError::device)?;

        let reply = reply_rx.recv();
        match reply {
            Ok(Ok(actual)) => Ok(CpalStream { cmd_tx, reply_rx, thread: Some(thread), config: actual }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(EngineError::Device("stream thread exited before reporting".into()))
            }
        }
    }
}

/// Control-side handle to a stream living on its own thread.
pub struct CpalStream {
    cmd_tx: Sender<StreamCmd>,
    reply_rx: Receiver<Result<StreamConfig>>,
    thread: Option<JoinHandle<()>>,
    config: StreamConfig,
}

impl CpalStream {
    fn request(&self, cmd: StreamCmd) -> Result<()> {
        let gone = || EngineError::Device("stream thread is gone".into());
        self.cmd_tx.send(cmd).map_err(|_| gone())?;
        self.reply_rx.recv().map_err(|_| gone())?.map(|_| ())
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = self.cmd_tx.send(StreamCmd::Close);
            if handle.join().is_err() {
                error!("stream thread panicked during shutdown");
            }
        }
    }
}

impl StreamHandle for CpalStream {
    #[inline] fn config(&self) -> StreamConfig { self.config }
    fn start(&mut self) -> Result<()> { self.request(StreamCmd::Play) }
    fn stop(&mut self) -> Result<()> { self.request(StreamCmd::Pause) }

    fn close(mut self) -> Result<()> {
        self.shutdown();
        Ok(())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_fans_out_mono_to_every_channel() {
        let mut adapter = MonoAdapter {
            render: Box::new(|out: &mut [f32]| {
                for (i, s) in out.iter_mut().enumerate() {
                    *s = i as f32 * 0.25;
                }
            }),
            scratch: Vec::new(),
            channels: 2,
        };
        let mut out = [9.0_f32; 8];
        adapter.fill(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75]);
    }

    #[test]
    fn adapter_turns_panics_into_silence() {
        let mut adapter = MonoAdapter {
            render: Box::new(|_out: &mut [f32]| panic!("render blew up")),
            scratch: vec![0.0; 4],
            channels: 1,
        };
        let mut out = [0.7_f32; 4];
        adapter.fill(&mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn adapter_converts_sample_format() {
        let mut adapter = MonoAdapter {
            render: Box::new(|out: &mut [f32]| out.fill(0.0)),
            scratch: vec![0.0; 2],
            channels: 1,
        };
        let mut out = [7_i16; 2];
        adapter.fill(&mut out);
        assert_eq!(out, [0, 0]);
    }
}
