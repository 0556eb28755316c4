//! Audio output using cpal.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt::Display;
use std::thread;

use audiolet_core::{ContextOptions, Error, Result};
use crossbeam_channel::{bounded, Sender};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, SampleFormat, Stream, StreamConfig,
};
use tracing::{debug, error, info};

use crate::destination::Destination;

/// What the device actually opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputConfig {
    sample_rate: u32,
    channels: u16,
    device_name: String,
}

/// Handle to the thread that owns the device stream.
///
/// cpal streams are not `Send`, so the stream lives on its own thread.
/// Dropping the handle closes the shutdown channel; the thread then drops the
/// stream and exits.
pub struct AudioOutput {
    device_name: String,
    destination: Destination,
    _shutdown: Sender<()>,
}

impl AudioOutput {
    /// Open the default output device and start pulling from a new destination.
    pub fn open(options: &ContextOptions) -> Result<Self> {
        let options = options.clone();
        Self::spawn(move || start_stream(&options))
    }

    /// Run `start` on the output thread and hold whatever it returns until
    /// this handle is dropped.
    fn spawn<S, F>(start: F) -> Result<Self>
    where
        S: 'static,
        F: FnOnce() -> Result<(S, OutputConfig, Destination)> + Send + 'static,
    {
        let (ready_tx, ready_rx) = bounded::<Result<(OutputConfig, Destination)>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match start() {
                    Ok((stream, config, destination)) => {
                        let _ = ready_tx.send(Ok((config, destination)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Nothing is ever sent; this returns once the handle is gone
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output stream closed");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {e}")))?;

        let (config, destination) = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Output thread exited during startup".to_string()))??;

        info!(
            "Audio output initialized: {} Hz, {} channels, device: {}",
            config.sample_rate, config.channels, config.device_name
        );

        Ok(Self {
            device_name: config.device_name,
            destination,
            _shutdown: shutdown_tx,
        })
    }

    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// A device that was found but cannot be driven.
fn unusable_device(what: &str, err: impl Display) -> Error {
    Error::UnsupportedEnvironment(format!("{what}: {err}"))
}

fn start_stream(options: &ContextOptions) -> Result<(Stream, OutputConfig, Destination)> {
    let host = cpal::default_host();

    let device = host.default_output_device().ok_or_else(|| {
        Error::UnsupportedEnvironment("No audio output device found".to_string())
    })?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio output device: {device_name}");

    let supported_config = device
        .default_output_config()
        .map_err(|e| unusable_device("Failed to get output config", e))?;
    debug!("Supported output config: {:?}", supported_config);

    let sample_format = supported_config.sample_format();
    let mut config: StreamConfig = supported_config.into();
    if let Some(rate) = options.sample_rate {
        config.sample_rate = cpal::SampleRate(rate);
    }
    if let Some(channels) = options.channels {
        config.channels = channels;
    }

    let destination = Destination::new(config.sample_rate.0, config.channels);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, destination.clone())?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, destination.clone())?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, destination.clone())?,
        _ => {
            return Err(Error::UnsupportedEnvironment(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| unusable_device("Failed to start stream", e))?;

    let output_config = OutputConfig {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
        device_name,
    };

    Ok((stream, output_config, destination))
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    destination: Destination,
) -> Result<Stream> {
    let err_fn = |err| {
        error!("Audio stream error: {err}");
    };

    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                let mixed = &mut scratch[..data.len()];
                destination.render(mixed);

                for (sample, value) in data.iter_mut().zip(mixed.iter()) {
                    *sample = T::from_sample(*value);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| unusable_device("Failed to build stream", e))
}
