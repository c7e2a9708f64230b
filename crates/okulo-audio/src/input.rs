//! Audio input (microphone capture)

use crate::error::{Error, Result};
use crate::frame::{AudioFrame, Sample};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Audio input stream from the microphone, delivering fixed-size frames
pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    frame_samples: usize,
    stream: Option<Stream>,
    is_capturing: Arc<AtomicBool>,
}

impl AudioInput {
    /// Create a new audio input from the default input device
    pub fn new(sample_rate: u32, frame_samples: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::AudioDevice("No input device found".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| Error::AudioDevice(format!("Failed to get configs: {}", e)))?;

        let mut selected_config = None;
        for config in supported_configs {
            if config.min_sample_rate().0 <= sample_rate
                && config.max_sample_rate().0 >= sample_rate
                && config.sample_format() == SampleFormat::F32
            {
                selected_config = Some(config.with_sample_rate(cpal::SampleRate(sample_rate)));
                break;
            }
        }

        let supported = selected_config.ok_or_else(|| {
            Error::AudioDevice(format!("No config supports {}Hz F32", sample_rate))
        })?;

        let config: StreamConfig = supported.into();

        debug!(
            "Audio config: {} channels, {}Hz, {} samples/frame",
            config.channels, config.sample_rate.0, frame_samples
        );

        Ok(Self {
            device,
            config,
            frame_samples,
            stream: None,
            is_capturing: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the sample rate
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Check if currently capturing
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    /// Start capturing and return a channel of fixed-size frames
    pub fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.is_capturing() {
            return Err(Error::AudioStream("Already capturing".to_string()));
        }

        let (tx, rx) = mpsc::channel::<AudioFrame>(100);
        let is_capturing = self.is_capturing.clone();
        let channels = self.config.channels as usize;
        let frame_samples = self.frame_samples;
        let mut pending: Vec<Sample> = Vec::with_capacity(frame_samples);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !is_capturing.load(Ordering::SeqCst) {
                        return;
                    }

                    // Downmix to mono and rebuffer into fixed-size frames.
                    if channels > 1 {
                        pending.extend(
                            data.chunks(channels)
                                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32),
                        );
                    } else {
                        pending.extend_from_slice(data);
                    }

                    let captured_at = std::time::Instant::now();
                    while pending.len() >= frame_samples {
                        let rest = pending.split_off(frame_samples);
                        let frame =
                            AudioFrame::new(std::mem::replace(&mut pending, rest), captured_at);
                        // Dropping frames under backpressure beats blocking
                        // the audio callback.
                        let _ = tx.try_send(frame);
                    }
                },
                move |err| {
                    error!("Audio input error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioStream(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::AudioStream(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        self.is_capturing.store(true, Ordering::SeqCst);

        info!("Audio capture started");
        Ok(rx)
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
        self.stream = None;
        info!("Audio capture stopped");
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Convert audio samples to WAV bytes
pub fn samples_to_wav(samples: &[Sample], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::AudioStream(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            let amplitude = (sample * i16::MAX as f32) as i16;
            writer
                .write_sample(amplitude)
                .map_err(|e| Error::AudioStream(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::AudioStream(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_to_wav() {
        let samples = vec![0.0f32; 1600]; // 0.1 second at 16kHz
        let wav = samples_to_wav(&samples, 16000).unwrap();

        // WAV header is 44 bytes
        assert!(wav.len() > 44);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
