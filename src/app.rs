//! Component wiring and the device run loop

use crate::tools::{GetWeather, SwitchLight};
use anyhow::{Context, Result};
use async_trait::async_trait;
use okulo_audio::{
    AudioInput, AudioOutput, OpenAiSpeech, SpeakerPipeline, SpeechToText, TranscriptionClient,
};
use okulo_core::{CuePlayer, ModeHandle, OkuloConfig, Orchestrator};
use okulo_llm::{OpenAiCompatProvider, ResponseStreamer, ToolRegistry};
use okulo_vision::{
    ActuatorGateway, ActuatorTransport, AttentionLoop, Frame, FrameDiffMotion, NullFaceDetector,
    SerialTransport, VideoSource,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Non-speech feedback over the shared speaker
struct BeepCue {
    output: Arc<AudioOutput>,
}

#[async_trait]
impl CuePlayer for BeepCue {
    async fn wake(&self) {
        if let Err(e) = self.output.play_beep().await {
            warn!(error = %e, "wake beep failed");
        }
    }

    async fn failure(&self) {
        // Two short beeps: "heard you, couldn't manage it".
        for _ in 0..2 {
            if let Err(e) = self.output.play_beep().await {
                warn!(error = %e, "failure beep failed");
                return;
            }
        }
    }
}

/// Placeholder video source until a camera backend is plugged in.
///
/// Yields a constant blank frame: detectors find nothing, while blinks
/// and the sleep/wake choreography still run.
struct IdleSource {
    frame: Frame,
}

impl IdleSource {
    fn new(width: u32, height: u32) -> Self {
        Self {
            frame: Frame::new(width, height, vec![0; (width * height) as usize]),
        }
    }
}

impl VideoSource for IdleSource {
    fn read(&mut self) -> okulo_vision::Result<Frame> {
        Ok(self.frame.clone())
    }
}

/// Transport used when the serial device is absent: commands are logged
/// and dropped, so the rest of the device still runs on a dev machine.
struct DetachedTransport;

impl ActuatorTransport for DetachedTransport {
    fn write_frame(&mut self, data: &[u8]) -> okulo_vision::Result<()> {
        debug!(frame = %String::from_utf8_lossy(data).trim_end(), "eyes detached, dropping command");
        Ok(())
    }
}

fn open_gateway(config: &OkuloConfig) -> ActuatorGateway {
    match SerialTransport::open(&config.vision.serial_port, config.vision.baud_rate) {
        Ok(transport) => ActuatorGateway::new(Box::new(transport)),
        Err(e) => {
            warn!(error = %e, "eye actuator unavailable, running detached");
            ActuatorGateway::new(Box::new(DetachedTransport))
        }
    }
}

/// Wire everything together and run until ctrl-c
pub async fn run(config: OkuloConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let mode = ModeHandle::new();

    // Language side: provider, tools, streamer.
    let provider = Arc::new(OpenAiCompatProvider::from_env().context("chat provider")?);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GetWeather));
    registry.register(Arc::new(SwitchLight));
    info!(tools = registry.len(), "tool registry ready");
    let streamer = ResponseStreamer::new(provider, Arc::new(registry))
        .with_min_fragment_chars(config.min_fragment_chars);

    // Speaker: one output device shared by cues and reply playback.
    let output = Arc::new(AudioOutput::new().context("audio output")?);
    let synthesis = Arc::new(OpenAiSpeech::from_env(&config.audio.speech).context("speech synthesis")?);
    let pipeline = SpeakerPipeline::spawn(synthesis, output.clone(), cancel.clone());

    // Microphone.
    let stt: Arc<dyn TranscriptionClient> =
        Arc::new(SpeechToText::new(&config.audio.speech.language));
    let mut input = AudioInput::new(
        config.audio.capture.sample_rate,
        config.audio.capture.frame_samples,
    )
    .context("audio input")?;
    let frames = input.start().context("audio capture")?;

    // Eyes: independent sibling task, isolated from the voice pipeline.
    let attention = AttentionLoop::new(
        &config.vision,
        Box::new(IdleSource::new(
            1280,
            config.vision.calibration.frame_height as u32,
        )),
        Box::new(NullFaceDetector),
        Box::new(FrameDiffMotion::new(50, 1000)),
        open_gateway(&config),
        Box::new(mode.clone()),
    );
    let attention_task = tokio::spawn(attention.run(cancel.clone()));

    let orchestrator = Orchestrator::new(
        &config,
        mode,
        frames,
        okulo_audio::wake_detector(&config.audio.capture),
        stt,
        streamer,
        pipeline.fragments(),
        Arc::new(BeepCue {
            output: output.clone(),
        }),
    );
    let orchestrator_task = tokio::spawn(orchestrator.run(cancel.clone()));

    info!("okulo is listening; press ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("signal handler")?;

    info!("shutting down");
    cancel.cancel();
    orchestrator_task.await.context("orchestrator task")??;
    let _ = attention_task.await;
    pipeline.shutdown().await;
    input.stop();

    Ok(())
}
