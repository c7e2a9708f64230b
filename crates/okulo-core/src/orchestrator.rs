//! Conversation orchestrator
//!
//! Consumes the microphone frame stream and drives the whole listen →
//! transcribe → respond cycle under the mode machine. In Sleep every frame
//! is scored as a wake gate; a loud frame plays the wake cue and enters
//! Talk. In Talk, frames feed the utterance capture machine; a flushed
//! utterance is transcribed and handed to the response streamer, whose
//! speech fragments go to the speaker pipeline. A long idle Talk session
//! drops back to Sleep.
//!
//! Mid-turn failures (transcription, generation) are logged and the loop
//! keeps listening; the conversation history only advances on a complete
//! successful exchange.

use crate::config::OkuloConfig;
use crate::error::{Error, Result};
use crate::mode::{Mode, ModeHandle};
use async_trait::async_trait;
use okulo_audio::{samples_to_wav, AudioFrame, CaptureEvent, TranscriptionClient, Utterance, UtteranceCapture, WakeDetector};
use okulo_llm::{Conversation, ResponseStreamer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Audible non-speech feedback cues
///
/// Infallible by contract: implementations log their own failures so a
/// broken speaker never blocks the wake transition.
#[async_trait]
pub trait CuePlayer: Send + Sync {
    /// Acknowledgment played when the device wakes
    async fn wake(&self);

    /// Indication that the current turn failed and the device is still
    /// listening
    async fn failure(&self);
}

/// Listen / transcribe / respond loop over the microphone frame stream
pub struct Orchestrator {
    mode: ModeHandle,
    frames: mpsc::Receiver<AudioFrame>,
    wake: Box<dyn WakeDetector>,
    capture: UtteranceCapture,
    stt: Arc<dyn TranscriptionClient>,
    streamer: ResponseStreamer,
    conversation: Conversation,
    fragments: mpsc::Sender<String>,
    cue: Arc<dyn CuePlayer>,
    session_timeout: Duration,
}

impl Orchestrator {
    /// Wire the loop together from configuration and its collaborators
    #[must_use]
    pub fn new(
        config: &OkuloConfig,
        mode: ModeHandle,
        frames: mpsc::Receiver<AudioFrame>,
        wake: Box<dyn WakeDetector>,
        stt: Arc<dyn TranscriptionClient>,
        streamer: ResponseStreamer,
        fragments: mpsc::Sender<String>,
        cue: Arc<dyn CuePlayer>,
    ) -> Self {
        Self {
            mode,
            frames,
            wake,
            capture: UtteranceCapture::new(&config.audio.capture),
            stt,
            streamer,
            conversation: Conversation::new(&config.persona),
            fragments,
            cue,
            session_timeout: Duration::from_secs(config.session_timeout_secs),
        }
    }

    /// Run until cancelled or the frame stream closes
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!("orchestrator running");
        let mut last_turn_at = now();

        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = self.frames.recv() => match frame {
                    Some(frame) => frame,
                    None => return Err(Error::FrameStreamClosed),
                },
            };

            // Timing runs on the capture timeline, so frames queued up
            // behind a slow turn keep their original spacing.
            let at = frame.captured_at;
            let score = self.wake.score(&frame.samples);

            match self.mode.current() {
                Mode::Sleep => {
                    if score >= self.wake.threshold() {
                        debug!(score, "wake gate tripped");
                        self.mode.transition(Mode::WakeUp);
                        self.cue.wake().await;
                        self.mode.transition(Mode::Talk);
                        self.wake.reset();
                        self.capture.reset();
                        // The waking frame opens the first utterance.
                        self.capture.push(&frame.samples, score, at);
                        last_turn_at = at;
                    }
                }
                Mode::WakeUp | Mode::Func => {}
                Mode::Talk => {
                    if let CaptureEvent::Flushed(utterance) =
                        self.capture.push(&frame.samples, score, at)
                    {
                        self.handle_utterance(utterance).await;
                        last_turn_at = at;
                    } else if !self.capture.is_recording()
                        && at.duration_since(last_turn_at) > self.session_timeout
                    {
                        info!("session idle, back to sleep");
                        self.mode.transition(Mode::Sleep);
                        self.wake.reset();
                        self.capture.reset();
                    }
                }
            }
        }

        self.mode.transition(Mode::Sleep);
        info!("orchestrator stopped");
        Ok(())
    }

    async fn handle_utterance(&mut self, utterance: Utterance) {
        debug!(
            samples = utterance.samples.len(),
            duration_ms = utterance.duration.as_millis() as u64,
            "utterance captured"
        );
        let wav = match samples_to_wav(&utterance.samples, utterance.sample_rate) {
            Ok(wav) => wav,
            Err(error) => {
                warn!(%error, "WAV encoding failed, dropping utterance");
                return;
            }
        };
        let text = match self.stt.transcribe(&wav).await {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "transcription failed, still listening");
                self.cue.failure().await;
                return;
            }
        };
        let text = text.trim();
        if text.is_empty() {
            debug!("empty transcription, still listening");
            self.cue.failure().await;
            return;
        }

        info!(text, "user turn");
        match self
            .streamer
            .respond(&mut self.conversation, text, &self.fragments)
            .await
        {
            Ok(reply) => debug!(chars = reply.len(), "assistant turn complete"),
            Err(error) => {
                warn!(%error, "generation failed, conversation unchanged");
                self.cue.failure().await;
            }
        }
    }
}

/// Current time through the tokio clock, so paused-time tests control
/// the pre-wake idle baseline
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use okulo_llm::{
        GenerationClient, GenerationTurn, Message, StreamEvent, ToolDefinition, ToolRegistry,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl TranscriptionClient for FixedTranscriber {
        async fn transcribe(&self, _audio_bytes: &[u8]) -> okulo_audio::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl TranscriptionClient for FailingTranscriber {
        async fn transcribe(&self, _audio_bytes: &[u8]) -> okulo_audio::Result<String> {
            Err(okulo_audio::Error::Stt("offline".to_string()))
        }
    }

    /// Transcriber that parks until the test hands it a permit, so frames
    /// can pile up in the channel behind a slow turn.
    struct GatedTranscriber(Arc<tokio::sync::Semaphore>);

    #[async_trait]
    impl TranscriptionClient for GatedTranscriber {
        async fn transcribe(&self, _audio_bytes: &[u8]) -> okulo_audio::Result<String> {
            self.0
                .acquire()
                .await
                .map_err(|_| okulo_audio::Error::Stt("gate closed".to_string()))?
                .forget();
            Ok("Salom".to_string())
        }
    }

    struct OneLiner(&'static str);

    #[async_trait]
    impl GenerationClient for OneLiner {
        fn name(&self) -> &str {
            "one-liner"
        }

        async fn stream_generate(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> okulo_llm::Result<mpsc::Receiver<okulo_llm::Result<StreamEvent>>> {
            let (tx, rx) = mpsc::channel(8);
            tx.send(Ok(StreamEvent::ContentDelta(self.0.to_string())))
                .await
                .unwrap();
            tx.send(Ok(StreamEvent::Done)).await.unwrap();
            Ok(rx)
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> okulo_llm::Result<GenerationTurn> {
            Ok(GenerationTurn {
                content: self.0.to_string(),
                tool_calls: Vec::new(),
            })
        }
    }

    #[derive(Default)]
    struct CountingCue {
        wakes: AtomicUsize,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl CuePlayer for CountingCue {
        async fn wake(&self) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }

        async fn failure(&self) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    const FRAME: usize = 512;

    fn loud() -> Vec<f32> {
        vec![0.8; FRAME]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; FRAME]
    }

    fn frame_period() -> Duration {
        Duration::from_micros(FRAME as u64 * 1_000_000 / 16_000)
    }

    struct Harness {
        frames: mpsc::Sender<AudioFrame>,
        fragments: mpsc::Receiver<String>,
        mode: ModeHandle,
        cue: Arc<CountingCue>,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<Result<()>>,
    }

    fn spawn(stt: Arc<dyn TranscriptionClient>, reply: &'static str) -> Harness {
        let config = OkuloConfig::default();
        let mode = ModeHandle::new();
        let (frames_tx, frames_rx) = mpsc::channel(64);
        let (fragments_tx, fragments_rx) = mpsc::channel(64);
        let cue = Arc::new(CountingCue::default());
        let streamer =
            ResponseStreamer::new(Arc::new(OneLiner(reply)), Arc::new(ToolRegistry::new()));
        let orchestrator = Orchestrator::new(
            &config,
            mode.clone(),
            frames_rx,
            okulo_audio::wake_detector(&config.audio.capture),
            stt,
            streamer,
            fragments_tx,
            cue.clone(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(orchestrator.run(cancel.clone()));
        Harness {
            frames: frames_tx,
            fragments: fragments_rx,
            mode,
            cue,
            cancel,
            task,
        }
    }

    impl Harness {
        /// Advance the paused clock by one frame period and send a frame
        /// stamped with its capture time.
        async fn push(&self, samples: Vec<f32>) {
            tokio::time::advance(frame_period()).await;
            self.frames
                .send(AudioFrame::new(samples, now()))
                .await
                .unwrap();
        }

        async fn shutdown(self) -> Result<()> {
            self.cancel.cancel();
            self.task.await.unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loud_frame_wakes_and_plays_cue() {
        let harness = spawn(Arc::new(FixedTranscriber("hello")), "Hi!");
        assert_eq!(harness.mode.current(), Mode::Sleep);

        harness.push(loud()).await;
        tokio::task::yield_now().await;

        assert_eq!(harness.mode.current(), Mode::Talk);
        assert_eq!(harness.cue.wakes.load(Ordering::SeqCst), 1);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_frames_leave_sleep_untouched() {
        let harness = spawn(Arc::new(FixedTranscriber("hello")), "Hi!");
        for _ in 0..10 {
            harness.push(quiet()).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(harness.mode.current(), Mode::Sleep);
        assert_eq!(harness.cue.wakes.load(Ordering::SeqCst), 0);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_utterance_flows_to_fragments() {
        let mut harness = spawn(
            Arc::new(FixedTranscriber("what time is it")),
            "It is late, go to bed.",
        );

        // Wake and speak, then go quiet past the silence tail.
        for _ in 0..5 {
            harness.push(loud()).await;
        }
        for _ in 0..40 {
            harness.push(quiet()).await;
        }

        let fragment = harness.fragments.recv().await.expect("spoken fragment");
        assert_eq!(fragment, "It is late, go to bed.");
        assert_eq!(harness.mode.current(), Mode::Talk);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_transcription_keeps_listening() {
        let harness = spawn(Arc::new(FailingTranscriber), "unused");

        for _ in 0..5 {
            harness.push(loud()).await;
        }
        for _ in 0..40 {
            harness.push(quiet()).await;
        }
        tokio::task::yield_now().await;

        // Still in Talk: a transcription failure never ends the session,
        // the device just signals trouble and keeps listening.
        assert_eq!(harness.mode.current(), Mode::Talk);
        assert_eq!(harness.cue.failures.load(Ordering::SeqCst), 1);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_returns_to_sleep() {
        let harness = spawn(Arc::new(FixedTranscriber("")), "unused");

        harness.push(loud()).await;
        // The wake utterance flushes on silence; the empty transcription is
        // skipped, and an hour of quiet outlasts the session timeout.
        for _ in 0..40 {
            harness.push(quiet()).await;
        }
        tokio::time::advance(Duration::from_secs(3600)).await;
        harness.push(quiet()).await;
        tokio::task::yield_now().await;

        assert_eq!(harness.mode.current(), Mode::Sleep);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlogged_frames_flush_on_capture_timeline() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let mut harness = spawn(Arc::new(GatedTranscriber(gate.clone())), "Eshitdim.");

        // First utterance flushes, then the transcriber parks on the gate.
        for _ in 0..5 {
            harness.push(loud()).await;
        }
        for _ in 0..40 {
            harness.push(quiet()).await;
        }
        tokio::task::yield_now().await;

        // A whole second utterance queues up behind the stalled turn. When
        // the gate opens, those frames drain in one burst; the silence tail
        // embedded in their capture stamps must still flush them.
        for _ in 0..5 {
            harness.push(loud()).await;
        }
        for _ in 0..40 {
            harness.push(quiet()).await;
        }
        gate.add_permits(2);

        let first = harness.fragments.recv().await.expect("first reply");
        let second = harness.fragments.recv().await.expect("second reply");
        assert_eq!(first, "Eshitdim.");
        assert_eq!(second, "Eshitdim.");
        harness.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_parks_in_sleep() {
        let harness = spawn(Arc::new(FixedTranscriber("hello")), "Hi!");
        harness.push(loud()).await;
        tokio::task::yield_now().await;
        assert_eq!(harness.mode.current(), Mode::Talk);

        let mode = harness.mode.clone();
        harness.shutdown().await.unwrap();
        assert_eq!(mode.current(), Mode::Sleep);
    }
}
