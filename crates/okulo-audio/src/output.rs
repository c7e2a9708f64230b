//! Speaker playback and the ordered fragment pipeline
//!
//! [`AudioOutput`] wraps the default output device. [`SpeakerPipeline`]
//! connects reply fragments to the speaker through two stages: a synthesis
//! stage that fetches audio for each fragment in emission order, and a
//! single playback stage that plays them strictly in that order. Fragment
//! k+1 can be synthesizing while fragment k is still playing.

use crate::error::{Error, Result};
use crate::tts::SynthesisBackend;
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capability to play a complete audio clip
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the clip and return when playback finishes
    async fn play_and_wait(&self, audio: &[u8]) -> Result<()>;
}

struct PlayRequest {
    clip: Vec<u8>,
    done: oneshot::Sender<Result<()>>,
}

/// Audio output for playing sounds
///
/// The rodio output stream is not `Send`, so a dedicated thread owns the
/// device exclusively; callers hand clips over a channel and await
/// completion.
pub struct AudioOutput {
    requests: mpsc::Sender<PlayRequest>,
}

impl AudioOutput {
    /// Create a new audio output using the default output device
    pub fn new() -> Result<Self> {
        let (requests, mut queue) = mpsc::channel::<PlayRequest>(8);
        let (init_tx, init_rx) = std::sync::mpsc::channel();

        std::thread::Builder::new()
            .name("okulo-speaker".to_string())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = init_tx.send(Err(Error::AudioDevice(format!(
                            "Failed to get output device: {e}"
                        ))));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));
                // The stream must outlive every sink built on its handle.
                let _stream = stream;

                while let Some(request) = queue.blocking_recv() {
                    let result = play_clip(&handle, &request.clip);
                    let _ = request.done.send(result);
                }
                debug!("speaker thread stopped");
            })
            .map_err(|e| Error::AudioDevice(format!("Failed to spawn speaker thread: {e}")))?;

        init_rx
            .recv()
            .map_err(|_| Error::AudioDevice("speaker thread died during init".to_string()))??;

        info!("Audio output initialized");
        Ok(Self { requests })
    }

    /// Play a short acknowledgment beep (wake feedback)
    pub async fn play_beep(&self) -> Result<()> {
        // 440Hz for 100ms with a fade to avoid clicks.
        let sample_rate = 44_100u32;
        let duration_samples = sample_rate / 10;
        let frequency = 440.0f32;

        let mut samples = Vec::with_capacity(duration_samples as usize);
        for i in 0..duration_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin();
            let envelope = if i < 1000 {
                i as f32 / 1000.0
            } else if i > duration_samples - 1000 {
                (duration_samples - i) as f32 / 1000.0
            } else {
                1.0
            };
            samples.push((sample * envelope * 0.3 * i16::MAX as f32) as i16);
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::AudioStream(format!("Failed to create beep: {}", e)))?;
            for sample in samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::AudioStream(format!("Failed to write beep: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| Error::AudioStream(format!("Failed to finalize beep: {}", e)))?;
        }

        self.play_and_wait(&cursor.into_inner()).await
    }
}

#[async_trait]
impl AudioSink for AudioOutput {
    async fn play_and_wait(&self, audio: &[u8]) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.requests
            .send(PlayRequest {
                clip: audio.to_vec(),
                done: done_tx,
            })
            .await
            .map_err(|_| Error::AudioStream("speaker thread stopped".to_string()))?;

        let result = done_rx
            .await
            .map_err(|_| Error::AudioStream("speaker thread stopped".to_string()))?;

        debug!("Audio playback completed");
        result
    }
}

/// Decode and play one clip to completion on the speaker thread
fn play_clip(handle: &OutputStreamHandle, clip: &[u8]) -> Result<()> {
    let cursor = Cursor::new(clip.to_vec());

    let source = Decoder::new(cursor)
        .map_err(|e| Error::AudioStream(format!("Failed to decode audio: {}", e)))?;

    let sink = Sink::try_new(handle)
        .map_err(|e| Error::AudioStream(format!("Failed to create sink: {}", e)))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

/// Capacity of the fragment queue feeding the synthesis stage
const FRAGMENT_QUEUE: usize = 16;

/// Capacity of the synthesized-audio queue feeding playback
const AUDIO_QUEUE: usize = 4;

/// Ordered fragment-to-speaker pipeline
pub struct SpeakerPipeline {
    fragments: mpsc::Sender<String>,
    synth_task: JoinHandle<()>,
    playback_task: JoinHandle<()>,
}

impl SpeakerPipeline {
    /// Spawn the synthesis and playback stages
    #[must_use]
    pub fn spawn(
        backend: Arc<dyn SynthesisBackend>,
        sink: Arc<dyn AudioSink>,
        cancel: CancellationToken,
    ) -> Self {
        let (fragment_tx, fragment_rx) = mpsc::channel(FRAGMENT_QUEUE);
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_QUEUE);

        let synth_task = tokio::spawn(run_synth_stage(
            backend,
            fragment_rx,
            audio_tx,
            cancel.clone(),
        ));
        let playback_task = tokio::spawn(run_playback_stage(sink, audio_rx, cancel));

        Self {
            fragments: fragment_tx,
            synth_task,
            playback_task,
        }
    }

    /// Sender for reply fragments, in playback order
    #[must_use]
    pub fn fragments(&self) -> mpsc::Sender<String> {
        self.fragments.clone()
    }

    /// Close the queue and wait for queued fragments to finish playing
    pub async fn shutdown(self) {
        drop(self.fragments);
        let _ = self.synth_task.await;
        let _ = self.playback_task.await;
    }
}

/// Synthesis stage: fragments in, per-fragment audio streams out
async fn run_synth_stage(
    backend: Arc<dyn SynthesisBackend>,
    mut fragments: mpsc::Receiver<String>,
    audio_tx: mpsc::Sender<mpsc::Receiver<Result<bytes::Bytes>>>,
    cancel: CancellationToken,
) {
    loop {
        let fragment = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            fragment = fragments.recv() => match fragment {
                Some(f) => f,
                None => break,
            },
        };

        match backend.synthesize_stream(&fragment).await {
            Ok(audio) => {
                if audio_tx.send(audio).await.is_err() {
                    break;
                }
            }
            // A failed fragment is skipped; the reply continues.
            Err(e) => warn!(error = %e, "synthesis failed, skipping fragment"),
        }
    }
    debug!("synthesis stage stopped");
}

/// Playback stage: plays each fragment's audio to completion, in order
async fn run_playback_stage(
    sink: Arc<dyn AudioSink>,
    mut audio_rx: mpsc::Receiver<mpsc::Receiver<Result<bytes::Bytes>>>,
    cancel: CancellationToken,
) {
    loop {
        let mut audio = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            audio = audio_rx.recv() => match audio {
                Some(a) => a,
                None => break,
            },
        };

        // The decoder needs the complete container, so a fragment is
        // buffered whole; playback overlaps synthesis across fragments,
        // not within one.
        let mut clip = Vec::new();
        let mut failed = false;
        while let Some(chunk) = audio.recv().await {
            match chunk {
                Ok(bytes) => clip.extend_from_slice(&bytes),
                Err(e) => {
                    warn!(error = %e, "audio stream broke, skipping fragment");
                    failed = true;
                    break;
                }
            }
        }
        if failed || clip.is_empty() {
            continue;
        }

        if let Err(e) = sink.play_and_wait(&clip).await {
            warn!(error = %e, "playback failed");
        }
    }
    debug!("playback stage stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Backend that "synthesizes" a fragment into its UTF-8 bytes, split in
    /// two chunks.
    struct EchoBackend;

    #[async_trait]
    impl SynthesisBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            Ok(Bytes::from(text.as_bytes().to_vec()))
        }

        async fn synthesize_stream(&self, text: &str) -> Result<mpsc::Receiver<Result<Bytes>>> {
            let (tx, rx) = mpsc::channel(4);
            let bytes = text.as_bytes().to_vec();
            tokio::spawn(async move {
                let mid = bytes.len() / 2;
                let _ = tx.send(Ok(Bytes::from(bytes[..mid].to_vec()))).await;
                let _ = tx.send(Ok(Bytes::from(bytes[mid..].to_vec()))).await;
            });
            Ok(rx)
        }
    }

    /// Backend that fails for one marked fragment
    struct FlakyBackend;

    #[async_trait]
    impl SynthesisBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            Ok(Bytes::from(text.as_bytes().to_vec()))
        }

        async fn synthesize_stream(&self, text: &str) -> Result<mpsc::Receiver<Result<Bytes>>> {
            if text.contains("bad") {
                return Err(Error::Tts("synthesis refused".to_string()));
            }
            EchoBackend.synthesize_stream(text).await
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        played: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play_and_wait(&self, audio: &[u8]) -> Result<()> {
            self.played.lock().unwrap().push(audio.to_vec());
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fragments_play_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = SpeakerPipeline::spawn(
            Arc::new(EchoBackend),
            sink.clone(),
            CancellationToken::new(),
        );

        let tx = pipeline.fragments();
        tx.send("birinchi jumla.".to_string()).await.unwrap();
        tx.send("ikkinchi jumla.".to_string()).await.unwrap();
        tx.send("uchinchi.".to_string()).await.unwrap();
        drop(tx);
        pipeline.shutdown().await;

        let played = sink.played.lock().unwrap();
        assert_eq!(played.len(), 3);
        assert_eq!(played[0], b"birinchi jumla.");
        assert_eq!(played[1], b"ikkinchi jumla.");
        assert_eq!(played[2], b"uchinchi.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_fragment_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = SpeakerPipeline::spawn(
            Arc::new(FlakyBackend),
            sink.clone(),
            CancellationToken::new(),
        );

        let tx = pipeline.fragments();
        tx.send("yaxshi boshlanish.".to_string()).await.unwrap();
        tx.send("bad fragment".to_string()).await.unwrap();
        tx.send("yakun.".to_string()).await.unwrap();
        drop(tx);
        pipeline.shutdown().await;

        let played = sink.played.lock().unwrap();
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], b"yaxshi boshlanish.");
        assert_eq!(played[1], b"yakun.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancellation_stops_playback() {
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        let pipeline =
            SpeakerPipeline::spawn(Arc::new(EchoBackend), sink.clone(), cancel.clone());

        cancel.cancel();
        let tx = pipeline.fragments();
        let _ = tx.send("kech qolgan jumla.".to_string()).await;
        drop(tx);
        pipeline.shutdown().await;

        assert!(sink.played.lock().unwrap().is_empty());
    }
}
