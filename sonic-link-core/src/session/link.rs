use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, CaptureDiagnostics, LevelSample, WaveformBuffer};
use crate::models::config::LinkConfiguration;
use crate::models::error::LinkError;
use crate::models::events::LinkEvent;
use crate::models::protocol::Protocol;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::processing::wav_format::load_wav;
use crate::session::capture::CaptureSession;
use crate::session::dispatcher::{EventDispatcher, EventEmitter};
use crate::session::playback::PlaybackSession;
use crate::session::receive::ReceivePipeline;
use crate::session::recorder::{save_waveform, DiagnosticRecorder};
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::delegate::LinkDelegate;
use crate::traits::engine::AcousticEngine;
use crate::traits::permission::PermissionProvider;
use crate::traits::playback_provider::PlaybackProvider;

/// Everything a link session needs from the platform.
pub struct LinkProviders<C, O> {
    pub capture: C,
    pub output: O,
    pub permission: Arc<dyn PermissionProvider>,
}

/// One acoustic link: listen for messages, transmit messages, keep a
/// diagnostic recording of what was heard.
///
/// Data flow while listening:
/// ```text
/// [CaptureProvider] → downmix/resample → ┬→ [DiagnosticRecorder]
///                                        ├→ [LevelMeter] ──────────────┐
///                                        └→ [FrameReassembler]          │
///                                             → [DecodeOrchestrator] ───┴→ event queue → [LinkDelegate]
/// ```
///
/// All methods take `&self`; the session can be shared across threads.
/// Dropping it stops capture and flushes pending events to the delegate.
pub struct LinkSession<C, O, E>
where
    C: CaptureProvider,
    O: PlaybackProvider,
    E: AcousticEngine + 'static,
{
    config: LinkConfiguration,
    capture: Mutex<CaptureSession<C>>,
    playback: PlaybackSession<O>,
    engine: Arc<Mutex<E>>,
    recorder: Arc<Mutex<DiagnosticRecorder>>,
    levels: Arc<Mutex<Option<LevelSample>>>,
    emitter: EventEmitter,
    dispatcher: Mutex<EventDispatcher>,
}

impl<C, O, E> LinkSession<C, O, E>
where
    C: CaptureProvider,
    O: PlaybackProvider,
    E: AcousticEngine + 'static,
{
    pub fn new(
        config: LinkConfiguration,
        providers: LinkProviders<C, O>,
        engine: E,
        delegate: Arc<dyn LinkDelegate>,
    ) -> Result<Self, LinkError> {
        config.validate().map_err(LinkError::ConfigurationFailed)?;
        if engine.sample_rate() != config.sample_rate {
            return Err(LinkError::ConfigurationFailed(format!(
                "engine runs at {} Hz but session is configured for {} Hz",
                engine.sample_rate(),
                config.sample_rate
            )));
        }

        let dispatcher = EventDispatcher::spawn(delegate, config.event_queue_capacity)?;
        let emitter = dispatcher.emitter();

        let mut capture = CaptureSession::new(providers.capture, providers.permission, config.sample_rate);
        let state_emitter = emitter.clone();
        capture.set_state_observer(Box::new(move |state: &CaptureState| {
            state_emitter.emit(LinkEvent::StateChanged(state.clone()));
        }));

        log::info!(
            "link session ready: {} Hz, framing {:?}, default protocol {:?}",
            config.sample_rate,
            config.framing,
            config.default_protocol
        );

        Ok(Self {
            playback: PlaybackSession::from_config(providers.output, &config),
            capture: Mutex::new(capture),
            engine: Arc::new(Mutex::new(engine)),
            recorder: Arc::new(Mutex::new(DiagnosticRecorder::from_config(&config))),
            levels: Arc::new(Mutex::new(None)),
            emitter,
            dispatcher: Mutex::new(dispatcher),
            config,
        })
    }

    pub fn config(&self) -> &LinkConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.capture.lock().state()
    }

    pub fn is_listening(&self) -> bool {
        self.capture.lock().is_active()
    }

    pub fn input_device(&self) -> AudioSource {
        self.capture.lock().device_info()
    }

    pub fn output_device(&self) -> AudioSource {
        self.playback.device_info()
    }

    /// Start the receive path. Blocks while a permission prompt is open.
    ///
    /// Each run starts from a clean orchestrator; the diagnostic recording
    /// keeps accumulating across runs until cleared.
    pub fn start_listening(&self) -> Result<(), LinkError> {
        let mut capture = self.capture.lock();
        if capture.state().is_busy() {
            log::warn!("start_listening ignored: already listening");
            return Err(LinkError::AlreadyActive);
        }

        self.recorder.lock().prepare();
        *self.levels.lock() = None;
        let pipeline = ReceivePipeline::new(
            &self.config,
            Arc::clone(&self.engine),
            Arc::clone(&self.recorder),
            Arc::clone(&self.levels),
            capture.diagnostics_handle(),
            self.emitter.clone(),
        );

        capture.start(pipeline.into_handler()).inspect_err(|e| self.report(e))
    }

    /// Stop the receive path. No-op when not listening.
    pub fn stop_listening(&self) -> Result<(), LinkError> {
        self.capture.lock().stop()
    }

    /// Most recent level sample of the current run.
    pub fn current_levels(&self) -> Option<LevelSample> {
        *self.levels.lock()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        let mut diagnostics = self.capture.lock().diagnostics();
        diagnostics.events_dropped = self.emitter.dropped_count();
        let recorder = self.recorder.lock();
        diagnostics.recorded_samples = recorder.len() as u64;
        diagnostics.recording_dropped_samples = recorder.dropped_samples();
        diagnostics
    }

    pub fn available_protocols(&self) -> Vec<Protocol> {
        self.engine.lock().available_protocols()
    }

    /// Synthesize `text` without playing it.
    pub fn encode(&self, text: &str, protocol: Protocol, volume: u8) -> Result<WaveformBuffer, LinkError> {
        if text.is_empty() {
            return Err(LinkError::EncodingFailed("text is empty".into()));
        }
        if volume > 100 {
            return Err(LinkError::ConfigurationFailed(format!("volume {volume} is above 100")));
        }

        let mut engine = self.engine.lock();
        let samples = engine.encode(text, protocol, volume)?;
        Ok(WaveformBuffer::new(samples, engine.sample_rate()))
    }

    /// Render `waveform` through the speaker, blocking until it finishes.
    pub fn play_waveform(&self, waveform: &WaveformBuffer) -> Result<(), LinkError> {
        self.playback.play(waveform).inspect_err(|e| self.report(e))
    }

    /// Encode and play `text`, falling back to the configured protocol and volume.
    pub fn transmit(&self, text: &str, protocol: Option<Protocol>, volume: Option<u8>) -> Result<(), LinkError> {
        let protocol = protocol.unwrap_or(self.config.default_protocol);
        let volume = volume.unwrap_or(self.config.default_volume);
        log::info!("transmitting {} chars with {:?} at volume {}", text.len(), protocol, volume);

        let waveform = self.encode(text, protocol, volume)?;
        self.play_waveform(&waveform)
    }

    /// Save the diagnostic recording to the configured output directory.
    pub fn save_recorded_audio(&self) -> Result<RecordingResult, LinkError> {
        self.save_recorded_audio_to(&self.config.output_directory)
    }

    pub fn save_recorded_audio_to(&self, dir: &Path) -> Result<RecordingResult, LinkError> {
        // Snapshot first so file I/O never holds the lock the capture thread needs.
        let waveform = self.recorder.lock().to_waveform()?;
        save_waveform(&waveform, dir).inspect_err(|e| self.report(e))
    }

    pub fn clear_recorded_audio(&self) {
        self.recorder.lock().clear();
        log::debug!("diagnostic recording cleared");
    }

    pub fn recorded_samples(&self) -> usize {
        self.recorder.lock().len()
    }

    /// Play back the in-memory diagnostic recording.
    pub fn play_recorded_audio(&self) -> Result<(), LinkError> {
        let waveform = self.recorder.lock().to_waveform()?;
        self.play_waveform(&waveform)
    }

    /// Play a WAV file, typically one written by [`LinkSession::save_recorded_audio`].
    pub fn play_recording(&self, path: &Path) -> Result<(), LinkError> {
        let waveform = load_wav(path)?;
        if waveform.is_empty() {
            return Err(LinkError::NoData);
        }
        self.play_waveform(&waveform)
    }

    /// Stop capture and deliver queued events. The session stays usable.
    pub fn shutdown(&self) {
        if let Err(e) = self.stop_listening() {
            log::warn!("error stopping capture during shutdown: {}", e);
        }
    }

    fn report(&self, error: &LinkError) {
        if !error.is_recoverable() {
            self.emitter.emit(LinkEvent::Error {
                message: error.to_string(),
            });
        }
    }
}

impl<C, O, E> Drop for LinkSession<C, O, E>
where
    C: CaptureProvider,
    O: PlaybackProvider,
    E: AcousticEngine + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
        self.dispatcher.lock().shutdown();
    }
}
