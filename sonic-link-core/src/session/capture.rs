use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFrame, AudioSource, CaptureDiagnostics};
use crate::models::error::LinkError;
use crate::models::state::CaptureState;
use crate::processing::resampler::{downmix_to_mono_into, Resampler};
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::permission::{PermissionProvider, PermissionStatus};

/// Receives every captured block as mono samples at the session's rate.
///
/// Runs on the backend's audio thread.
pub type BlockHandler = Box<dyn FnMut(AudioFrame<'_>) + Send + 'static>;

/// Observer for capture state transitions.
pub type StateObserver = Box<dyn Fn(&CaptureState) + Send + Sync + 'static>;

/// Normalizes raw provider buffers before they reach the handler.
///
/// Scratch buffers grow to the largest block seen and are reused. The
/// resampler lives as long as the stream, so partial chunks carry over
/// between callbacks.
struct BlockStage {
    resampler: Resampler,
    mono: Vec<f32>,
    resampled: Vec<f32>,
    handler: BlockHandler,
    diagnostics: Arc<Mutex<CaptureDiagnostics>>,
}

impl BlockStage {
    fn process(&mut self, samples: &[f32], sample_rate: u32, channels: u16) {
        downmix_to_mono_into(samples, channels.max(1) as usize, &mut self.mono);

        if let Err(e) = self.resampler.process(&self.mono, sample_rate, &mut self.resampled) {
            log::warn!("dropping {} Hz block: {}", sample_rate, e);
            self.resampled.clear();
        }

        {
            let mut d = self.diagnostics.lock();
            d.callback_count += 1;
            d.samples_total += self.resampled.len() as u64;
            d.input_sample_rate = sample_rate;
            d.input_channels = channels;
        }

        if self.resampled.is_empty() {
            return;
        }
        (self.handler)(AudioFrame::new(&self.resampled, self.resampler.target_sample_rate()));
    }
}

/// Owns the microphone stream for one listener.
///
/// At most one stream is live per session: `start` while requesting
/// permission or active is rejected with `AlreadyActive`.
pub struct CaptureSession<C: CaptureProvider> {
    provider: C,
    permission: Arc<dyn PermissionProvider>,
    target_sample_rate: u32,
    state: CaptureState,
    started_at: Option<Instant>,
    diagnostics: Arc<Mutex<CaptureDiagnostics>>,
    observer: Option<StateObserver>,
}

impl<C: CaptureProvider> CaptureSession<C> {
    pub fn new(provider: C, permission: Arc<dyn PermissionProvider>, target_sample_rate: u32) -> Self {
        Self {
            provider,
            permission,
            target_sample_rate,
            state: CaptureState::Idle,
            started_at: None,
            diagnostics: Arc::new(Mutex::new(CaptureDiagnostics::default())),
            observer: None,
        }
    }

    pub fn set_state_observer(&mut self, observer: StateObserver) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> CaptureState {
        match (&self.state, self.started_at) {
            (CaptureState::Active { .. }, Some(start)) => CaptureState::Active {
                duration_secs: start.elapsed().as_secs_f64(),
            },
            (state, _) => state.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.diagnostics.lock().clone()
    }

    /// Shared counters, for stages downstream of the block handler.
    pub fn diagnostics_handle(&self) -> Arc<Mutex<CaptureDiagnostics>> {
        Arc::clone(&self.diagnostics)
    }

    pub fn device_info(&self) -> AudioSource {
        self.provider.device_info()
    }

    pub fn provider(&self) -> &C {
        &self.provider
    }

    /// Authorize, open the stream and begin delivering blocks to `handler`.
    ///
    /// Blocks while the user answers a permission prompt. Returns once the
    /// stream is live. Transitions: idle → requesting_permission → active.
    pub fn start(&mut self, handler: BlockHandler) -> Result<(), LinkError> {
        if self.state.is_busy() {
            log::warn!("capture start rejected: session already active");
            return Err(LinkError::AlreadyActive);
        }

        self.set_state(CaptureState::RequestingPermission);
        let status = match self.permission.status() {
            PermissionStatus::Undetermined => {
                log::info!("requesting microphone access");
                self.permission.request_access()
            }
            status => status,
        };
        if status != PermissionStatus::Granted {
            return Err(self.fail(LinkError::PermissionDenied));
        }

        if !self.provider.is_available() {
            let name = self.provider.device_info().name;
            return Err(self.fail(LinkError::DeviceUnavailable(format!("{name} is not available"))));
        }

        *self.diagnostics.lock() = CaptureDiagnostics::default();
        let stage = Mutex::new(BlockStage {
            resampler: Resampler::new(self.target_sample_rate),
            mono: Vec::new(),
            resampled: Vec::new(),
            handler,
            diagnostics: Arc::clone(&self.diagnostics),
        });
        let callback: AudioBufferCallback = Arc::new(move |samples: &[f32], sample_rate: u32, channels: u16| {
            stage.lock().process(samples, sample_rate, channels);
        });

        if let Err(e) = self.provider.start(callback) {
            // Release whatever the backend managed to acquire.
            if let Err(stop_err) = self.provider.stop() {
                log::warn!("cleanup after failed start: {}", stop_err);
            }
            let error = match e {
                LinkError::DeviceUnavailable(_) | LinkError::PermissionDenied => e,
                other => LinkError::DeviceUnavailable(other.to_string()),
            };
            return Err(self.fail(error));
        }

        self.started_at = Some(Instant::now());
        self.set_state(CaptureState::Active { duration_secs: 0.0 });
        log::info!(
            "capture started on {} at {} Hz",
            self.provider.device_info().name,
            self.target_sample_rate
        );
        Ok(())
    }

    /// Halt delivery and release the device. Safe from any state.
    pub fn stop(&mut self) -> Result<(), LinkError> {
        if self.state.is_active() {
            self.set_state(CaptureState::Stopping);
        }

        let result = self.provider.stop();
        if let Err(ref e) = result {
            log::error!("capture provider failed to stop cleanly: {}", e);
        }

        if let Some(start) = self.started_at.take() {
            log::info!("capture stopped after {:.1}s", start.elapsed().as_secs_f64());
            log::debug!("capture diagnostics: {:?}", self.diagnostics.lock());
        }
        if !self.state.is_idle() {
            self.set_state(CaptureState::Idle);
        }
        result
    }

    fn fail(&mut self, error: LinkError) -> LinkError {
        log::warn!("capture start failed: {}", error);
        self.set_state(CaptureState::Failed { error: error.clone() });
        error
    }

    fn set_state(&mut self, new_state: CaptureState) {
        self.state = new_state;
        if let Some(ref observer) = self.observer {
            observer(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::resampler::RESAMPLER_CHUNK;
    use crate::testing::{FixedPermission, MockCapture};
    use crate::traits::permission::AlwaysGranted;

    fn recording_handler() -> (BlockHandler, Arc<Mutex<Vec<(usize, u32)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: BlockHandler = Box::new(move |frame: AudioFrame<'_>| {
            sink.lock().push((frame.len(), frame.sample_rate));
        });
        (handler, seen)
    }

    #[test]
    fn stop_before_start_succeeds() {
        let (capture, _handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);

        assert!(session.stop().is_ok());
        assert!(session.state().is_idle());
    }

    #[test]
    fn start_delivers_mono_resampled_blocks() {
        let (capture, handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);
        let (handler, seen) = recording_handler();

        session.start(handler).unwrap();
        assert!(session.is_active());

        // 256 stereo frames at 24 kHz → 256 mono → ~512 at 48 kHz
        assert!(handle.push(&vec![0.1; 512], 24000, 2));
        assert!(handle.push(&vec![0.1; 1024], 48000, 1));

        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, 48000);
        assert!((496..=528).contains(&seen[0].0), "got {}", seen[0].0);
        assert_eq!(seen[1], (1024, 48000));

        let diag = session.diagnostics();
        assert_eq!(diag.callback_count, 2);
        assert_eq!(diag.samples_total, (seen[0].0 + 1024) as u64);
        assert_eq!(diag.input_sample_rate, 48000);
        assert_eq!(diag.input_channels, 1);
    }

    #[test]
    fn small_callbacks_at_44k_keep_target_rate() {
        let (capture, handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);
        let (handler, seen) = recording_handler();
        session.start(handler).unwrap();

        let blocks = 44100 / 64;
        for _ in 0..blocks {
            assert!(handle.push(&[0.1; 64], 44100, 1));
        }

        let input = (blocks * 64) as f64;
        let ratio = 48000.0 / 44100.0;
        let delivered: usize = seen.lock().iter().map(|(len, _)| len).sum();
        // At most one partial chunk is still held by the resampler.
        let low = (input - RESAMPLER_CHUNK as f64) * ratio - 16.0;
        let high = input * ratio + 16.0;
        assert!(
            (low..=high).contains(&(delivered as f64)),
            "{} samples delivered for {} input frames",
            delivered,
            input
        );

        let diag = session.diagnostics();
        assert_eq!(diag.callback_count, blocks as u64);
        assert_eq!(diag.samples_total, delivered as u64);
    }

    #[test]
    fn second_start_is_rejected_without_disturbing_stream() {
        let (capture, handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);
        let (first, seen) = recording_handler();
        let (second, _) = recording_handler();

        session.start(first).unwrap();
        assert_eq!(session.start(second), Err(LinkError::AlreadyActive));

        assert!(session.is_active());
        assert!(handle.push(&[0.0; 64], 48000, 1));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(handle.start_count(), 1);
    }

    #[test]
    fn denied_permission_never_opens_device() {
        let (capture, handle) = MockCapture::new();
        let permission = Arc::new(FixedPermission::new(PermissionStatus::Denied, PermissionStatus::Denied));
        let mut session = CaptureSession::new(capture, permission.clone(), 48000);
        let (handler, _) = recording_handler();

        assert_eq!(session.start(handler), Err(LinkError::PermissionDenied));

        assert_eq!(handle.start_count(), 0);
        assert_eq!(permission.request_count(), 0);
        assert!(matches!(session.state(), CaptureState::Failed { error: LinkError::PermissionDenied }));
    }

    #[test]
    fn undetermined_permission_prompts_once() {
        let (capture, handle) = MockCapture::new();
        let permission = Arc::new(FixedPermission::new(PermissionStatus::Undetermined, PermissionStatus::Granted));
        let mut session = CaptureSession::new(capture, permission.clone(), 48000);
        let (handler, _) = recording_handler();

        session.start(handler).unwrap();

        assert_eq!(permission.request_count(), 1);
        assert_eq!(handle.start_count(), 1);
    }

    #[test]
    fn provider_failure_maps_to_device_unavailable_and_releases() {
        let (capture, handle) = MockCapture::failing(LinkError::Unknown("no format".into()));
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);
        let (handler, _) = recording_handler();

        let err = session.start(handler).unwrap_err();

        assert!(matches!(err, LinkError::DeviceUnavailable(_)));
        assert_eq!(handle.stop_count(), 1);
        assert!(!session.is_active());
    }

    #[test]
    fn state_transitions_are_observed() {
        let (capture, _handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_state_observer(Box::new(move |state: &CaptureState| {
            sink.lock().push(state.clone());
        }));
        let (handler, _) = recording_handler();

        session.start(handler).unwrap();
        session.stop().unwrap();
        session.stop().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                CaptureState::RequestingPermission,
                CaptureState::Active { duration_secs: 0.0 },
                CaptureState::Stopping,
                CaptureState::Idle,
            ]
        );
    }

    #[test]
    fn restart_after_stop() {
        let (capture, handle) = MockCapture::new();
        let mut session = CaptureSession::new(capture, Arc::new(AlwaysGranted), 48000);

        let (first, _) = recording_handler();
        session.start(first).unwrap();
        session.stop().unwrap();
        assert!(!handle.push(&[0.0; 8], 48000, 1));

        let (second, seen) = recording_handler();
        session.start(second).unwrap();
        assert!(handle.push(&[0.0; 8], 48000, 1));
        assert_eq!(seen.lock().len(), 1);
    }
}
