//! Scripted engines and mock providers for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, DeviceKind};
use crate::models::error::LinkError;
use crate::models::protocol::Protocol;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::engine::{DecodeEngine, EncodeEngine};
use crate::traits::permission::{PermissionProvider, PermissionStatus};
use crate::traits::playback_provider::PlaybackProvider;

/// Engine behaviour for one decoded frame.
#[derive(Debug, Clone, Default)]
pub struct FrameScript {
    pub receiving: bool,
    pub analyzing: bool,
    pub text: Option<String>,
}

impl FrameScript {
    pub fn flags(receiving: bool, analyzing: bool) -> Self {
        Self {
            receiving,
            analyzing,
            text: None,
        }
    }
}

/// Decode engine that replays a per-frame script; frames past the end are silent.
pub struct ScriptedEngine {
    script: Vec<FrameScript>,
    frame_lengths: Vec<usize>,
    receiving: bool,
    analyzing: bool,
    sample_rate: u32,
    samples_per_char: usize,
}

impl ScriptedEngine {
    pub fn from_script(sample_rate: u32, script: Vec<FrameScript>) -> Self {
        Self {
            script,
            frame_lengths: Vec::new(),
            receiving: false,
            analyzing: false,
            sample_rate,
            samples_per_char: 48,
        }
    }

    pub fn silent(sample_rate: u32) -> Self {
        Self::from_script(sample_rate, Vec::new())
    }

    pub fn frames_seen(&self) -> usize {
        self.frame_lengths.len()
    }

    pub fn frame_lengths(&self) -> &[usize] {
        &self.frame_lengths
    }
}

impl DecodeEngine for ScriptedEngine {
    fn decode(&mut self, samples: &[f32]) -> Option<String> {
        let step = self
            .script
            .get(self.frame_lengths.len())
            .cloned()
            .unwrap_or_default();
        self.frame_lengths.push(samples.len());
        self.receiving = step.receiving;
        self.analyzing = step.analyzing;
        step.text
    }

    fn is_receiving(&self) -> bool {
        self.receiving
    }

    fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl EncodeEngine for ScriptedEngine {
    /// One millisecond of constant signal per character at 48 kHz, scaled by volume.
    fn encode(&mut self, text: &str, _protocol: Protocol, volume: u8) -> Result<Vec<f32>, LinkError> {
        let amplitude = volume as f32 / 100.0;
        Ok(vec![amplitude; text.chars().count() * self.samples_per_char])
    }
}

/// Test-side handle for pushing buffers into a started [`MockCapture`].
#[derive(Clone)]
pub struct MockCaptureHandle {
    callback: Arc<Mutex<Option<AudioBufferCallback>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MockCaptureHandle {
    /// Deliver one buffer as the backend would. Returns false when not started.
    pub fn push(&self, samples: &[f32], sample_rate: u32, channels: u16) -> bool {
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(samples, sample_rate, channels);
                true
            }
            None => false,
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct MockCapture {
    handle: MockCaptureHandle,
    start_error: Option<LinkError>,
}

impl MockCapture {
    pub fn new() -> (Self, MockCaptureHandle) {
        let handle = MockCaptureHandle {
            callback: Arc::new(Mutex::new(None)),
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        };
        (
            Self {
                handle: handle.clone(),
                start_error: None,
            },
            handle,
        )
    }

    pub fn failing(error: LinkError) -> (Self, MockCaptureHandle) {
        let (mut capture, handle) = Self::new();
        capture.start_error = Some(error);
        (capture, handle)
    }
}

impl CaptureProvider for MockCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), LinkError> {
        if let Some(ref error) = self.start_error {
            return Err(error.clone());
        }
        self.handle.starts.fetch_add(1, Ordering::SeqCst);
        *self.handle.callback.lock() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LinkError> {
        self.handle.stops.fetch_add(1, Ordering::SeqCst);
        *self.handle.callback.lock() = None;
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "mock-mic".into(),
            name: "Mock Microphone".into(),
            kind: DeviceKind::Input,
            is_default: true,
            default_sample_rate: Some(48000),
            channels: Some(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputStats {
    pub renders: usize,
    pub releases: usize,
    pub last_container: Vec<u8>,
}

pub struct MockOutput {
    stats: Arc<Mutex<OutputStats>>,
    render_signal: Option<Sender<()>>,
    fail_render: bool,
}

impl MockOutput {
    pub fn new() -> (Self, Arc<Mutex<OutputStats>>) {
        let stats = Arc::new(Mutex::new(OutputStats::default()));
        (
            Self {
                stats: Arc::clone(&stats),
                render_signal: None,
                fail_render: false,
            },
            stats,
        )
    }

    pub fn failing() -> (Self, Arc<Mutex<OutputStats>>) {
        let (mut output, stats) = Self::new();
        output.fail_render = true;
        (output, stats)
    }

    /// Signal `tx` each time rendering begins.
    pub fn with_render_signal(mut self, tx: Sender<()>) -> Self {
        self.render_signal = Some(tx);
        self
    }
}

impl PlaybackProvider for MockOutput {
    fn is_available(&self) -> bool {
        true
    }

    fn render(&mut self, container: &[u8]) -> Result<(), LinkError> {
        {
            let mut stats = self.stats.lock();
            stats.renders += 1;
            stats.last_container = container.to_vec();
        }
        if self.fail_render {
            return Err(LinkError::DeviceUnavailable("mock output failure".into()));
        }
        if let Some(ref tx) = self.render_signal {
            let _ = tx.try_send(());
        }
        Ok(())
    }

    fn release(&mut self) {
        self.stats.lock().releases += 1;
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "mock-speaker".into(),
            name: "Mock Speaker".into(),
            kind: DeviceKind::Output,
            is_default: true,
            default_sample_rate: Some(48000),
            channels: Some(1),
        }
    }
}

/// Permission source with a fixed status and a fixed answer to prompts.
pub struct FixedPermission {
    status: PermissionStatus,
    answer: PermissionStatus,
    requests: AtomicUsize,
}

impl FixedPermission {
    pub fn new(status: PermissionStatus, answer: PermissionStatus) -> Self {
        Self {
            status,
            answer,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionProvider for FixedPermission {
    fn status(&self) -> PermissionStatus {
        self.status
    }

    fn request_access(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
