use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFrame, CaptureDiagnostics, LevelSample};
use crate::models::config::LinkConfiguration;
use crate::models::events::LinkEvent;
use crate::processing::framer::FrameReassembler;
use crate::processing::level_meter::LevelMeter;
use crate::session::capture::BlockHandler;
use crate::session::dispatcher::EventEmitter;
use crate::session::orchestrator::DecodeOrchestrator;
use crate::session::recorder::DiagnosticRecorder;
use crate::traits::engine::DecodeEngine;

/// Per-run consumer of captured blocks.
///
/// Each block goes, in order, to the diagnostic recorder, the level meter,
/// and the frame reassembler feeding the decode orchestrator. A fresh
/// pipeline is built for every capture run so orchestration always starts
/// from `Idle`.
///
/// The engine is taken with `try_lock`: if another caller holds it (an
/// encode in progress), the block is not decoded and the skip is counted.
pub struct ReceivePipeline<E: DecodeEngine + Send + 'static> {
    engine: Arc<Mutex<E>>,
    framer: FrameReassembler,
    meter: LevelMeter,
    orchestrator: DecodeOrchestrator,
    recorder: Arc<Mutex<DiagnosticRecorder>>,
    levels: Arc<Mutex<Option<LevelSample>>>,
    diagnostics: Arc<Mutex<CaptureDiagnostics>>,
    emitter: EventEmitter,
    busy_skips: u64,
}

impl<E: DecodeEngine + Send + 'static> ReceivePipeline<E> {
    pub fn new(
        config: &LinkConfiguration,
        engine: Arc<Mutex<E>>,
        recorder: Arc<Mutex<DiagnosticRecorder>>,
        levels: Arc<Mutex<Option<LevelSample>>>,
        diagnostics: Arc<Mutex<CaptureDiagnostics>>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            engine,
            framer: FrameReassembler::new(config.framing),
            meter: LevelMeter::new(config.level_interval_blocks, config.noise_floor),
            orchestrator: DecodeOrchestrator::new(config.report_decode_failures),
            recorder,
            levels,
            diagnostics,
            emitter,
            busy_skips: 0,
        }
    }

    pub fn handle(&mut self, frame: AudioFrame<'_>) {
        let (recorded_samples, refused_samples) = {
            let mut recorder = self.recorder.lock();
            recorder.record(&frame);
            (recorder.len() as u64, recorder.dropped_samples())
        };

        if let Some(level) = self.meter.observe(frame.samples) {
            *self.levels.lock() = Some(level);
            self.emitter.emit(LinkEvent::AudioLevel(level));
        }

        match self.engine.try_lock() {
            Some(mut engine) => {
                let orchestrator = &mut self.orchestrator;
                let emitter = &self.emitter;
                self.framer.push(frame.samples, |chunk| {
                    orchestrator.process(&mut *engine, chunk, |event| {
                        emitter.emit(event);
                    });
                });
            }
            None => self.busy_skips += 1,
        }

        let mut d = self.diagnostics.lock();
        d.frames_decoded = self.orchestrator.frames_processed();
        d.engine_busy_skips = self.busy_skips;
        d.samples_discarded = self.framer.discarded_samples();
        d.events_dropped = self.emitter.dropped_count();
        d.recorded_samples = recorded_samples;
        d.recording_dropped_samples = refused_samples;
    }

    pub fn into_handler(mut self) -> BlockHandler {
        Box::new(move |frame: AudioFrame<'_>| self.handle(frame))
    }
}
