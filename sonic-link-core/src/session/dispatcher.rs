use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender, TrySendError};

use crate::models::error::LinkError;
use crate::models::events::LinkEvent;
use crate::traits::delegate::LinkDelegate;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Non-blocking producer side of the event queues.
///
/// Cheap to clone; safe to call from the audio callback. Level samples go
/// through their own queue so a burst of them cannot crowd out decoded
/// messages and state changes. When a queue is full the event is dropped
/// and counted.
#[derive(Clone)]
pub struct EventEmitter {
    control: Sender<LinkEvent>,
    levels: Sender<LinkEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventEmitter {
    /// Queue `event`. Returns false if it was dropped.
    pub fn emit(&self, event: LinkEvent) -> bool {
        let (queue, name) = match event {
            LinkEvent::AudioLevel(_) => (&self.levels, "level"),
            _ => (&self.control, "event"),
        };
        match queue.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let previous = self.dropped.fetch_add(1, Ordering::Relaxed);
                if previous % 1000 == 0 {
                    log::warn!("{} queue full, {} events dropped so far", name, previous + 1);
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owns the `event-dispatch` thread that drains the queues into a delegate.
///
/// Dropping the dispatcher stops the thread after delivering everything
/// already queued.
pub struct EventDispatcher {
    emitter: EventEmitter,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl EventDispatcher {
    /// Each of the two queues holds up to `capacity` events.
    pub fn spawn(delegate: Arc<dyn LinkDelegate>, capacity: usize) -> Result<Self, LinkError> {
        let (control_tx, control_rx) = crossbeam_channel::bounded(capacity.max(1));
        let (levels_tx, levels_rx) = crossbeam_channel::bounded(capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));

        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("event-dispatch".into())
            .spawn(move || dispatch_loop(&control_rx, &levels_rx, delegate.as_ref(), &thread_running))
            .map_err(|e| LinkError::Unknown(format!("failed to spawn event dispatch thread: {e}")))?;

        Ok(Self {
            emitter: EventEmitter {
                control: control_tx,
                levels: levels_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            running,
            handle: Some(handle),
        })
    }

    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    /// Deliver what is queued, then stop the thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("event dispatch thread panicked");
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(
    control: &Receiver<LinkEvent>,
    levels: &Receiver<LinkEvent>,
    delegate: &dyn LinkDelegate,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        select! {
            recv(control) -> event => match event {
                Ok(event) => delegate.on_event(&event),
                Err(_) => return,
            },
            recv(levels) -> event => match event {
                Ok(event) => delegate.on_event(&event),
                Err(_) => return,
            },
            default(POLL_INTERVAL) => {}
        }
    }
    for event in control.try_iter() {
        delegate.on_event(&event);
    }
    for event in levels.try_iter() {
        delegate.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::audio_models::{DecodedMessage, LevelSample};
    use crate::models::state::CaptureState;
    use crate::traits::delegate::ChannelDelegate;

    #[test]
    fn events_reach_delegate_in_order() {
        let (delegate, rx) = ChannelDelegate::new();
        let dispatcher = EventDispatcher::spawn(delegate, 16).unwrap();
        let emitter = dispatcher.emitter();

        for i in 0..5 {
            assert!(emitter.emit(LinkEvent::Error { message: i.to_string() }));
        }
        drop(dispatcher);

        let messages: Vec<String> = rx
            .try_iter()
            .map(|e| match e {
                LinkEvent::Error { message } => message,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(messages, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        // A delegate that blocks until released keeps the queue full.
        struct Gate(crossbeam_channel::Receiver<()>);
        impl LinkDelegate for Gate {
            fn on_state_changed(&self, _state: &CaptureState) {
                let _ = self.0.recv();
            }
        }

        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let dispatcher = EventDispatcher::spawn(Arc::new(Gate(release_rx)), 2).unwrap();
        let emitter = dispatcher.emitter();

        // First event is taken by the dispatch thread and blocks there.
        assert!(emitter.emit(LinkEvent::StateChanged(CaptureState::Idle)));
        while !emitter.control.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(emitter.emit(LinkEvent::StateChanged(CaptureState::Idle)));
        assert!(emitter.emit(LinkEvent::StateChanged(CaptureState::Idle)));
        assert!(!emitter.emit(LinkEvent::StateChanged(CaptureState::Idle)));
        assert_eq!(emitter.dropped_count(), 1);

        for _ in 0..3 {
            release_tx.send(()).unwrap();
        }
        drop(dispatcher);
    }

    #[test]
    fn level_flood_does_not_drop_decoded_messages() {
        struct Gate {
            release: crossbeam_channel::Receiver<()>,
            received: crossbeam_channel::Sender<String>,
        }
        impl LinkDelegate for Gate {
            fn on_state_changed(&self, _state: &CaptureState) {
                let _ = self.release.recv();
            }

            fn on_data_received(&self, message: &DecodedMessage) {
                let _ = self.received.send(message.text.clone());
            }
        }

        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let (received_tx, received_rx) = crossbeam_channel::unbounded();
        let gate = Gate {
            release: release_rx,
            received: received_tx,
        };
        let dispatcher = EventDispatcher::spawn(Arc::new(gate), 2).unwrap();
        let emitter = dispatcher.emitter();

        // Park the dispatch thread so nothing drains while levels pile up.
        assert!(emitter.emit(LinkEvent::StateChanged(CaptureState::Idle)));
        while !emitter.control.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }

        let level = LevelSample {
            rms: 0.1,
            peak: 0.2,
            signal_present: true,
            timestamp: Utc::now(),
        };
        let accepted = (0..10)
            .filter(|_| emitter.emit(LinkEvent::AudioLevel(level)))
            .count();
        assert_eq!(accepted, 2);
        assert_eq!(emitter.dropped_count(), 8);

        let message = DecodedMessage {
            text: "hello".into(),
            timestamp: Utc::now(),
            frame_index: 3,
        };
        assert!(emitter.emit(LinkEvent::DataReceived(message)));

        release_tx.send(()).unwrap();
        drop(dispatcher);
        assert_eq!(received_rx.try_iter().collect::<Vec<_>>(), vec!["hello".to_string()]);
    }
}
