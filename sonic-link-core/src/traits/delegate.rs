use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::models::audio_models::{DecodedMessage, LevelSample};
use crate::models::events::{DecodeEvent, LinkEvent};
use crate::models::state::CaptureState;

/// Event delegate for link session notifications.
///
/// All methods are called from the `event-dispatch` thread, never from the
/// audio callback. Implementations should marshal to a UI thread if needed.
/// Every method defaults to a no-op so implementors pick what they need.
///
/// Delivery is best effort. Level samples travel on their own bounded queue,
/// every other event on a second one. Events of one kind arrive in order,
/// but a level sample may be delivered before or after a decode event that
/// was emitted around it. A slow delegate lets the queues fill up; events
/// that do not fit are dropped and show up in
/// `CaptureDiagnostics::events_dropped`.
pub trait LinkDelegate: Send + Sync {
    /// A message was decoded.
    fn on_data_received(&self, _message: &DecodedMessage) {}

    /// Periodic signal level for metering.
    fn on_audio_level(&self, _level: &LevelSample) {}

    /// Transmission lifecycle: start/end markers, decode success or failure.
    fn on_decode_event(&self, _event: &DecodeEvent) {}

    fn on_state_changed(&self, _state: &CaptureState) {}

    fn on_error(&self, _message: &str) {}

    /// Route one event to the matching callback.
    fn on_event(&self, event: &LinkEvent) {
        match event {
            LinkEvent::DataReceived(message) => self.on_data_received(message),
            LinkEvent::AudioLevel(level) => self.on_audio_level(level),
            LinkEvent::Decode(decode) => self.on_decode_event(decode),
            LinkEvent::StateChanged(state) => self.on_state_changed(state),
            LinkEvent::Error { message } => self.on_error(message),
        }
    }
}

/// Delegate that forwards every event into an unbounded channel for polling.
pub struct ChannelDelegate {
    tx: Sender<LinkEvent>,
}

impl ChannelDelegate {
    pub fn new() -> (Arc<Self>, Receiver<LinkEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl LinkDelegate for ChannelDelegate {
    fn on_event(&self, event: &LinkEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<&'static str>>,
    }

    impl LinkDelegate for Recording {
        fn on_data_received(&self, _message: &DecodedMessage) {
            self.calls.lock().push("data");
        }

        fn on_error(&self, _message: &str) {
            self.calls.lock().push("error");
        }
    }

    #[test]
    fn on_event_routes_to_specific_callbacks() {
        let delegate = Recording::default();
        let message = DecodedMessage {
            text: "hi".into(),
            timestamp: Utc::now(),
            frame_index: 0,
        };

        delegate.on_event(&LinkEvent::DataReceived(message));
        delegate.on_event(&LinkEvent::StateChanged(CaptureState::Idle));
        delegate.on_event(&LinkEvent::Error { message: "boom".into() });

        assert_eq!(*delegate.calls.lock(), vec!["data", "error"]);
    }

    #[test]
    fn channel_delegate_forwards_everything() {
        let (delegate, rx) = ChannelDelegate::new();

        delegate.on_event(&LinkEvent::StateChanged(CaptureState::Idle));
        delegate.on_event(&LinkEvent::Error { message: "x".into() });

        assert_eq!(rx.try_recv().unwrap(), LinkEvent::StateChanged(CaptureState::Idle));
        assert_eq!(rx.try_recv().unwrap(), LinkEvent::Error { message: "x".into() });
        assert!(rx.try_recv().is_err());
    }
}
