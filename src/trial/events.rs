//! Engine output signals, delivered through token-based subscriptions.
//! Rendering and audio collaborators subscribe here; the engine never calls
//! them directly.

use crate::trial::gate::EndReason;

#[derive(Clone, Debug, PartialEq)]
pub enum TrialEvent {
    SweepActivated {
        key: f32,
        slot: usize,
        fade_in_sec: f32,
    },
    /// Failure path only: sweeps leave their slot this way when the trial
    /// gate closes under them.
    SweepDeactivated {
        key: f32,
    },
    SweepFinished {
        key: f32,
    },
    /// Per-advancement "note" signal (one per success, real or pushed).
    Advancement {
        key: f32,
        spatial_freq: f32,
        contrast: f32,
    },
    GhostShown {
        key: f32,
    },
    GhostDetected {
        key: f32,
    },
    GhostFaded {
        key: f32,
    },
    TrialEnded {
        reason: EndReason,
    },
    RepeatCompleted {
        repeat: u32,
    },
}

/// Handle returned by [`EventBus::subscribe`]; dropping it does nothing,
/// unsubscribe explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionToken(u64);

type Sink = Box<dyn FnMut(&TrialEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_token: u64,
    sinks: Vec<(u64, Sink)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: impl FnMut(&TrialEvent) + 'static) -> SubscriptionToken {
        let token = self.next_token;
        self.next_token += 1;
        self.sinks.push((token, Box::new(sink)));
        SubscriptionToken(token)
    }

    /// Returns false when the token was already removed.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(id, _)| *id != token.0);
        self.sinks.len() != before
    }

    pub fn emit(&mut self, event: TrialEvent) {
        for (_, sink) in &mut self.sinks {
            sink(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribe_emit_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = seen.clone();
        let token = bus.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));

        bus.emit(TrialEvent::GhostShown { key: 45.0 });
        assert_eq!(seen.borrow().len(), 1);

        assert!(bus.unsubscribe(token));
        assert!(!bus.unsubscribe(token), "second unsubscribe is a no-op");
        bus.emit(TrialEvent::GhostShown { key: 45.0 });
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn tokens_are_independent() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(|_| {});
        let b = bus.subscribe(|_| {});
        assert_ne!(a, b);
        assert!(bus.unsubscribe(a));
        bus.emit(TrialEvent::RepeatCompleted { repeat: 0 });
        assert!(bus.unsubscribe(b));
    }
}
