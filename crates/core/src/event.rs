// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution lifecycle events and observers
//!
//! Engines notify a constructor-injected, ordered observer list instead of a
//! shared emitter. Events are notifications only: observers must return
//! quickly and must never block the engine.

use crate::result::NodeStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Notification emitted by an engine during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEvent {
    ExecutionStarted {
        execution_id: String,
        workflow_id: String,
    },
    ExecutionRecovering {
        execution_id: String,
    },
    ExecutionCompleted {
        execution_id: String,
    },
    ExecutionFailed {
        execution_id: String,
        error: String,
    },
    ExecutionCancelled {
        execution_id: String,
    },
    CheckpointCreated {
        execution_id: String,
        step_id: String,
    },
    StepRetried {
        execution_id: String,
        step_id: String,
        attempt: u32,
    },
    StepCompensated {
        execution_id: String,
        step_id: String,
        success: bool,
    },
    NodeStarted {
        node_id: String,
    },
    NodeCompleted {
        node_id: String,
        status: NodeStatus,
    },
}

/// Receives lifecycle notifications from an engine
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Ordered list of observers, notified in registration order
#[derive(Clone, Default)]
pub struct Observers {
    list: Vec<Arc<dyn Observer>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Arc<dyn Observer>) {
        self.list.push(observer);
    }

    pub fn emit(&self, event: &ExecutionEvent) {
        for observer in &self.list {
            observer.on_event(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Logs every event through `tracing`
#[derive(Clone, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::ExecutionFailed { execution_id, error } => {
                tracing::warn!(execution_id, error, "execution failed");
            }
            ExecutionEvent::ExecutionCancelled { execution_id } => {
                tracing::warn!(execution_id, "execution cancelled");
            }
            other => tracing::info!(event = ?other, "execution event"),
        }
    }
}

/// Captures events in order, for tests
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events observed so far
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagger {
        tag: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Observer for Tagger {
        fn on_event(&self, _event: &ExecutionEvent) {
            self.seen.lock().unwrap().push(self.tag);
        }
    }

    #[test]
    fn observers_are_notified_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::new();
        observers.push(Arc::new(Tagger {
            tag: "first",
            seen: Arc::clone(&seen),
        }));
        observers.push(Arc::new(Tagger {
            tag: "second",
            seen: Arc::clone(&seen),
        }));

        observers.emit(&ExecutionEvent::NodeStarted {
            node_id: "n1".into(),
        });

        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn recording_observer_keeps_event_order() {
        let recorder = RecordingObserver::new();
        let mut observers = Observers::new();
        observers.push(Arc::new(recorder.clone()));

        observers.emit(&ExecutionEvent::NodeStarted {
            node_id: "a".into(),
        });
        observers.emit(&ExecutionEvent::NodeCompleted {
            node_id: "a".into(),
            status: NodeStatus::Success,
        });

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ExecutionEvent::NodeStarted { .. }));
        assert!(matches!(events[1], ExecutionEvent::NodeCompleted { .. }));
    }
}
