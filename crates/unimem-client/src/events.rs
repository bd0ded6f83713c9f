//! Transport lifecycle events.
//!
//! Listeners are synchronous observers called in registration order. A
//! listener that returns `Err` or panics is logged and skipped; it never
//! affects the request being observed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::warn;
use unimem_types::MemoryError;

/// Something that happened inside a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A transport was constructed.
    ClientInitialized { base_url: String },
    /// A transport was dropped.
    ClientDestroyed { base_url: String },
    /// An attempt is about to be sent.
    RequestStart {
        method: String,
        url: String,
        attempt: u32,
    },
    /// A call completed with a 2xx response.
    RequestSuccess {
        method: String,
        url: String,
        status: u16,
        elapsed_ms: u64,
        attempts: u32,
    },
    /// An attempt failed (after error interceptors ran).
    RequestError {
        method: String,
        url: String,
        attempt: u32,
        error: MemoryError,
    },
    /// A failed attempt will be retried after `delay_ms`.
    RequestRetry {
        method: String,
        url: String,
        attempt: u32,
        delay_ms: u64,
    },
}

impl ClientEvent {
    /// Stable event name, e.g. `request:start`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientInitialized { .. } => "client:initialized",
            Self::ClientDestroyed { .. } => "client:destroyed",
            Self::RequestStart { .. } => "request:start",
            Self::RequestSuccess { .. } => "request:success",
            Self::RequestError { .. } => "request:error",
            Self::RequestRetry { .. } => "request:retry",
        }
    }
}

/// Event observer. Implementations must be thread-safe.
pub trait EventListener: Send + Sync {
    /// Called for every emitted event. The return value is only logged.
    fn on_event(&self, event: &ClientEvent) -> Result<(), String>;
}

impl<F> EventListener for F
where
    F: Fn(&ClientEvent) -> Result<(), String> + Send + Sync,
{
    fn on_event(&self, event: &ClientEvent) -> Result<(), String> {
        self(event)
    }
}

/// Ordered listener registry.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners fire in registration order.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        match self.listeners.write() {
            Ok(mut guard) => guard.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Deliver `event` to every listener, swallowing listener failures.
    pub fn emit(&self, event: &ClientEvent) {
        for listener in self.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => {
                    warn!(
                        event = event.name(),
                        error = %reason,
                        "Event listener returned error (ignored)"
                    );
                }
                Err(_) => {
                    warn!(event = event.name(), "Event listener panicked (ignored)");
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventListener>> {
        match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn start() -> ClientEvent {
        ClientEvent::RequestStart {
            method: "GET".into(),
            url: "http://x/".into(),
            attempt: 0,
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(start().name(), "request:start");
        assert_eq!(
            ClientEvent::ClientDestroyed {
                base_url: String::new()
            }
            .name(),
            "client:destroyed"
        );
    }

    #[test]
    fn test_listeners_fire_in_order() {
        let emitter = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            emitter.subscribe(Arc::new(move |_: &ClientEvent| -> Result<(), String> {
                log.lock().unwrap().push(tag);
                Ok(())
            }));
        }
        emitter.emit(&start());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_listeners_do_not_stop_delivery() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(0u32));
        emitter.subscribe(Arc::new(|_: &ClientEvent| -> Result<(), String> {
            Err("boom".to_string())
        }));
        emitter.subscribe(Arc::new(|_: &ClientEvent| -> Result<(), String> {
            panic!("listener bug")
        }));
        let s = seen.clone();
        emitter.subscribe(Arc::new(move |_: &ClientEvent| -> Result<(), String> {
            *s.lock().unwrap() += 1;
            Ok(())
        }));

        emitter.emit(&start());
        emitter.emit(&start());
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(emitter.listener_count(), 3);
    }
}
