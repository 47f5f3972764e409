//! Named publish/subscribe bus.
//!
//! Handlers run synchronously in the emitter's call, in registration order.
//! A handler that returns an error or panics is logged and reported back to
//! the emitter, and the remaining handlers still run.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{Result, SmoothPageError};

type Handler<V> = Box<dyn FnMut(&V) -> Result<()>>;

/// Outcome of a single [`EventBus::emit`] call.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub delivered: usize,
    pub failures: Vec<SmoothPageError>,
}

pub struct EventBus<V> {
    handlers: HashMap<String, Vec<Handler<V>>>,
}

impl<V> Default for EventBus<V> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<V> EventBus<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(&V) -> Result<()> + 'static,
    {
        self.handlers
            .entry(name.into())
            .or_default()
            .push(Box::new(handler));
    }

    pub fn has_handlers(&self, name: &str) -> bool {
        self.handlers.get(name).is_some_and(|list| !list.is_empty())
    }

    pub fn emit(&mut self, name: &str, value: &V) -> EmitReport {
        let mut report = EmitReport::default();
        let Some(handlers) = self.handlers.get_mut(name) else {
            return report;
        };

        for handler in handlers.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(value)));
            let failure = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => SmoothPageError::handler(name, err.to_string()),
                Err(payload) => SmoothPageError::handler(name, panic_message(payload.as_ref())),
            };
            tracing::warn!(event = name, error = %failure, "event handler failed");
            report.failures.push(failure);
        }

        report
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<V> fmt::Debug for EventBus<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_string()
    }
}
