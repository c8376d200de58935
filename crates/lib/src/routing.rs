//! Message router: type tag -> handler.
//!
//! The table is filled once through [`RouterBuilder`] and is immutable afterwards.
//! Unknown tags are expected (newer firmware) and only logged at debug level.

use crate::serial::DecodedMessage;
use std::collections::HashMap;
use std::sync::Arc;

/// A handler for one message type. Runs on the decode loop, so it must not block;
/// it owns its own error handling.
pub type Handler = Arc<dyn Fn(&DecodedMessage) + Send + Sync>;

/// Builder for the immutable type -> handler table.
#[derive(Default)]
pub struct RouterBuilder {
    table: HashMap<String, Handler>,
}

impl RouterBuilder {
    /// Register `handler` for `tag`. A later registration for the same tag replaces the earlier one.
    pub fn register<F>(mut self, tag: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&DecodedMessage) + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self.table.insert(tag.clone(), Arc::new(handler)).is_some() {
            log::warn!("router: handler for {} registered twice, keeping the last one", tag);
        }
        self
    }

    pub fn build(self) -> MessageRouter {
        MessageRouter {
            table: Arc::new(self.table),
        }
    }
}

/// Dispatches decoded messages by exact match on their type tag.
#[derive(Clone)]
pub struct MessageRouter {
    table: Arc<HashMap<String, Handler>>,
}

impl MessageRouter {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Invoke the handler registered for `msg.typ`, if any. Never fails.
    pub fn route(&self, msg: DecodedMessage) {
        match self.table.get(msg.typ.as_str()) {
            Some(handler) => handler(&msg),
            None => log::debug!("router: unknown message type {}: {}", msg.typ, msg.raw),
        }
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.table.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.table.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}
