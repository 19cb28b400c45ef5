// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe pub/sub bus
//!
//! Handlers run synchronously on the publisher's thread by default, or on
//! a single background delivery thread in [`DispatchMode::Background`].
//! The matching set is snapshotted under the subscription lock at publish
//! time and iterated outside it, so handlers may publish re-entrantly and
//! subscriptions changed mid-publish neither receive that event late nor
//! miss future events.

use std::fmt;
use std::sync::Arc;
use std::thread;

use ovr_core::{Event, EventPayload};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::pattern::TopicPattern;

/// Why a handler invocation failed. Never propagated to the publisher.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Identifier for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// Receipt returned by [`EventBus::subscribe`]; pass it back to
/// [`EventBus::unsubscribe`] to remove the handler.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub pattern: String,
}

struct SubEntry {
    id: SubscriptionId,
    pattern: TopicPattern,
    handler: Handler,
}

/// How matched handlers are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Handlers run on the publisher's thread, in registration order.
    /// `publish` returns when all handlers have returned.
    #[default]
    Sync,
    /// Matched `(subscription, event)` pairs are queued FIFO and drained
    /// by exactly one delivery thread. `publish` returns immediately.
    Background,
}

enum Delivery {
    Invoke {
        id: SubscriptionId,
        handler: Handler,
        event: Event,
    },
    Stop,
}

/// In-process topic bus with glob-pattern subscriptions.
pub struct EventBus {
    subs: Mutex<Vec<SubEntry>>,
    queue: Option<mpsc::UnboundedSender<Delivery>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// A bus with synchronous dispatch.
    pub fn new() -> Self {
        Self::with_dispatch(DispatchMode::Sync)
    }

    /// A bus with background dispatch.
    pub fn background() -> Self {
        Self::with_dispatch(DispatchMode::Background)
    }

    pub fn with_dispatch(mode: DispatchMode) -> Self {
        let (queue, worker) = match mode {
            DispatchMode::Sync => (None, None),
            DispatchMode::Background => {
                let (tx, mut rx) = mpsc::unbounded_channel();
                let handle = thread::spawn(move || {
                    while let Some(delivery) = rx.blocking_recv() {
                        match delivery {
                            Delivery::Invoke { id, handler, event } => {
                                invoke(id, &handler, &event);
                            }
                            Delivery::Stop => break,
                        }
                    }
                });
                (Some(tx), Some(handle))
            }
        };
        Self {
            subs: Mutex::new(Vec::new()),
            queue,
            worker: Mutex::new(worker),
        }
    }

    /// Register `handler` for every event whose topic matches `pattern`.
    ///
    /// Duplicate `(pattern, handler)` registrations are permitted; each
    /// receives the event independently.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Subscription
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        let entry = SubEntry {
            id,
            pattern: TopicPattern::new(pattern),
            handler: Arc::new(handler),
        };
        self.subs.lock().push(entry);
        tracing::debug!(sub = %id, pattern, "subscribed");
        Subscription {
            id,
            pattern: pattern.to_string(),
        }
    }

    /// Remove a subscription by id. No-op when absent.
    pub fn unsubscribe(&self, sub: &Subscription) {
        self.subs.lock().retain(|entry| entry.id != sub.id);
        tracing::debug!(sub = %sub.id, "unsubscribed");
    }

    /// Publish an event on `topic`, stamped with the current time.
    pub fn publish(&self, topic: &str, source: &str, payload: EventPayload) {
        let event = Event::new(topic, source, payload);
        let matched: Vec<(SubscriptionId, Handler)> = {
            let subs = self.subs.lock();
            subs.iter()
                .filter(|entry| entry.pattern.matches(topic))
                .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                .collect()
        };

        match &self.queue {
            Some(tx) => {
                for (id, handler) in matched {
                    let _ = tx.send(Delivery::Invoke {
                        id,
                        handler,
                        event: event.clone(),
                    });
                }
            }
            None => {
                for (id, handler) in matched {
                    invoke(id, &handler, &event);
                }
            }
        }
    }

    /// Publish a pre-built event. Delivery is identical to publishing its
    /// fields individually; the timestamp is re-stamped at publish time.
    pub fn publish_event(&self, event: Event) {
        self.publish(&event.topic, &event.source, event.payload);
    }

    /// Stop the background delivery worker.
    ///
    /// The stop marker queues behind pending deliveries, so the queue is
    /// drained before the worker exits. No-op in sync mode or when already
    /// shut down.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.queue {
            let _ = tx.send(Delivery::Stop);
        }
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(tx) = &self.queue {
            let _ = tx.send(Delivery::Stop);
        }
    }
}

fn invoke(id: SubscriptionId, handler: &Handler, event: &Event) {
    if let Err(error) = handler(event) {
        tracing::error!(topic = %event.topic, sub = %id, %error, "handler failed");
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
