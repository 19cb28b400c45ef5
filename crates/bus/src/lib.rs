// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovr-bus: in-process pub/sub with wildcard topic patterns

mod bus;
mod pattern;

pub use bus::{DispatchMode, EventBus, HandlerError, Subscription, SubscriptionId};
pub use pattern::TopicPattern;
