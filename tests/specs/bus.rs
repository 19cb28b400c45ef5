// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wildcard delivery semantics on the topic bus.

use std::sync::{Arc, Mutex};

use ovr_bus::EventBus;
use ovr_core::{Event, EventPayload};

type Seen = Arc<Mutex<Vec<String>>>;

fn recorder(seen: &Seen) -> impl Fn(&Event) -> Result<(), ovr_bus::HandlerError> {
    let seen = Arc::clone(seen);
    move |event: &Event| {
        seen.lock().unwrap().push(event.topic.clone());
        Ok(())
    }
}

#[test]
fn wildcard_and_exact_subscribers_see_the_right_events() {
    let bus = EventBus::new();
    let wild: Seen = Seen::default();
    let exact: Seen = Seen::default();

    bus.subscribe("odds.*", recorder(&wild));
    bus.subscribe("odds.alpha", recorder(&exact));

    bus.publish("odds.alpha", "alpha", EventPayload::Empty);
    bus.publish("odds.beta", "beta", EventPayload::Empty);

    assert_eq!(*wild.lock().unwrap(), vec!["odds.alpha", "odds.beta"]);
    assert_eq!(*exact.lock().unwrap(), vec!["odds.alpha"]);
}

#[test]
fn background_bus_preserves_publish_order_per_publisher() {
    let bus = EventBus::background();
    let seen: Seen = Seen::default();
    bus.subscribe("odds.*", recorder(&seen));

    for n in 0..50 {
        bus.publish(&format!("odds.s{n:02}"), "s", EventPayload::Empty);
    }
    bus.shutdown();

    let got = seen.lock().unwrap().clone();
    let want: Vec<String> = (0..50).map(|n| format!("odds.s{n:02}")).collect();
    assert_eq!(got, want);
}

#[test]
fn unsubscribed_handlers_receive_nothing_further() {
    let bus = EventBus::new();
    let seen: Seen = Seen::default();

    let sub = bus.subscribe("odds.*", recorder(&seen));
    bus.publish("odds.alpha", "alpha", EventPayload::Empty);
    bus.unsubscribe(&sub);
    bus.publish("odds.alpha", "alpha", EventPayload::Empty);

    assert_eq!(seen.lock().unwrap().len(), 1);
}
