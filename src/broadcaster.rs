// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential fan-out of [`Event`]s to [`Listener`]s.

use std::{fmt, future::Future};

use async_trait::async_trait;
use futures::lock::Mutex;

use crate::event::Event;

/// Passive consumer of [`Event`]s, such as a formatter.
///
/// A [`Listener`] must not affect the run. One whose [`Listener::hear()`]
/// never completes stalls the run, and one that panics aborts it.
#[async_trait(?Send)]
pub trait Listener {
    /// Handles the given [`Event`].
    async fn hear(&mut self, event: &Event);
}

/// Broadcaster of [`Event`]s to the registered [`Listener`]s.
#[derive(Default)]
pub struct EventBroadcaster {
    listeners: Mutex<Vec<Box<dyn Listener>>>,
}

impl fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroadcaster").finish_non_exhaustive()
    }
}

impl EventBroadcaster {
    /// Creates a new [`EventBroadcaster`] without [`Listener`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the given [`Listener`] after the already registered ones.
    #[must_use]
    pub fn with_listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.get_mut().push(Box::new(listener));
        self
    }

    /// Hands the given [`Event`] to every [`Listener`] in registration order,
    /// awaiting each one before the next.
    pub async fn broadcast_event(&self, event: Event) {
        let mut listeners = self.listeners.lock().await;
        for listener in listeners.iter_mut() {
            listener.hear(&event).await;
        }
    }

    /// Broadcasts the [`Event::before()`] replica of the given [`Event`],
    /// awaits the `action`, broadcasts the [`Event::after()`] replica and
    /// returns the `action`'s output.
    pub async fn broadcast_around_event<T>(
        &self,
        event: Event,
        action: impl Future<Output = T>,
    ) -> T {
        self.broadcast_event(event.before()).await;
        let output = action.await;
        self.broadcast_event(event.after()).await;
        output
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, sync::Arc};

    use crate::{event::Payload, Feature};

    use super::*;

    struct Recorder {
        id: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    #[async_trait(?Send)]
    impl Listener for Recorder {
        async fn hear(&mut self, event: &Event) {
            tokio::task::yield_now().await;
            self.log.borrow_mut().push(format!("{}:{event}", self.id));
        }
    }

    #[tokio::test]
    async fn listeners_hear_sequentially_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let broadcaster = EventBroadcaster::new()
            .with_listener(Recorder { id: "a", log: Rc::clone(&log) })
            .with_listener(Recorder { id: "b", log: Rc::clone(&log) });
        let event = Event::new(Payload::Feature(Arc::new(Feature::new("f"))));

        let output = broadcaster
            .broadcast_around_event(event, async {
                log.borrow_mut().push("action".to_owned());
                42
            })
            .await;

        assert_eq!(output, 42);
        assert_eq!(
            *log.borrow(),
            [
                "a:BeforeFeature",
                "b:BeforeFeature",
                "action",
                "a:AfterFeature",
                "b:AfterFeature",
            ],
        );
    }
}
