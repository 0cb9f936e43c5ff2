// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Channel for faults escaping user code while it runs asynchronously.
//!
//! A [`FaultChannel`] is owned by a [`UserCodeRunner`] and armed for the
//! duration of every asynchronous invocation only. While armed, the first
//! [`Fault`] reported through a [`FaultReporter`] (or, optionally, caught by a
//! temporarily installed panic hook on another thread) completes the
//! invocation as failed.
//!
//! [`UserCodeRunner`]: crate::UserCodeRunner

use std::{
    fmt,
    panic::{self, PanicHookInfo},
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use derive_more::with_trait::{Display, Error};
use futures::{channel::oneshot, future};

/// Process-wide panic hook, as returned by [`panic::take_hook()`].
type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Slot holding the sender of the currently armed invocation, if any.
type Slot = Arc<Mutex<Option<oneshot::Sender<Fault>>>>;

/// Fault that escaped user code.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display(
    "{payload}{}",
    location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default()
)]
pub struct Fault {
    /// Message of this [`Fault`].
    pub payload: String,

    /// Source location it was raised at, if known.
    pub location: Option<String>,
}

impl Fault {
    /// Creates a new [`Fault`] with the given `payload` and no location.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self { payload: payload.into(), location: None }
    }

    fn from_panic_info(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let payload = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|&s| s.to_owned()))
            .unwrap_or_else(|| "Opaque panic payload".to_owned());

        Self {
            payload,
            location: info.location().map(|loc| {
                format!("{}:{}:{}", loc.file(), loc.line(), loc.column())
            }),
        }
    }
}

/// Owned channel of [`Fault`]s, see the [module docs](self).
#[derive(Clone, Default)]
pub struct FaultChannel {
    slot: Slot,
    panic_hook: bool,
}

impl fmt::Debug for FaultChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultChannel")
            .field("armed", &self.is_armed())
            .field("panic_hook", &self.panic_hook)
            .finish()
    }
}

impl FaultChannel {
    /// Creates a new [`FaultChannel`] accepting explicitly reported
    /// [`Fault`]s only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes this [`FaultChannel`] also capture panics happening on threads
    /// other than the one running the invocation.
    ///
    /// The process-wide panic hook is wrapped while armed, and restored
    /// afterwards. The wrapped hook keeps being called for every panic.
    #[must_use]
    pub const fn with_panic_hook(mut self) -> Self {
        self.panic_hook = true;
        self
    }

    /// Returns a [`FaultReporter`] feeding this [`FaultChannel`].
    #[must_use]
    pub fn reporter(&self) -> FaultReporter {
        FaultReporter { slot: Arc::clone(&self.slot) }
    }

    /// Indicates whether an invocation is currently listening for
    /// [`Fault`]s.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_canceled())
    }

    /// Arms this [`FaultChannel`] until the returned [`Armed`] guard is
    /// dropped.
    #[must_use]
    pub fn arm(&self) -> Armed {
        let (tx, rx) = oneshot::channel();
        drop(
            self.slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(tx),
        );

        let previous_hook = self.panic_hook.then(|| {
            let previous = Arc::new(panic::take_hook());
            let chained = Arc::clone(&previous);
            let slot = Arc::clone(&self.slot);
            let owner = thread::current().id();
            panic::set_hook(Box::new(move |info| {
                // Panics of the invoking thread are caught by the invocation.
                if thread::current().id() != owner {
                    report(&slot, Fault::from_panic_info(info));
                }
                chained(info);
            }));
            previous
        });

        Armed { slot: Arc::clone(&self.slot), rx, previous_hook }
    }
}

/// Guard of an armed [`FaultChannel`].
pub struct Armed {
    slot: Slot,
    rx: oneshot::Receiver<Fault>,
    previous_hook: Option<Arc<PanicHook>>,
}

impl fmt::Debug for Armed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Armed")
            .field("panic_hook", &self.previous_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl Armed {
    /// Resolves with the first reported [`Fault`], never resolving if none
    /// is reported.
    pub async fn fault(&mut self) -> Fault {
        match (&mut self.rx).await {
            Ok(fault) => fault,
            Err(oneshot::Canceled) => future::pending().await,
        }
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        drop(self.slot.lock().unwrap_or_else(PoisonError::into_inner).take());

        if let Some(previous) = self.previous_hook.take() {
            // Swapping hooks while panicking aborts the process.
            if !thread::panicking() {
                // Releases the clone held by the wrapping hook.
                drop(panic::take_hook());
                match Arc::try_unwrap(previous) {
                    Ok(hook) => panic::set_hook(hook),
                    Err(shared) => {
                        panic::set_hook(Box::new(move |info| shared(info)));
                    }
                }
            }
        }
    }
}

/// Handle for reporting [`Fault`]s into a [`FaultChannel`].
///
/// Reporting while no invocation is armed is a no-op.
#[derive(Clone, Default)]
pub struct FaultReporter {
    slot: Slot,
}

impl fmt::Debug for FaultReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultReporter").finish_non_exhaustive()
    }
}

impl FaultReporter {
    /// Reports a [`Fault`] with the given `payload`.
    ///
    /// Returns `false` if nothing was listening for it.
    pub fn report(&self, payload: impl Into<String>) -> bool {
        report(&self.slot, Fault::new(payload))
    }
}

fn report(slot: &Slot, fault: Fault) -> bool {
    slot.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some_and(|tx| tx.send(fault).is_ok())
}

#[cfg(test)]
mod tests {
    use futures::FutureExt as _;

    use super::*;

    #[test]
    fn reports_only_while_armed() {
        let channel = FaultChannel::new();
        let reporter = channel.reporter();

        assert!(!reporter.report("too early"));

        let mut armed = channel.arm();
        assert!(channel.is_armed());
        assert!(reporter.report("boom"));
        assert!(!reporter.report("second"), "only the first fault counts");
        assert_eq!(armed.fault().now_or_never(), Some(Fault::new("boom")));

        drop(armed);
        assert!(!channel.is_armed());
        assert!(!reporter.report("too late"));
    }

    #[test]
    fn unreported_fault_never_resolves() {
        let channel = FaultChannel::new();
        let mut armed = channel.arm();

        assert_eq!(armed.fault().now_or_never(), None);
    }

    #[test]
    fn displays_location() {
        let fault = Fault {
            payload: "boom".into(),
            location: Some("src/lib.rs:1:2".into()),
        };

        assert_eq!(fault.to_string(), "boom at src/lib.rs:1:2");
        assert_eq!(Fault::new("boom").to_string(), "boom");
    }
}
