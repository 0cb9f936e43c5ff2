// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Failures of user code (step definitions and hooks).

use std::{any::Any, borrow::Cow, sync::Arc, time::Duration};

use derive_more::with_trait::{Display, Error};

use crate::{fault::Fault, step::AmbiguousMatchError, user_code::Interface};

/// Panic payload captured with [`catch_unwind()`].
///
/// [`catch_unwind()`]: std::panic::catch_unwind
pub type Info = Arc<dyn Any + Send + 'static>;

/// Reason a step or hook ended up [`Failed`] or [`Ambiguous`].
///
/// [`Ambiguous`]: crate::Status::Ambiguous
/// [`Failed`]: crate::Status::Failed
#[derive(Clone, Debug, Display, Error)]
pub enum Failure {
    /// User code panicked.
    #[display("Step panicked: {}", coerce_error(_0))]
    Panic(#[error(not(source))] Info),

    /// User code returned an [`Err`].
    #[display("{_0:#}")]
    Error(#[error(not(source))] Arc<anyhow::Error>),

    /// A fault escaped user code while it was running asynchronously.
    #[display("Uncaught fault: {_0}")]
    Uncaught(Fault),

    /// User code didn't complete in time.
    #[display(
        "function timed out, ensure the {interface} within {} milliseconds",
        after.as_millis()
    )]
    Timeout {
        /// [`Interface`] that was expected to complete.
        interface: Interface,

        /// Timeout that elapsed.
        after: Duration,
    },

    /// User code accepted a completion callback and returned a future too.
    #[display(
        "function uses multiple asynchronous interfaces: callback and future"
    )]
    MultipleInterfaces,

    /// Completion callback was dropped without being called.
    #[display("function dropped its callback without calling it")]
    CallbackDropped,

    /// Step text matched several step definitions.
    #[display("Step match is ambiguous: {_0}")]
    Ambiguous(AmbiguousMatchError),

    /// World couldn't be created.
    #[display("Failed to initialize World: {_0}")]
    World(#[error(not(source))] String),
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Self::Error(Arc::new(err))
    }
}

impl Failure {
    /// Wraps a panic payload returned by [`catch_unwind()`].
    ///
    /// [`catch_unwind()`]: std::panic::catch_unwind
    #[must_use]
    pub fn panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self::Panic(payload.into())
    }
}

/// Coerces the given panic payload into a readable string.
#[must_use]
pub fn coerce_error(err: &Info) -> Cow<'static, str> {
    (**err)
        .downcast_ref::<String>()
        .map(|s| s.clone().into())
        .or_else(|| (**err).downcast_ref::<&str>().map(|s| s.to_owned().into()))
        .unwrap_or_else(|| "(Could not resolve panic payload)".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_panic_payloads() {
        let owned: Info = Arc::new("owned".to_owned());
        let borrowed: Info = Arc::new("borrowed");
        let opaque: Info = Arc::new(42_u8);

        assert_eq!(coerce_error(&owned), "owned");
        assert_eq!(coerce_error(&borrowed), "borrowed");
        assert_eq!(coerce_error(&opaque), "(Could not resolve panic payload)");
    }

    #[test]
    fn timeout_names_interface_and_duration() {
        let err = Failure::Timeout {
            interface: Interface::Future,
            after: Duration::from_millis(5),
        };

        assert_eq!(
            err.to_string(),
            "function timed out, ensure the future resolves within 5 \
             milliseconds",
        );
    }

    #[test]
    fn error_renders_context_chain() {
        let err = Failure::from(anyhow::anyhow!("root").context("outer"));

        assert_eq!(err.to_string(), "outer: root");
    }
}
