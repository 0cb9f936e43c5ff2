// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-[`Pickle`] user state.
//!
//! [`Pickle`]: crate::Pickle

use std::{convert::Infallible, fmt::Display, future::Future};

/// Represents a shared user-defined state of a single [`Pickle`] run.
///
/// A fresh [`World`] is created for every attempt of every [`Pickle`] and
/// dropped once its last after-hook completes, so no two [`Pickle`]s ever
/// share one. State that must outlive a [`Pickle`] (a connection pool, for
/// example) belongs in a [`std::sync::LazyLock`] instead.
///
/// [`Pickle`]: crate::Pickle
pub trait World: Sized + 'static {
    /// Error of creating a new [`World`] instance.
    type Error: Display;

    /// Creates a new [`World`] instance.
    fn new() -> impl Future<Output = Result<Self, Self::Error>>;
}

impl World for () {
    type Error = Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(())
    }
}
