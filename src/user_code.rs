// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Uniform invocation of user code, whatever interface it completes through.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};

use derive_more::with_trait::Display;
use futures::{
    channel::oneshot,
    future::{self, LocalBoxFuture},
    pin_mut, select_biased, FutureExt as _,
};

use crate::{
    error::Failure,
    fault::FaultChannel,
    step::{Context, Outcome},
};

/// Result of user code.
pub type Output = anyhow::Result<Outcome>;

/// Synchronous body.
pub type SyncFn<W> = fn(&mut W, &Context) -> Output;

/// Body completing with the returned future.
pub type FutureFn<W> =
    for<'a> fn(&'a mut W, &'a Context) -> LocalBoxFuture<'a, Output>;

/// Body completing by calling the provided [`Done`].
///
/// Returning [`Some`] future as well is a usage error.
pub type CallbackFn<W> = for<'a> fn(
    &'a mut W,
    &'a Context,
    Done,
) -> Option<LocalBoxFuture<'a, Output>>;

/// User code with its interface declared at registration.
pub enum Invocable<W> {
    /// Completes when returns.
    Sync(SyncFn<W>),

    /// Completes when the returned future resolves.
    Future(FutureFn<W>),

    /// Completes when the provided [`Done`] is called.
    Callback(CallbackFn<W>),
}

impl<W> Clone for Invocable<W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for Invocable<W> {}

impl<W> fmt::Debug for Invocable<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(func) => write!(f, "Sync({:p})", *func as *const ()),
            Self::Future(func) => write!(f, "Future({:p})", *func as *const ()),
            Self::Callback(func) => {
                write!(f, "Callback({:p})", *func as *const ())
            }
        }
    }
}

impl<W> Invocable<W> {
    /// Returns the asynchronous [`Interface`] of this [`Invocable`], if any.
    #[must_use]
    pub const fn interface(&self) -> Option<Interface> {
        match self {
            Self::Sync(_) => None,
            Self::Future(_) => Some(Interface::Future),
            Self::Callback(_) => Some(Interface::Callback),
        }
    }
}

/// Asynchronous interface user code completes through.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Interface {
    /// [`Done`] callback.
    #[display("callback is executed")]
    Callback,

    /// Returned future.
    #[display("future resolves")]
    Future,
}

/// Completion callback of an [`Invocable::Callback`].
///
/// Can be moved to another thread. Dropping it without calling fails the
/// invocation.
#[derive(Debug)]
pub struct Done(oneshot::Sender<Output>);

impl Done {
    /// Completes with [`Outcome::Passed`].
    pub fn ok(self) {
        self.finish(Ok(Outcome::Passed));
    }

    /// Completes with the given error.
    pub fn fail(self, err: impl Into<anyhow::Error>) {
        self.finish(Err(err.into()));
    }

    /// Completes with the given [`Output`].
    pub fn finish(self, output: Output) {
        // Receiver is gone once the invocation timed out.
        _ = self.0.send(output);
    }
}

/// Runner of [`Invocable`]s.
#[derive(Clone, Debug, Default)]
pub struct UserCodeRunner {
    faults: FaultChannel,
}

impl UserCodeRunner {
    /// Creates a new [`UserCodeRunner`] racing invocations against the given
    /// [`FaultChannel`].
    #[must_use]
    pub const fn new(faults: FaultChannel) -> Self {
        Self { faults }
    }

    /// Returns the [`FaultChannel`] of this [`UserCodeRunner`].
    #[must_use]
    pub const fn faults(&self) -> &FaultChannel {
        &self.faults
    }

    /// Invokes the given `code`.
    ///
    /// Synchronous code is just called. Asynchronous code is raced against
    /// the [`FaultChannel`] and the `timeout` ([`None`] means no timeout).
    ///
    /// # Errors
    ///
    /// If the `code` returns an error, panics, reports a fault, times out, or
    /// misuses its interface. See [`Failure`] for details.
    pub async fn run<W>(
        &self,
        code: &Invocable<W>,
        world: &mut W,
        ctx: &Context,
        timeout: Option<Duration>,
    ) -> Result<Outcome, Failure> {
        let mut armed = self.faults.arm();

        let (interface, completion): (_, LocalBoxFuture<'_, _>) = match *code {
            Invocable::Sync(func) => {
                let output = panic::catch_unwind(AssertUnwindSafe(move || {
                    let world = world;
                    func(world, ctx)
                }));
                if let Some(fault) = armed.fault().now_or_never() {
                    return Err(Failure::Uncaught(fault));
                }
                return output
                    .map_err(Failure::panic)?
                    .map_err(Failure::from);
            }
            Invocable::Future(func) => {
                let fut = panic::catch_unwind(AssertUnwindSafe(move || {
                    let world = world;
                    func(world, ctx)
                }))
                .map_err(Failure::panic)?;
                let fut = AssertUnwindSafe(fut).catch_unwind().map(|res| {
                    res.map_err(Failure::panic)?.map_err(Failure::from)
                });
                (Interface::Future, fut.boxed_local())
            }
            Invocable::Callback(func) => {
                let (tx, rx) = oneshot::channel();
                let returned = panic::catch_unwind(AssertUnwindSafe(move || {
                    func(world, ctx, Done(tx))
                }))
                .map_err(Failure::panic)?;
                if returned.is_some() {
                    return Err(Failure::MultipleInterfaces);
                }
                let fut = rx.map(|res| match res {
                    Ok(output) => output.map_err(Failure::from),
                    Err(oneshot::Canceled) => Err(Failure::CallbackDropped),
                });
                (Interface::Callback, fut.boxed_local())
            }
        };

        let fault = armed.fault().fuse();
        let completion = completion.fuse();
        let deadline = async move {
            match timeout {
                Some(after) => {
                    tokio::time::sleep(after).await;
                    after
                }
                None => future::pending().await,
            }
        }
        .fuse();
        pin_mut!(fault, completion, deadline);

        let res = select_biased! {
            fault = fault => Err(Failure::Uncaught(fault)),
            res = completion => res,
            after = deadline => Err(Failure::Timeout { interface, after }),
        };
        res
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use futures::FutureExt as _;

    use crate::Pickle;

    use super::*;

    fn ctx() -> Context {
        Context::new(Arc::new(Pickle::new("user code")))
    }

    async fn run(
        code: Invocable<u32>,
        timeout: Option<Duration>,
    ) -> Result<Outcome, Failure> {
        let mut world = 0;
        UserCodeRunner::default()
            .run(&code, &mut world, &ctx(), timeout)
            .await
    }

    #[tokio::test]
    async fn sync_code_completes_without_racing() {
        let mut world = 0;
        let code = Invocable::Sync(|w: &mut u32, _| {
            *w += 1;
            Ok(Outcome::Pending)
        });
        let res = UserCodeRunner::default()
            .run(&code, &mut world, &ctx(), Some(Duration::ZERO))
            .await;

        assert!(matches!(res, Ok(Outcome::Pending)));
        assert_eq!(world, 1);
    }

    #[tokio::test]
    async fn sync_panic_becomes_failure() {
        let res = run(Invocable::Sync(|_, _| panic!("boom")), None).await;

        assert_eq!(res.unwrap_err().to_string(), "Step panicked: boom");
    }

    #[tokio::test]
    async fn future_resolving_before_timeout() {
        let code = Invocable::Future(|_, _| {
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Outcome::Passed)
            }
            .boxed_local()
        });

        let res = run(code, Some(Duration::from_millis(25))).await;
        assert!(matches!(res, Ok(Outcome::Passed)));
    }

    #[tokio::test]
    async fn future_resolving_after_timeout() {
        let code = Invocable::Future(|_, _| {
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Outcome::Passed)
            }
            .boxed_local()
        });

        let err = run(code, Some(Duration::from_millis(5))).await.unwrap_err();
        assert!(matches!(
            err,
            Failure::Timeout { interface: Interface::Future, .. },
        ));
        assert!(err.to_string().contains("within 5 milliseconds"), "{err}");
    }

    #[tokio::test]
    async fn no_timeout_waits_for_completion() {
        let code = Invocable::Future(|_, _| {
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(anyhow::anyhow!("rejected"))
            }
            .boxed_local()
        });

        let err = run(code, None).await.unwrap_err();
        assert_eq!(err.to_string(), "rejected");
    }

    #[tokio::test]
    async fn future_panic_becomes_failure() {
        fn explode() -> Output {
            panic!("async boom")
        }

        let code = Invocable::Future(|_, _| {
            async {
                tokio::task::yield_now().await;
                explode()
            }
            .boxed_local()
        });

        let err = run(code, None).await.unwrap_err();
        assert!(matches!(err, Failure::Panic(_)));
    }

    #[tokio::test]
    async fn callback_completes_from_another_thread() {
        let code = Invocable::Callback(|_, _, done| {
            drop(thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                done.ok();
            }));
            None
        });

        let res = run(code, Some(Duration::from_secs(1))).await;
        assert!(matches!(res, Ok(Outcome::Passed)));
    }

    #[tokio::test]
    async fn callback_timeout_names_callback() {
        let code = Invocable::Callback(|_, _, done| {
            drop(thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                done.ok();
            }));
            None
        });

        let err = run(code, Some(Duration::from_millis(5))).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "function timed out, ensure the callback is executed within 5 \
             milliseconds",
        );
    }

    #[tokio::test]
    async fn dropped_callback_fails() {
        let code = Invocable::Callback(|_, _, done| {
            drop(done);
            None
        });

        let err = run(code, None).await.unwrap_err();
        assert!(matches!(err, Failure::CallbackDropped));
    }

    #[tokio::test]
    async fn multiple_interfaces_are_rejected_immediately() {
        thread_local! {
            static CALLS: std::cell::Cell<usize> =
                const { std::cell::Cell::new(0) };
        }

        let code = Invocable::Callback(|_, _, done| {
            CALLS.with(|c| c.set(c.get() + 1));
            drop(done);
            Some(async { Ok(Outcome::Passed) }.boxed_local())
        });

        let err = run(code, Some(Duration::from_secs(1))).await.unwrap_err();
        assert!(matches!(err, Failure::MultipleInterfaces));
        assert_eq!(
            err.to_string(),
            "function uses multiple asynchronous interfaces: callback and \
             future",
        );
        assert_eq!(CALLS.with(std::cell::Cell::get), 1);
    }

    #[tokio::test]
    async fn reported_fault_wins_the_race() {
        let runner = UserCodeRunner::default();
        let mut ctx = ctx();
        ctx.faults = runner.faults().reporter();
        let code = Invocable::Callback(|_, ctx, done| {
            let faults = ctx.faults.clone();
            drop(thread::spawn(move || {
                assert!(faults.report("escaped"));
                thread::sleep(Duration::from_millis(50));
                done.ok();
            }));
            None
        });

        let err = runner
            .run(&code, &mut 0, &ctx, Some(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Uncaught fault: escaped");
        assert!(!runner.faults().is_armed());
    }

    #[tokio::test]
    async fn fault_reported_by_sync_code_fails_it() {
        let runner = UserCodeRunner::default();
        let mut ctx = ctx();
        ctx.faults = runner.faults().reporter();
        let code = Invocable::Sync(|_, ctx| {
            assert!(ctx.faults.report("escaped"));
            Ok(Outcome::Passed)
        });

        let err = runner
            .run(&code, &mut 0, &ctx, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Failure::Uncaught(_)));
        assert_eq!(err.to_string(), "Uncaught fault: escaped");
        assert!(!runner.faults().is_armed());
    }
}
