// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Future`] helpers bounding step and hook execution.

use std::{
    future::Future,
    pin::{pin, Pin},
    task,
    time::Duration,
};

use futures::{
    future::{Either, FusedFuture},
    FutureExt as _,
};
use tokio_util::sync::CancellationToken;

/// Outcome of a [`bounded()`] [`Future`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Bounded<T> {
    /// Resolved in time.
    Completed(T),

    /// Exceeded its timeout.
    TimedOut,

    /// Didn't resolve within the grace period after cancellation.
    Cancelled,
}

/// Runs the `fut` until it resolves, the `timeout` elapses, or the `grace`
/// period after the `cancel`lation of the token passes, whatever comes first.
///
/// The `fut` is always polled before the deadlines, so a [`Future`] ready at
/// the same moment still completes.
pub(crate) async fn bounded<F: Future>(
    fut: F,
    timeout: Duration,
    cancel: &CancellationToken,
    grace: Duration,
) -> Bounded<F::Output> {
    let fut = pin!(tokio::time::timeout(timeout, fut));
    let cancelled = pin!(async {
        cancel.cancelled().await;
        tokio::time::sleep(grace).await;
    });

    match select_with_biased_first(fut, cancelled).await {
        Either::Left((Ok(out), _)) => Bounded::Completed(out),
        Either::Left((Err(_), _)) => Bounded::TimedOut,
        Either::Right(((), _)) => Bounded::Cancelled,
    }
}

/// [`select`] that always [`poll()`]s the `biased` [`Future`] first, and only
/// if it returns [`task::Poll::Pending`] tries to [`poll()`] the `regular` one.
///
/// [`poll()`]: Future::poll
/// [`select`]: futures::future::select
pub(crate) const fn select_with_biased_first<A, B>(
    biased: A,
    regular: B,
) -> SelectWithBiasedFirst<A, B>
where
    A: Future + Unpin,
    B: Future + Unpin,
{
    SelectWithBiasedFirst { inner: Some((biased, regular)) }
}

/// [`Future`] returned by a [`select_with_biased_first()`] function.
pub(crate) struct SelectWithBiasedFirst<A, B> {
    /// Inner [`Future`]s, taken once resolved.
    inner: Option<(A, B)>,
}

impl<A, B> Future for SelectWithBiasedFirst<A, B>
where
    A: Future + Unpin,
    B: Future + Unpin,
{
    type Output = Either<(A::Output, B), (B::Output, A)>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Self::Output> {
        let Some((mut a, mut b)) = self.inner.take() else {
            return task::Poll::Pending;
        };

        if let task::Poll::Ready(val) = a.poll_unpin(cx) {
            return task::Poll::Ready(Either::Left((val, b)));
        }

        if let task::Poll::Ready(val) = b.poll_unpin(cx) {
            return task::Poll::Ready(Either::Right((val, a)));
        }

        self.inner = Some((a, b));
        task::Poll::Pending
    }
}

impl<A, B> FusedFuture for SelectWithBiasedFirst<A, B>
where
    A: Future + Unpin,
    B: Future + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use futures::future;

    use super::*;

    const LONG: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn completes_in_time() {
        let token = CancellationToken::new();
        let out = bounded(async { 42 }, LONG, &token, LONG).await;
        assert_eq!(out, Bounded::Completed(42));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let token = CancellationToken::new();
        let out = bounded(
            future::pending::<()>(),
            Duration::from_millis(50),
            &token,
            LONG,
        )
        .await;
        assert_eq!(out, Bounded::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_waits_for_grace_period() {
        let token = CancellationToken::new();
        token.cancel();

        let quick = bounded(
            tokio::time::sleep(Duration::from_millis(10)),
            LONG,
            &token,
            Duration::from_millis(100),
        )
        .await;
        assert_eq!(quick, Bounded::Completed(()));

        let stuck =
            bounded(future::pending::<()>(), LONG, &token, Duration::from_millis(100))
                .await;
        assert_eq!(stuck, Bounded::Cancelled);
    }

    #[tokio::test]
    async fn biased_future_wins_ties() {
        let out = select_with_biased_first(future::ready(1), future::ready(2)).await;
        assert!(matches!(out, Either::Left((1, _))));
    }
}
