// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Signal-triggered cancellation.

use std::{io, pin::pin};

use futures::future::Either;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::future::select_with_biased_first;

/// Cancels the `token` on `Ctrl+C`.
///
/// Resolves once the `token` is cancelled, either by the signal or by
/// anything else. Meant to be spawned next to a run.
///
/// # Errors
///
/// If the signal handler can't be installed.
pub async fn shutdown_on_ctrl_c(token: CancellationToken) -> io::Result<()> {
    let cancelled = pin!(token.cancelled());
    let ctrl_c = pin!(tokio::signal::ctrl_c());

    if let Either::Right((res, _)) = select_with_biased_first(cancelled, ctrl_c).await {
        res?;
        warn!("Ctrl+C received, shutting down");
        token.cancel();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once_cancelled_elsewhere() {
        let token = CancellationToken::new();
        token.cancel();
        shutdown_on_ctrl_c(token.clone()).await.unwrap();
        assert!(token.is_cancelled());
    }
}
