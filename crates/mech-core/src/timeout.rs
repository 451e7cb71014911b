//! Inactivity-timeout wrapper for a provider's raw event stream (spec.md
//! §4.C, §9 "Streaming timeouts"): races each pull against a re-armable
//! timer, closing the underlying stream and surfacing a typed error when
//! it fires instead of hanging forever.

use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use mech_domain::error::{Error, Result};
use mech_domain::stream::{BoxStream, StreamEvent};

/// Wrap `inner` so that each `next()` is raced against `timeout`. The
/// timer rearms on every yielded item; firing once yields a timeout error
/// and drops `inner`, which closes the underlying network stream.
pub fn with_inactivity_timeout(mut inner: BoxStream<'static, Result<StreamEvent>>, timeout: Duration) -> BoxStream<'static, Result<StreamEvent>> {
    Box::pin(stream! {
        loop {
            match tokio::time::timeout(timeout, inner.next()).await {
                Ok(Some(item)) => yield item,
                Ok(None) => break,
                Err(_) => {
                    yield Err(Error::Timeout(format!("no stream activity for {timeout:?}")));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn boxed(events: Vec<Result<StreamEvent>>) -> BoxStream<'static, Result<StreamEvent>> {
        Box::pin(stream::iter(events))
    }

    #[tokio::test]
    async fn relays_all_events_before_exhaustion() {
        let events = vec![Ok(StreamEvent::Token { text: "a".into() }), Ok(StreamEvent::Token { text: "b".into() })];
        let wrapped = with_inactivity_timeout(boxed(events), Duration::from_secs(5));
        let collected: Vec<_> = wrapped.collect().await;
        assert_eq!(collected.len(), 2);
    }

    #[tokio::test]
    async fn fires_timeout_on_a_stalled_stream() {
        let pending: BoxStream<'static, Result<StreamEvent>> = Box::pin(futures_util::stream::pending());
        let wrapped = with_inactivity_timeout(pending, Duration::from_millis(20));
        let mut wrapped = wrapped;
        let first = wrapped.next().await;
        match first {
            Some(Err(Error::Timeout(_))) => {}
            other => panic!("expected a timeout error, got {other:?}"),
        }
        assert!(wrapped.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_stream_ends_without_error() {
        let wrapped = with_inactivity_timeout(boxed(vec![]), Duration::from_secs(5));
        let collected: Vec<_> = wrapped.collect().await;
        assert!(collected.is_empty());
    }
}
