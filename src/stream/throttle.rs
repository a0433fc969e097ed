//! Rate limiting for record streams

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// Latest wins: items arriving between ticks replace each other and only
    /// the newest is emitted. A quiet period does not end the stream.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream returned by [`ThrottleExt::throttle`]
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { stream, interval, pending: None, exhausted: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.exhausted { Poll::Ready(None) } else { Poll::Pending };
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest() {
        let (tx, rx) = mpsc::unbounded_channel();
        let period = Duration::from_millis(100);
        let mut stream = Box::pin(UnboundedReceiverStream::new(rx).throttle(period));

        tx.send(1).unwrap();
        assert_eq!(stream.next().await, Some(1));

        for i in 2..=10 {
            tx.send(i).unwrap();
        }
        assert_eq!(stream.next().await, Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_does_not_end_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        let period = Duration::from_millis(10);
        let mut stream = Box::pin(UnboundedReceiverStream::new(rx).throttle(period));

        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(7).unwrap();
        });

        assert_eq!(stream.next().await, Some(7));
        late.await.unwrap();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn finite_input_drains_to_newest() {
        let period = Duration::from_millis(100);
        let mut stream = Box::pin(futures::stream::iter(0..5).throttle(period));

        let start = tokio::time::Instant::now();
        // Finite input is drained at once; only the newest survives
        assert_eq!(stream.next().await, Some(4));
        assert_eq!(stream.next().await, None);
        assert!(start.elapsed() < period);
    }
}
