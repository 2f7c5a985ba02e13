use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::errors::StreamError;

pub(crate) const STREAM_BUFFER_CAPACITY: usize = 128;

/// Consumer handle for a spawned log stream.
///
/// Items arrive in network order; a fatal failure is delivered as the last
/// `Err` item before the stream ends. Dropping the handle cancels the
/// producer task at its next send or await point, releasing the underlying
/// connection.
pub struct LogStream<T> {
    rx: mpsc::Receiver<Result<T, StreamError>>,
}

impl<T> LogStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<Result<T, StreamError>>) -> Self {
        Self { rx }
    }

    /// Waits for the next item; `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<T, StreamError>> {
        self.rx.recv().await
    }
}

impl<T> futures::Stream for LogStream<T> {
    type Item = Result<T, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
