use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::mpsc;

use crate::errors::StreamError;
use crate::event::{AppLogEntry, parse_app_log_line};
use crate::model::{AppId, AppLogOptions};
use crate::retry::{AttemptEnd, StreamRetryPolicy, run_attempts};
use crate::stream::{LogStream, STREAM_BUFFER_CAPACITY};
use crate::transport::LogTransport;

/// Spawns the app-log producer for one app and returns its handle.
///
/// One connection per retry attempt; there is no cursor, so a reconnect may
/// re-deliver lines the consumer has already seen.
pub(crate) fn spawn_app_log_stream(
    transport: Arc<dyn LogTransport>,
    app_id: AppId,
    options: AppLogOptions,
    policy: StreamRetryPolicy,
) -> LogStream<AppLogEntry> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER_CAPACITY);
    tokio::spawn(async move {
        let outcome = run_attempts(&policy, || {
            stream_attempt(
                transport.clone(),
                app_id.clone(),
                options.clone(),
                tx.clone(),
            )
        })
        .await;
        if let Err(err) = outcome {
            let _ = tx.send(Err(err)).await;
        }
    });
    LogStream::new(rx)
}

async fn stream_attempt(
    transport: Arc<dyn LogTransport>,
    app_id: AppId,
    options: AppLogOptions,
    tx: mpsc::Sender<Result<AppLogEntry, StreamError>>,
) -> Result<AttemptEnd, StreamError> {
    let mut lines = transport.open_app_logs(&app_id, &options).await?;

    while let Some(item) = lines.next().await {
        let line = item?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(entry) = parse_app_log_line(line)? else {
            continue;
        };
        if tx.send(Ok(entry)).await.is_err() {
            return Ok(AttemptEnd::ConsumerGone);
        }
    }

    Ok(AttemptEnd::Completed)
}
