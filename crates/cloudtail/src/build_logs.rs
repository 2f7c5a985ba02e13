use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::errors::StreamError;
use crate::event::{BuildLogEvent, parse_build_log_line};
use crate::model::DeploymentId;
use crate::retry::{AttemptEnd, StreamRetryPolicy, run_attempts};
use crate::stream::{LogStream, STREAM_BUFFER_CAPACITY};
use crate::transport::LogTransport;

const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Last acknowledged build-log event id; advances forward only.
///
/// Shared across retry attempts so a reconnect resumes after everything
/// already delivered, never rewound once set.
#[derive(Debug, Default)]
pub(crate) struct StreamCursor {
    last: Option<String>,
}

impl StreamCursor {
    pub(crate) fn resume_after(&self) -> Option<String> {
        self.last.clone()
    }

    /// Advances to `candidate` unless it sorts at or before the current id.
    pub(crate) fn advance(&mut self, candidate: &str) {
        match &self.last {
            None => self.last = Some(candidate.to_string()),
            Some(current) if moves_forward(current, candidate) => {
                self.last = Some(candidate.to_string());
            }
            Some(_) => {}
        }
    }
}

// Ids are server-issued opaque strings; compare numerically when both sides
// are integers, lexicographically otherwise.
fn moves_forward(current: &str, candidate: &str) -> bool {
    match (current.parse::<u128>(), candidate.parse::<u128>()) {
        (Ok(current), Ok(candidate)) => candidate > current,
        _ => candidate > current,
    }
}

/// Spawns the build-log producer for one deployment and returns its handle.
///
/// The stream ends after the first `complete`/`failed` event; fatal errors
/// and exhausted budgets arrive as a final `Err` item.
pub(crate) fn spawn_build_log_stream(
    transport: Arc<dyn LogTransport>,
    deployment_id: DeploymentId,
    policy: StreamRetryPolicy,
) -> LogStream<BuildLogEvent> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER_CAPACITY);
    tokio::spawn(async move {
        let cursor = Arc::new(Mutex::new(StreamCursor::default()));
        let outcome = run_attempts(&policy, || {
            stream_attempt(
                transport.clone(),
                deployment_id.clone(),
                cursor.clone(),
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

/// One retry attempt: the whole connect/stream/rotate loop.
///
/// A `timeout` event reconnects here after a fixed 500 ms without touching
/// the retry budget; an unexpectedly closed connection raises a transient
/// error so the driver re-enters with backoff, cursor intact.
async fn stream_attempt(
    transport: Arc<dyn LogTransport>,
    deployment_id: DeploymentId,
    cursor: Arc<Mutex<StreamCursor>>,
    tx: mpsc::Sender<Result<BuildLogEvent, StreamError>>,
) -> Result<AttemptEnd, StreamError> {
    loop {
        let resume_after = cursor.lock().await.resume_after();
        let mut lines = transport
            .open_build_logs(&deployment_id, resume_after.as_deref())
            .await?;

        loop {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Err(err),
                None => {
                    debug!(
                        deployment_id = %deployment_id,
                        "connection closed without terminal state"
                    );
                    return Err(StreamError::network(
                        "connection closed without terminal state",
                    ));
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(event) = parse_build_log_line(line) else {
                continue;
            };

            if let Some(id) = event.id() {
                cursor.lock().await.advance(id);
            }

            match event {
                BuildLogEvent::Heartbeat { .. } => {}
                BuildLogEvent::Timeout { .. } => {
                    debug!(deployment_id = %deployment_id, "received timeout event; reconnecting");
                    break;
                }
                BuildLogEvent::Complete { .. } | BuildLogEvent::Failed { .. } => {
                    let _ = tx.send(Ok(event)).await;
                    return Ok(AttemptEnd::Completed);
                }
                BuildLogEvent::Message { .. } => {
                    if tx.send(Ok(event)).await.is_err() {
                        return Ok(AttemptEnd::ConsumerGone);
                    }
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppId, AppLogOptions};
    use crate::transport::LineStream;
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    enum Connection {
        Lines(Vec<Result<String, StreamError>>),
        Fail(StreamError),
    }

    struct ScriptedTransport {
        connections: StdMutex<VecDeque<Connection>>,
        opens: StdMutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(connections: Vec<Connection>) -> Self {
            Self {
                connections: StdMutex::new(connections.into()),
                opens: StdMutex::new(Vec::new()),
            }
        }

        fn resume_params(&self) -> Vec<Option<String>> {
            self.opens.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl LogTransport for ScriptedTransport {
        async fn open_build_logs(
            &self,
            _deployment_id: &DeploymentId,
            resume_after: Option<&str>,
        ) -> Result<LineStream, StreamError> {
            self.opens
                .lock()
                .expect("lock")
                .push(resume_after.map(ToOwned::to_owned));
            match self.connections.lock().expect("lock").pop_front() {
                Some(Connection::Lines(lines)) => Ok(Box::pin(stream::iter(lines))),
                Some(Connection::Fail(err)) => Err(err),
                None => Err(StreamError::network("script exhausted")),
            }
        }

        async fn open_app_logs(
            &self,
            _app_id: &AppId,
            _options: &AppLogOptions,
        ) -> Result<LineStream, StreamError> {
            unreachable!("build log tests only")
        }
    }

    fn line(raw: &str) -> Result<String, StreamError> {
        Ok(raw.to_string())
    }

    fn stream_with(transport: &Arc<ScriptedTransport>) -> LogStream<BuildLogEvent> {
        spawn_build_log_stream(
            transport.clone() as Arc<dyn LogTransport>,
            DeploymentId::new("dep-1"),
            StreamRetryPolicy::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_event_reconnects_once_without_consuming_retries() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Connection::Lines(vec![line(r#"{"type":"timeout"}"#)]),
            Connection::Lines(vec![
                line(r#"{"type":"message","message":"hi"}"#),
                line(r#"{"type":"complete"}"#),
            ]),
        ]));
        let mut events = stream_with(&transport);

        let first = events.next().await.expect("first").expect("ok");
        assert_eq!(
            first,
            BuildLogEvent::Message {
                message: "hi".to_string(),
                id: None,
            }
        );
        let second = events.next().await.expect("second").expect("ok");
        assert_eq!(second, BuildLogEvent::Complete { id: None });
        assert!(events.next().await.is_none());
        assert_eq!(transport.resume_params(), vec![None, None]);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_retries_with_the_advanced_cursor() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Connection::Lines(vec![line(r#"{"type":"message","message":"one","id":"7"}"#)]),
            Connection::Lines(vec![line(r#"{"type":"complete","id":"8"}"#)]),
        ]));
        let mut events = stream_with(&transport);

        let first = events.next().await.expect("first").expect("ok");
        assert_eq!(first.id(), Some("7"));
        let second = events.next().await.expect("second").expect("ok");
        assert!(second.is_terminal());
        assert!(events.next().await.is_none());
        assert_eq!(
            transport.resume_params(),
            vec![None, Some("7".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failed_event_stops_all_reconnects() {
        let transport = Arc::new(ScriptedTransport::new(vec![Connection::Lines(vec![line(
            r#"{"type":"failed","id":"3"}"#,
        )])]));
        let mut events = stream_with(&transport);

        let only = events.next().await.expect("event").expect("ok");
        assert_eq!(
            only,
            BuildLogEvent::Failed {
                id: Some("3".to_string()),
            }
        );
        assert!(events.next().await.is_none());
        assert_eq!(transport.resume_params().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_and_malformed_lines_are_not_surfaced() {
        let transport = Arc::new(ScriptedTransport::new(vec![Connection::Lines(vec![
            line(r#"{"type":"heartbeat","id":"1"}"#),
            line("not json"),
            line(r#"{"type":"bogus"}"#),
            line("   "),
            line(r#"{"type":"complete","id":"2"}"#),
        ])]));
        let mut events = stream_with(&transport);

        let only = events.next().await.expect("event").expect("ok");
        assert!(only.is_terminal());
        assert!(events.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_on_connect_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new(vec![Connection::Fail(
            StreamError::client(Some(404), "HTTP 404: deployment not found"),
        )]));
        let mut events = stream_with(&transport);

        let err = events.next().await.expect("item").expect_err("fatal");
        assert_eq!(err.status(), Some(404));
        assert!(events.next().await.is_none());
        assert_eq!(transport.resume_params().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_transient_failures_exhaust_the_budget() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Connection::Fail(StreamError::network("reset")),
            Connection::Fail(StreamError::network("reset")),
            Connection::Fail(StreamError::network("reset")),
        ]));
        let mut events = stream_with(&transport);

        let err = events.next().await.expect("item").expect_err("exhausted");
        assert_eq!(err, StreamError::too_many_retries(3));
        assert!(events.next().await.is_none());
        assert_eq!(transport.resume_params().len(), 3);
    }

    #[test]
    fn cursor_accepts_the_first_id() {
        let mut cursor = StreamCursor::default();
        assert_eq!(cursor.resume_after(), None);
        cursor.advance("7");
        assert_eq!(cursor.resume_after(), Some("7".to_string()));
    }

    #[test]
    fn cursor_never_moves_backward() {
        let mut cursor = StreamCursor::default();
        cursor.advance("7");
        cursor.advance("3");
        assert_eq!(cursor.resume_after(), Some("7".to_string()));
        cursor.advance("10");
        assert_eq!(cursor.resume_after(), Some("10".to_string()));
    }

    #[test]
    fn cursor_compares_non_numeric_ids_lexicographically() {
        let mut cursor = StreamCursor::default();
        cursor.advance("abc");
        cursor.advance("abd");
        assert_eq!(cursor.resume_after(), Some("abd".to_string()));
        cursor.advance("aaa");
        assert_eq!(cursor.resume_after(), Some("abd".to_string()));
    }
}
