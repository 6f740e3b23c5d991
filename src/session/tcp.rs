//! # TCP Report Server
//!
//! Broadcasts report lines to every connected TCP client.
//!
//! [`BroadcastSink`] is the tracker-facing end: `publish` serializes the
//! report once and hands it to a tokio broadcast channel without blocking.
//! [`serve`] accepts clients, subscribes each one to the channel, raises a
//! join on the [`SubscriberNotifier`] and forwards lines until the client
//! goes away. A client that falls behind skips reports instead of stalling
//! the tracker.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::{encode_line, ReportSink, SubscriberNotifier, TrackerReport};
use crate::error::Result;

/// Default number of lines buffered per slow client.
pub const DEFAULT_BACKLOG: usize = 64;

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Publishes reports to all connected clients.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    lines: broadcast::Sender<String>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG)
    }
}

impl BroadcastSink {
    /// Creates a sink buffering up to `backlog` lines per client.
    #[must_use]
    pub fn new(backlog: usize) -> Self {
        let (lines, _) = broadcast::channel(backlog.max(1));
        Self { lines }
    }

    /// Sender side handed to [`serve`].
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<String> {
        self.lines.clone()
    }

    /// Number of clients currently connected.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lines.receiver_count()
    }
}

impl ReportSink for BroadcastSink {
    fn publish(&mut self, report: &TrackerReport) -> Result<()> {
        let line = encode_line(report)?;
        // Err only means nobody is connected right now.
        if let Ok(receivers) = self.lines.send(line) {
            debug!("Broadcast report to {} subscribers", receivers);
        }
        Ok(())
    }
}

/// Accepts subscribers on `listener` for as long as the task runs.
///
/// A failed accept (out of file descriptors, aborted handshake) is logged and
/// retried after [`ACCEPT_BACKOFF`].
///
/// # Examples
///
/// ```no_run
/// use analog_fly::session::tcp::{serve, BroadcastSink};
/// use analog_fly::session::SubscriberNotifier;
/// use tokio::net::TcpListener;
///
/// # async fn run() -> analog_fly::error::Result<()> {
/// let sink = BroadcastSink::default();
/// let notifier = SubscriberNotifier::new();
/// let listener = TcpListener::bind("127.0.0.1:3883").await?;
/// tokio::spawn(serve(listener, sink.sender(), notifier.clone()));
/// # Ok(())
/// # }
/// ```
pub async fn serve(
    listener: TcpListener,
    lines: broadcast::Sender<String>,
    notifier: SubscriberNotifier,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Serving tracker reports on {}", addr);
    }
    accept_loop(|| listener.accept(), lines, notifier).await;
}

async fn accept_loop<A, Fut, S>(
    mut accept: A,
    lines: broadcast::Sender<String>,
    notifier: SubscriberNotifier,
) where
    A: FnMut() -> Fut,
    Fut: Future<Output = io::Result<(S, SocketAddr)>>,
    S: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let (stream, peer) = match accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept subscriber: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        // Subscribe before announcing the join so the resync report is not missed.
        let rx = lines.subscribe();
        notifier.notify_joined();
        info!("Subscriber connected: {}", peer);
        tokio::spawn(forward(stream, rx, peer));
    }
}

async fn forward<S>(mut stream: S, mut rx: broadcast::Receiver<String>, peer: SocketAddr)
where
    S: AsyncWrite + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(line) => {
                if let Err(e) = stream.write_all(line.as_bytes()).await {
                    info!("Subscriber {} disconnected: {}", peer, e);
                    return;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Subscriber {} lagging, skipped {} reports", peer, skipped);
            }
            Err(RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Pose, Vec3};
    use std::collections::VecDeque;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
    use tokio::net::TcpStream;

    async fn wait_for_joins(notifier: &SubscriberNotifier, count: u64) {
        for _ in 0..200 {
            if notifier.joined() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriber never registered");
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let mut sink = BroadcastSink::new(4);
        assert_eq!(sink.subscriber_count(), 0);
        assert!(sink.publish(&TrackerReport::from_pose(0, &Pose::IDENTITY)).is_ok());
    }

    #[tokio::test]
    async fn test_client_receives_report_after_join() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut sink = BroadcastSink::new(8);
        let notifier = SubscriberNotifier::new();
        tokio::spawn(serve(listener, sink.sender(), notifier.clone()));

        let client = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&notifier, 1).await;
        assert_eq!(sink.subscriber_count(), 1);

        let pose = Pose::from_position(Vec3::new(1.5, -2.0, 0.25));
        sink.publish(&TrackerReport::from_pose(0, &pose)).unwrap();

        let mut reader = BufReader::new(client);
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
            .await
            .expect("timed out waiting for report")
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["sensor"], 0);
        assert_eq!(value["position"][0], 1.5);
        assert_eq!(value["position"][1], -2.0);
    }

    #[tokio::test]
    async fn test_each_client_counts_as_join() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sink = BroadcastSink::new(8);
        let notifier = SubscriberNotifier::new();
        tokio::spawn(serve(listener, sink.sender(), notifier.clone()));

        let _a = TcpStream::connect(addr).await.unwrap();
        let _b = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&notifier, 2).await;
        assert_eq!(notifier.joined(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_error_does_not_stop_server() {
        let (server_side, client_side) = tokio::io::duplex(1024);
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let mut script: VecDeque<io::Result<(DuplexStream, SocketAddr)>> = VecDeque::from([
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "handshake aborted")),
            Err(io::Error::new(io::ErrorKind::Other, "too many open files")),
            Ok((server_side, peer)),
        ]);
        let accept = move || {
            let next = script.pop_front();
            async move {
                match next {
                    Some(result) => result,
                    None => std::future::pending().await,
                }
            }
        };

        let mut sink = BroadcastSink::new(8);
        let notifier = SubscriberNotifier::new();
        tokio::spawn(accept_loop(accept, sink.sender(), notifier.clone()));

        wait_for_joins(&notifier, 1).await;
        sink.publish(&TrackerReport::from_pose(4, &Pose::IDENTITY)).unwrap();

        let mut reader = BufReader::new(client_side);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["sensor"], 4);
    }
}
