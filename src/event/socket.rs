use super::Inbound;
use crate::config::{ListenerConfig, MAX_LINE_BYTES};
use color_eyre::Result;
use std::os::unix::io::{FromRawFd, IntoRawFd};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

/// Socket receive buffer size (inbound lines are small JSON objects)
const SOCKET_RECV_BUF: usize = 16 * 1024;

/// Listen for inbound items on a Unix socket until cancelled
pub async fn listen(
    tx: mpsc::Sender<Inbound>,
    socket_path: &Path,
    config: &ListenerConfig,
    cancel: CancellationToken,
) -> Result<()> {
    // Remove existing socket file
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    // Create socket with socket2 for buffer tuning
    let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None)?;

    // OS may clamp to minimum, which is fine
    if let Err(e) = socket.set_recv_buffer_size(SOCKET_RECV_BUF) {
        tracing::debug!("Could not set recv buffer size: {}", e);
    }

    socket.bind(&socket2::SockAddr::unix(socket_path)?)?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;

    // Convert to tokio UnixListener
    let std_listener: std::os::unix::net::UnixListener =
        unsafe { std::os::unix::net::UnixListener::from_raw_fd(socket.into_raw_fd()) };
    let listener = UnixListener::from_std(std_listener)?;

    tracing::info!("Listening on {:?}", socket_path);

    let semaphore = Arc::new(Semaphore::new(config.max_connections));
    let read_timeout = Duration::from_secs(config.read_timeout_secs);

    // Backoff state for accept errors
    let mut backoff_ms: u64 = 0;
    const MAX_BACKOFF_MS: u64 = 5000;

    loop {
        let accepted = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Socket listener cancelled");
                break;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, _)) => {
                backoff_ms = 0;

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(
                            "Connection limit reached ({} max), dropping connection",
                            config.max_connections
                        );
                        continue;
                    }
                };

                let tx = tx.clone();
                tokio::spawn(async move {
                    // Permit is held until this task completes
                    let _permit = permit;
                    let forwarded = forward_lines(stream, &tx, read_timeout).await;
                    tracing::trace!(forwarded, "Connection closed");
                });
            }
            Err(e) => {
                tracing::error!("Accept error: {}", e);

                // Exponential backoff to prevent CPU spin on persistent errors
                backoff_ms = if backoff_ms == 0 {
                    100
                } else {
                    (backoff_ms * 2).min(MAX_BACKOFF_MS)
                };

                tracing::debug!("Backing off for {}ms", backoff_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }

    if let Err(e) = std::fs::remove_file(socket_path) {
        tracing::debug!("Could not remove socket file: {}", e);
    }
    Ok(())
}

/// One line read with a length cap
enum BoundedLine {
    Line(String),
    /// Longer than the cap; the rest of it was discarded
    Oversized,
    /// Not valid UTF-8
    Invalid,
    Eof,
}

/// Read up to `MAX_LINE_BYTES` of the next line, never buffering more
async fn read_bounded_line<R>(reader: &mut R) -> std::io::Result<BoundedLine>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let cap = MAX_LINE_BYTES as u64 + 1;
    let n = (&mut *reader).take(cap).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(BoundedLine::Eof);
    }

    if buf.last() != Some(&b'\n') && buf.len() > MAX_LINE_BYTES {
        // Drain the remainder in capped chunks
        loop {
            let mut rest = Vec::new();
            let n = (&mut *reader).take(cap).read_until(b'\n', &mut rest).await?;
            if n == 0 || rest.last() == Some(&b'\n') {
                break;
            }
        }
        return Ok(BoundedLine::Oversized);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(String::from_utf8(buf).map_or(BoundedLine::Invalid, BoundedLine::Line))
}

/// Read newline-delimited items from one connection and forward them in order
///
/// Malformed or oversized lines are logged and skipped. Returns the number of
/// forwarded items.
pub async fn forward_lines<R>(
    reader: R,
    tx: &mpsc::Sender<Inbound>,
    read_timeout: Duration,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut forwarded = 0;

    loop {
        let line = match timeout(read_timeout, read_bounded_line(&mut reader)).await {
            Ok(Ok(BoundedLine::Line(line))) => line,
            Ok(Ok(BoundedLine::Eof)) => break, // Stream closed
            Ok(Ok(BoundedLine::Oversized)) => {
                tracing::warn!(max = MAX_LINE_BYTES, "Dropping oversized inbound line");
                continue;
            }
            Ok(Ok(BoundedLine::Invalid)) => {
                tracing::warn!("Dropping inbound line that is not UTF-8");
                continue;
            }
            Ok(Err(e)) => {
                tracing::warn!("Read error: {}", e);
                break;
            }
            Err(_) => {
                tracing::debug!("Read timeout (connection may be stale)");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match Inbound::parse_line(&line) {
            Ok(inbound) => {
                tracing::debug!("Received inbound: {:?}", inbound);
                if tx.send(inbound).await.is_err() {
                    // Consumer gone
                    break;
                }
                forwarded += 1;
            }
            Err(e) => {
                tracing::warn!("Invalid inbound line: {} - {}", e, line);
            }
        }
    }

    forwarded
}

/// Send lines to a running listener over a single connection
///
/// One connection keeps the lines in order; the listener handles each
/// connection on its own task. Blank lines are skipped. Returns the number
/// of lines sent.
pub async fn send_lines<'a, I>(socket_path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stream = timeout(Duration::from_millis(500), UnixStream::connect(socket_path))
        .await
        .map_err(|_| color_eyre::eyre::eyre!("Timed out connecting to {:?}", socket_path))??;

    let mut sent = 0;
    for line in lines.into_iter().filter(|l| !l.trim().is_empty()) {
        let data = format!("{}\n", line.trim_end());
        timeout(Duration::from_millis(500), stream.write_all(data.as_bytes()))
            .await
            .map_err(|_| color_eyre::eyre::eyre!("Timed out writing to {:?}", socket_path))??;
        sent += 1;
    }
    let _ = stream.shutdown().await;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Message;

    #[tokio::test]
    async fn test_forward_lines_skips_garbage() {
        let input: &[u8] = b"{\"kind\":\"busy\",\"busy\":true}\n\nnot json\n{\"kind\":\"reset\"}\n";
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = forward_lines(input, &tx, Duration::from_secs(1)).await;

        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await, Some(Inbound::Busy { busy: true }));
        assert_eq!(rx.recv().await, Some(Inbound::Reset));
    }

    #[tokio::test]
    async fn test_oversized_line_dropped_without_losing_next() {
        let mut input = "x".repeat(MAX_LINE_BYTES * 2 + 7).into_bytes();
        input.extend_from_slice(b"\n{\"kind\":\"reset\"}\n");
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = forward_lines(input.as_slice(), &tx, Duration::from_secs(1)).await;

        assert_eq!(forwarded, 1);
        assert_eq!(rx.recv().await, Some(Inbound::Reset));
    }

    #[tokio::test]
    async fn test_line_at_cap_accepted() {
        let pad = MAX_LINE_BYTES - r#"{"kind":"reset"}"#.len();
        let line = format!("{}{}\n", " ".repeat(pad), r#"{"kind":"reset"}"#);
        assert_eq!(line.len(), MAX_LINE_BYTES + 1);
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(forward_lines(line.as_bytes(), &tx, Duration::from_secs(1)).await, 1);
        assert_eq!(rx.recv().await, Some(Inbound::Reset));
    }

    #[tokio::test]
    async fn test_listen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.sock");
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let listen_path = path.clone();
        let listen_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            listen(tx, &listen_path, &ListenerConfig::default(), listen_cancel).await
        });

        // Wait for the socket to appear
        for _ in 0..50 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let start = r#"{"kind":"message","message":{"type":"AgentStateMessage","agentId":"a","running":true}}"#;
        let stop = r#"{"kind":"message","message":{"type":"AgentStateMessage","agentId":"a","running":false}}"#;
        let sent = send_lines(&path, [r#"{"kind":"busy","busy":false}"#, "", start, stop])
            .await
            .unwrap();
        assert_eq!(sent, 3);

        let mut received = Vec::new();
        for _ in 0..3 {
            let item = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
            received.push(item.unwrap());
        }
        assert_eq!(received[0], Inbound::Busy { busy: false });
        // Order within one push is preserved
        let running: Vec<bool> = received[1..]
            .iter()
            .map(|item| match item {
                Inbound::Message {
                    message: Message::AgentState { running, .. },
                } => *running,
                other => panic!("unexpected item: {other:?}"),
            })
            .collect();
        assert_eq!(running, vec![true, false]);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
