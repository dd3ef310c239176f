//! TCP subscriber server.
//!
//! Accepts subscriber connections and speaks the line-delimited JSON
//! protocol from [`protocol`]. Each connection gets one task for reading
//! commands and one for writing broadcasts; the write side is fed through
//! the hub, so a stalled subscriber never blocks the pipeline or its
//! peers.

pub mod protocol;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::chat::ChatProvider;
use crate::error::{Result, ScribecastError};
use crate::session::Session;
use protocol::{Inbound, Outbound};

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// Subscriber-facing TCP server bound to one session.
pub struct SubscriberServer {
    listener: TcpListener,
    session: Arc<Session>,
    chat: Arc<dyn ChatProvider>,
    state: ServerState,
}

impl SubscriberServer {
    /// Binds the listener.
    pub async fn bind(
        addr: &str,
        session: Arc<Session>,
        chat: Arc<dyn ChatProvider>,
    ) -> Result<Self> {
        let listener =
            TcpListener::bind(addr)
                .await
                .map_err(|e| ScribecastError::ServerBind {
                    addr: addr.to_string(),
                    message: e.to_string(),
                })?;
        info!(addr, "subscriber server listening");

        Ok(Self {
            listener,
            session,
            chat,
            state: ServerState::new(),
        })
    }

    /// The actually bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and serves subscribers until shutdown.
    pub async fn run(&self) -> Result<()> {
        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with a timeout so the shutdown flag is rechecked
            let accepted = tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                self.listener.accept(),
            )
            .await;

            match accepted {
                Ok(Ok((stream, peer))) => {
                    debug!(%peer, "subscriber connected");
                    let session = Arc::clone(&self.session);
                    let chat = Arc::clone(&self.chat);
                    tokio::spawn(async move {
                        if let Err(e) = handle_subscriber(stream, session, chat).await {
                            debug!(%peer, error = %e, "subscriber connection ended");
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(ScribecastError::Connection {
                        message: format!("accept failed: {}", e),
                    });
                }
                Err(_) => continue, // timeout, re-check shutdown
            }
        }

        Ok(())
    }

    /// Stops the accept loop after its current wait.
    pub async fn stop(&self) {
        self.state.set_shutdown().await;
    }
}

/// Serves one subscriber connection until it closes or misbehaves.
async fn handle_subscriber(
    stream: TcpStream,
    session: Arc<Session>,
    chat: Arc<dyn ChatProvider>,
) -> Result<()> {
    let (reader, writer) = stream.into_split();

    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let id = session.hub.join(tx);
    let writer_task = tokio::spawn(write_outbound(writer, rx));

    let result = read_inbound(reader, &session, chat.as_ref()).await;

    // Removal happens here and only here; a failed broadcast delivery never
    // evicts a subscriber behind the connection's back.
    session.hub.leave(id);
    writer_task.abort();

    result
}

/// Drains hub messages to the socket, one JSON line each.
async fn write_outbound(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = rx.recv().await {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound message");
                continue;
            }
        };
        if writer.write_all(json.as_bytes()).await.is_err()
            || writer.write_all(b"\n").await.is_err()
            || writer.flush().await.is_err()
        {
            // Subscriber gone; the read side will notice and leave the hub
            break;
        }
    }
}

/// Processes inbound commands line by line.
async fn read_inbound(
    reader: tokio::net::tcp::OwnedReadHalf,
    session: &Arc<Session>,
    chat: &dyn ChatProvider,
) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = match Inbound::from_json(line) {
            Ok(message) => message,
            Err(e) => {
                // Malformed input: log, close the connection
                warn!(error = %e, "malformed subscriber message, closing connection");
                return Err(ScribecastError::Connection {
                    message: format!("malformed message: {}", e),
                });
            }
        };

        match message {
            Inbound::Reset { content } => {
                if content == "clear" {
                    info!("reset requested by subscriber");
                    session.reset();
                } else {
                    debug!(%content, "ignoring reset with unknown content");
                }
            }
            Inbound::Prompt { content, star } => {
                session.hub.broadcast(Outbound::Prompt {
                    content: content.clone(),
                });
                match chat.complete(&content, star).await {
                    Ok(reply) => {
                        session.hub.broadcast(Outbound::Response { content: reply });
                    }
                    Err(e) => {
                        // Chat side-channel failures don't affect the
                        // transcription pipeline or other subscribers.
                        warn!(error = %e, "chat completion failed");
                    }
                }
            }
            Inbound::Unknown => {
                debug!("ignoring unknown message type");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;

    struct EchoChat;

    #[async_trait]
    impl ChatProvider for EchoChat {
        async fn complete(&self, prompt: &str, starred: bool) -> Result<String> {
            if starred {
                Ok(format!("starred: {}", prompt))
            } else {
                Ok(format!("echo: {}", prompt))
            }
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatProvider for FailingChat {
        async fn complete(&self, _prompt: &str, _starred: bool) -> Result<String> {
            Err(ScribecastError::ChatProvider {
                message: "provider down".to_string(),
            })
        }
    }

    fn test_session() -> Arc<Session> {
        let mut config = Config::default();
        config.audio.min_samples = 4;
        Arc::new(Session::new(&config))
    }

    async fn start_server(
        session: Arc<Session>,
        chat: Arc<dyn ChatProvider>,
    ) -> std::net::SocketAddr {
        let server = SubscriberServer::bind("127.0.0.1:0", session, chat)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move { server.run().await });
        addr
    }

    async fn read_line(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = stream.read(&mut byte).await.unwrap();
            if n == 0 || byte[0] == b'\n' {
                break;
            }
            buf.push(byte[0]);
        }
        String::from_utf8(buf).unwrap()
    }

    async fn wait_until_async(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_subscriber_receives_broadcasts() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        assert!(wait_until_async(|| session.hub.is_any_connected()).await);

        session.hub.broadcast(Outbound::Transcribe {
            content: "fresh words".to_string(),
        });

        let line = read_line(&mut stream).await;
        assert_eq!(line, r#"{"type":"transcribe","content":"fresh words"}"#);
    }

    #[tokio::test]
    async fn test_reset_clears_session_state() {
        let session = test_session();
        session.buffer.append(&[0.5; 64]);
        session.merge_segment("stale transcript");
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"{\"type\":\"reset\",\"content\":\"clear\"}\n")
            .await
            .unwrap();

        assert!(
            wait_until_async(|| session.buffer.is_empty() && session.transcript().is_empty())
                .await
        );
    }

    #[tokio::test]
    async fn test_prompt_fans_out_to_all_subscribers() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut asker = TcpStream::connect(addr).await.unwrap();
        let mut watcher = TcpStream::connect(addr).await.unwrap();
        assert!(wait_until_async(|| session.hub.subscriber_count() == 2).await);

        asker
            .write_all(b"{\"type\":\"prompt\",\"content\":\"what was said?\",\"star\":false}\n")
            .await
            .unwrap();

        for stream in [&mut asker, &mut watcher] {
            let prompt = read_line(stream).await;
            assert_eq!(prompt, r#"{"type":"prompt","content":"what was said?"}"#);
            let response = read_line(stream).await;
            assert_eq!(
                response,
                r#"{"type":"response","content":"echo: what was said?"}"#
            );
        }
    }

    #[tokio::test]
    async fn test_starred_prompt_reaches_provider() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"{\"type\":\"prompt\",\"content\":\"q\",\"star\":true}\n")
            .await
            .unwrap();

        let _prompt = read_line(&mut stream).await;
        let response = read_line(&mut stream).await;
        assert_eq!(response, r#"{"type":"response","content":"starred: q"}"#);
    }

    #[tokio::test]
    async fn test_chat_failure_still_broadcasts_prompt() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(FailingChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"{\"type\":\"prompt\",\"content\":\"q\"}\n")
            .await
            .unwrap();

        // The prompt echo arrives; no response follows, and the connection
        // stays usable.
        let prompt = read_line(&mut stream).await;
        assert_eq!(prompt, r#"{"type":"prompt","content":"q"}"#);

        session.hub.broadcast(Outbound::Transcribe {
            content: "still alive".to_string(),
        });
        let next = read_line(&mut stream).await;
        assert_eq!(next, r#"{"type":"transcribe","content":"still alive"}"#);
    }

    #[tokio::test]
    async fn test_unknown_message_type_is_ignored() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"{\"type\":\"future_feature\",\"content\":\"x\"}\n")
            .await
            .unwrap();

        // Connection survives: a later broadcast still arrives
        assert!(wait_until_async(|| session.hub.is_any_connected()).await);
        session.hub.broadcast(Outbound::Transcribe {
            content: "after unknown".to_string(),
        });
        let line = read_line(&mut stream).await;
        assert_eq!(line, r#"{"type":"transcribe","content":"after unknown"}"#);
    }

    #[tokio::test]
    async fn test_malformed_json_closes_connection_and_removes_subscriber() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        assert!(wait_until_async(|| session.hub.is_any_connected()).await);

        stream.write_all(b"this is not json\n").await.unwrap();

        // Server closes the connection and the subscriber leaves the hub
        assert!(wait_until_async(|| !session.hub.is_any_connected()).await);
        let mut rest = Vec::new();
        let n = stream.read_to_end(&mut rest).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_hub() {
        let session = test_session();
        let addr = start_server(Arc::clone(&session), Arc::new(EchoChat)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        assert!(wait_until_async(|| session.hub.subscriber_count() == 1).await);

        drop(stream);
        assert!(wait_until_async(|| session.hub.subscriber_count() == 0).await);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let session = test_session();
        let result =
            SubscriberServer::bind("256.256.256.256:1", session, Arc::new(EchoChat)).await;
        assert!(matches!(result, Err(ScribecastError::ServerBind { .. })));
    }
}
