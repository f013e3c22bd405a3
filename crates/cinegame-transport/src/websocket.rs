//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each [`RealtimeTransport::connect`] spawns one I/O task that owns the
//! socket. The host thread talks to it through two unbounded channels:
//! commands go in, [`TransportEvent`]s come out and wait in the channel
//! until the next [`RealtimeTransport::poll_events`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cinegame_protocol::{ClientFrame, Codec, Envelope, Frame, JsonCodec};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::{
    ConnectConfig, DisconnectReason, RealtimeTransport, TransportError, TransportEvent,
};

enum Command {
    Send(ClientFrame),
    Close,
}

/// A [`RealtimeTransport`] over a WebSocket connection.
///
/// Requires a tokio runtime on the thread that calls
/// [`connect`](RealtimeTransport::connect).
#[derive(Default)]
pub struct WebSocketTransport {
    commands: Option<mpsc::UnboundedSender<Command>>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Creates a transport with no connection.
    pub fn new() -> Self {
        Self::default()
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.commands = None;
        self.events = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.abort_task();
    }
}

impl RealtimeTransport for WebSocketTransport {
    fn connect(&mut self, config: &ConnectConfig) -> Result<(), TransportError> {
        self.abort_task();

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();
        // Fresh flag per connection so an aborted task can't flip ours.
        let connected = Arc::new(AtomicBool::new(false));

        let url = config.url();
        debug!(%url, "connecting to realtime server");
        self.task = Some(runtime.spawn(run_connection(
            url,
            cmd_rx,
            evt_tx,
            Arc::clone(&connected),
        )));
        self.commands = Some(cmd_tx);
        self.events = Some(evt_rx);
        self.connected = connected;
        Ok(())
    }

    fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let commands = self.commands.as_ref().ok_or(TransportError::NotConnected)?;
        commands
            .send(Command::Send(frame))
            .map_err(|_| TransportError::ConnectionClosed("I/O task has exited".into()))
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut out = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                out.push(event);
            }
        }
        out
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(commands) = self.commands.take() {
            // The task closes the socket and exits on its own.
            let _ = commands.send(Command::Close);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn run_connection(
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!(%url, error = %e, "realtime connect failed");
            let _ = events.send(TransportEvent::ConnectFailed {
                reason: e.to_string(),
            });
            return;
        }
    };

    info!(%url, "connected to realtime server");
    connected.store(true, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Connected);

    let (mut sink, mut stream) = ws.split();
    let opened = Instant::now();
    let mut seq = 0u64;

    let reason = loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Send(frame)) => {
                    seq += 1;
                    let envelope = Envelope {
                        seq,
                        timestamp: opened.elapsed().as_millis() as u64,
                        frame: Frame::Client(frame),
                    };
                    let bytes = match JsonCodec.encode(&envelope) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(seq, error = %e, "dropping frame that failed to encode");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Binary(bytes.into())).await {
                        break DisconnectReason::Unknown(e.to_string());
                    }
                }
                // Close requested, or the transport was dropped.
                Some(Command::Close) | None => {
                    let _ = sink.close().await;
                    break DisconnectReason::Manual;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(data))) => deliver(&events, &data),
                Some(Ok(Message::Text(text))) => deliver(&events, text.as_bytes()),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => DisconnectReason::from_close_reason(&frame.reason),
                        None => DisconnectReason::Unknown("closed by server".into()),
                    };
                }
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => break DisconnectReason::Unknown(e.to_string()),
                None => break DisconnectReason::Unknown("stream ended".into()),
            },
        }
    };

    connected.store(false, Ordering::SeqCst);
    debug!(?reason, "realtime connection closed");
    let _ = events.send(TransportEvent::ConnectionLost { reason });
}

fn deliver(events: &mpsc::UnboundedSender<TransportEvent>, data: &[u8]) {
    match JsonCodec.decode::<Envelope>(data) {
        Ok(Envelope {
            frame: Frame::Server(frame),
            ..
        }) => {
            let _ = events.send(TransportEvent::Frame(frame));
        }
        Ok(Envelope { seq, .. }) => {
            warn!(seq, "server sent a client frame, ignoring");
        }
        Err(e) => {
            warn!(error = %e, len = data.len(), "undecodable frame from server");
        }
    }
}
