//! Push-channel lifecycle: one websocket, one reader task dispatching inbound
//! events to registered handlers, one writer task draining outbound commands.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use shared::protocol::{decode_inbound, InboundEvent, InboundKind, OutboundCommand};
use thiserror::Error;
use tokio::{sync::mpsc, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::CommandSink;

/// Upper bound on the TCP connect plus websocket handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Handler = Box<dyn FnMut(&InboundEvent) + Send>;
type HandlerMap = HashMap<InboundKind, Vec<Handler>>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("server_url must start with http:// or https:// (got '{0}')")]
    UnsupportedScheme(String),
}

enum Link {
    Disconnected,
    Connecting,
    Connected {
        generation: u64,
        outbound: mpsc::UnboundedSender<Message>,
    },
}

struct LinkState {
    link: Link,
    generation: u64,
}

pub struct ConnectionManager {
    ws_url: String,
    connect_timeout: Duration,
    handlers: Arc<Mutex<HandlerMap>>,
    state: Arc<Mutex<LinkState>>,
}

/// Puts the link back to `Disconnected` if it is still `Connecting` for this
/// attempt when dropped. Covers handshake errors, timeouts and a caller
/// dropping the `connect` future.
struct PendingConnect<'a> {
    state: &'a Mutex<LinkState>,
    generation: u64,
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        let mut guard = lock(self.state);
        if matches!(guard.link, Link::Connecting) && guard.generation == self.generation {
            guard.link = Link::Disconnected;
            debug!(generation = self.generation, "push: abandoned connect attempt");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `http(s)://host[/prefix]` becomes `ws(s)://host[/prefix]/ws`.
pub fn websocket_url(server_url: &str) -> Result<String, ConnectionError> {
    let mut url = Url::parse(server_url).map_err(|source| ConnectionError::InvalidUrl {
        url: server_url.to_string(),
        source,
    })?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(ConnectionError::UnsupportedScheme(server_url.to_string())),
    };
    if url.set_scheme(scheme).is_err() {
        return Err(ConnectionError::UnsupportedScheme(server_url.to_string()));
    }
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    Ok(url.to_string())
}

impl ConnectionManager {
    pub fn new(server_url: &str) -> Result<Self, ConnectionError> {
        Ok(Self {
            ws_url: websocket_url(server_url)?,
            connect_timeout: CONNECT_TIMEOUT,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            state: Arc::new(Mutex::new(LinkState {
                link: Link::Disconnected,
                generation: 0,
            })),
        })
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Registers a handler for one inbound event kind. Handlers run on the
    /// reader task, one message at a time, in arrival order; they must not
    /// call back into `on`.
    pub fn on<F>(&self, kind: InboundKind, handler: F)
    where
        F: FnMut(&InboundEvent) + Send + 'static,
    {
        lock(&self.handlers)
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    pub fn is_connected(&self) -> bool {
        matches!(lock(&self.state).link, Link::Connected { .. })
    }

    /// Opens the push channel. Calling it while connected or connecting is a
    /// no-op. A handshake that outlives the connect timeout fails, and a
    /// failed or cancelled attempt leaves the manager `Disconnected`.
    pub async fn connect(&self) -> Result<()> {
        let generation = {
            let mut guard = lock(&self.state);
            if !matches!(guard.link, Link::Disconnected) {
                debug!(url = %self.ws_url, "push: connect requested while already open");
                return Ok(());
            }
            guard.link = Link::Connecting;
            guard.generation += 1;
            guard.generation
        };

        let pending = PendingConnect {
            state: &self.state,
            generation,
        };

        let ws_stream = match timeout(self.connect_timeout, connect_async(self.ws_url.as_str())).await
        {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(err)) => {
                return Err(err)
                    .with_context(|| format!("failed to connect websocket: {}", self.ws_url));
            }
            Err(_) => {
                return Err(anyhow!(
                    "websocket handshake with {} timed out after {:?}",
                    self.ws_url,
                    self.connect_timeout
                ));
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        lock(&self.state).link = Link::Connected {
            generation,
            outbound,
        };
        drop(pending);
        info!(url = %self.ws_url, "push: connected");

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(err) = ws_writer.send(message).await {
                    warn!("push: websocket send failed: {err}");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let handlers = Arc::clone(&self.handlers);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(frame) = ws_reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch(&handlers, &text),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("push: websocket receive failed: {err}");
                        break;
                    }
                }
            }

            let mut guard = lock(&state);
            if matches!(guard.link, Link::Connected { generation: current, .. } if current == generation)
            {
                guard.link = Link::Disconnected;
            }
            warn!("push: disconnected; live updates paused");
        });

        Ok(())
    }

    /// Closes the channel. Further emits are dropped until `connect` succeeds
    /// again.
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut lock(&self.state).link, Link::Disconnected);
        if let Link::Connected { outbound, .. } = previous {
            let _ = outbound.send(Message::Close(None));
            info!(url = %self.ws_url, "push: closed by client");
        }
    }

    /// Sends one command. While disconnected the command is dropped and only
    /// logged.
    pub fn emit(&self, command: OutboundCommand) {
        let name = command.name();
        let guard = lock(&self.state);
        let Link::Connected { outbound, .. } = &guard.link else {
            warn!(command = name, "push: not connected; dropping outbound command");
            return;
        };
        let text = match serde_json::to_string(&command) {
            Ok(text) => text,
            Err(err) => {
                warn!(command = name, "push: failed to encode outbound command: {err}");
                return;
            }
        };
        if outbound.send(Message::Text(text)).is_err() {
            warn!(command = name, "push: writer closed; dropping outbound command");
            return;
        }
        debug!(command = name, "push: queued outbound command");
    }
}

impl CommandSink for ConnectionManager {
    fn emit(&self, command: OutboundCommand) {
        ConnectionManager::emit(self, command);
    }
}

fn dispatch(handlers: &Mutex<HandlerMap>, text: &str) {
    let event = match decode_inbound(text) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!("push: ignoring unrecognized event");
            return;
        }
        Err(err) => {
            warn!("push: invalid server event: {err}");
            return;
        }
    };

    let mut guard = lock(handlers);
    let Some(registered) = guard.get_mut(&event.kind()) else {
        debug!(event = event.kind().name(), "push: no handler registered");
        return;
    };
    for handler in registered.iter_mut() {
        handler(&event);
    }
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
