//! Gateway connection: hello, identify or resume, heartbeat, dispatch.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use super::DiscordSession;
use crate::platform::{Event, PlatformError, PlatformSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

const GATEWAY_URL: &str = "wss://gateway.discord.gg";
const GATEWAY_QUERY: &str = "?v=10&encoding=json";

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;
pub(super) const INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_DIRECT_MESSAGES | INTENT_MESSAGE_CONTENT;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RESUME: u8 = 6;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Raw gateway frame.
#[derive(Debug, Deserialize)]
struct Payload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// Resume bookkeeping carried across connections.
#[derive(Debug, Default)]
struct Resume {
    session_id: Option<String>,
    url: Option<String>,
    sequence: Option<u64>,
}

impl Resume {
    fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn url(&self) -> String {
        let base = match (&self.session_id, &self.url) {
            (Some(_), Some(url)) => url.as_str(),
            _ => GATEWAY_URL,
        };
        format!("{}/{}", base.trim_end_matches('/'), GATEWAY_QUERY)
    }
}

/// Why a connection ended.
#[derive(Debug)]
enum Exit {
    Shutdown,
    Reconnect,
    Fatal(String),
}

/// Close codes after which reconnecting cannot succeed.
fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

/// Close codes that invalidate the session.
fn invalidates_session(code: u16) -> bool {
    matches!(code, 4007 | 4009)
}

/// Keep a gateway connection alive until shutdown or a fatal close.
pub(super) async fn run(
    session: Arc<DiscordSession>,
    mut outgoing: mpsc::UnboundedReceiver<Value>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut resume = Resume::default();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let url = resume.url();
        debug!("Connecting to gateway at {}", url);

        let exit = match connect_async(&url).await {
            Ok((stream, _response)) => {
                backoff = INITIAL_BACKOFF;
                let (sink, source) = stream.split();
                session
                    .connection(sink, source, &mut resume, &mut outgoing, &mut shutdown)
                    .await
            }
            Err(e) => {
                warn!("Gateway connection failed: {}", e);
                Exit::Reconnect
            }
        };

        match exit {
            Exit::Shutdown => {
                info!("Gateway connection closed");
                break;
            }
            Exit::Fatal(reason) => {
                error!("Gateway closed permanently: {}", reason);
                break;
            }
            Exit::Reconnect => {
                info!("Reconnecting to gateway in {}s", backoff.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.changed() => break,
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

impl DiscordSession {
    async fn connection(
        self: &Arc<Self>,
        mut sink: WsSink,
        mut source: WsSource,
        resume: &mut Resume,
        outgoing: &mut mpsc::UnboundedReceiver<Value>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Exit {
        let interval = match read_hello(&mut source).await {
            Ok(interval) => interval,
            Err(e) => {
                warn!("Gateway handshake failed: {}", e);
                return Exit::Reconnect;
            }
        };

        let handshake = if resume.can_resume() {
            info!("Resuming gateway session");
            json!({
                "op": OP_RESUME,
                "d": {
                    "token": self.token,
                    "session_id": resume.session_id,
                    "seq": resume.sequence,
                }
            })
        } else {
            json!({
                "op": OP_IDENTIFY,
                "d": {
                    "token": self.token,
                    "intents": INTENTS,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": "componentbot",
                        "device": "componentbot",
                    }
                }
            })
        };
        if let Err(e) = send(&mut sink, &handshake).await {
            warn!("Failed to send gateway handshake: {}", e);
            return Exit::Reconnect;
        }

        let mut heartbeat = interval_at(Instant::now() + interval, interval);
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Exit::Shutdown;
                }

                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        warn!("Gateway heartbeat was not acknowledged, reconnecting");
                        return Exit::Reconnect;
                    }
                    if let Err(e) = send(&mut sink, &json!({"op": OP_HEARTBEAT, "d": resume.sequence})).await {
                        warn!("Failed to send heartbeat: {}", e);
                        return Exit::Reconnect;
                    }
                    awaiting_ack = true;
                }

                Some(payload) = outgoing.recv() => {
                    if let Err(e) = send(&mut sink, &payload).await {
                        warn!("Failed to send gateway payload: {}", e);
                    }
                }

                frame = source.next() => {
                    let text = match frame {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(frame))) => {
                            let code = frame.map(|f| u16::from(f.code)).unwrap_or_default();
                            info!("Gateway closed with code {}", code);
                            if is_fatal_close(code) {
                                return Exit::Fatal(format!("close code {code}"));
                            }
                            if invalidates_session(code) {
                                resume.clear();
                            }
                            return Exit::Reconnect;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("Gateway read error: {}", e);
                            return Exit::Reconnect;
                        }
                        None => {
                            info!("Gateway stream ended");
                            return Exit::Reconnect;
                        }
                    };

                    let payload: Payload = match serde_json::from_str(text.as_str()) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("Skipping malformed gateway frame: {}", e);
                            continue;
                        }
                    };

                    match payload.op {
                        OP_DISPATCH => {
                            if payload.s.is_some() {
                                resume.sequence = payload.s;
                            }
                            if let Some(name) = payload.t {
                                self.handle_dispatch(&name, payload.d, resume);
                            }
                        }
                        OP_HEARTBEAT => {
                            let _ = send(&mut sink, &json!({"op": OP_HEARTBEAT, "d": resume.sequence})).await;
                        }
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        OP_RECONNECT => {
                            info!("Gateway requested a reconnect");
                            return Exit::Reconnect;
                        }
                        OP_INVALID_SESSION => {
                            if !payload.d.as_bool().unwrap_or(false) {
                                resume.clear();
                            }
                            info!("Gateway session invalidated");
                            return Exit::Reconnect;
                        }
                        other => trace!("Ignoring gateway opcode {}", other),
                    }
                }
            }
        }
    }

    fn handle_dispatch(self: &Arc<Self>, name: &str, data: Value, resume: &mut Resume) {
        if name == "RESUMED" {
            info!("Gateway session resumed");
            return;
        }

        let event = match Event::from_dispatch(name, data) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to decode {} dispatch: {}", name, e);
                return;
            }
        };

        match &event {
            Event::Ready(ready) => {
                resume.session_id = Some(ready.session_id.clone());
                resume.url = ready.resume_gateway_url.clone();
                self.on_ready(ready);
            }
            Event::GuildCreate(guild) => {
                self.guilds.insert(guild.id.clone(), guild.name.clone());
            }
            Event::GuildUpdate(guild) => {
                self.guilds.insert(guild.id.clone(), guild.name.clone());
            }
            Event::GuildDelete(guild) if !guild.unavailable => {
                self.guilds.remove(&guild.id);
            }
            _ => {}
        }

        let session: Arc<dyn PlatformSession> = self.clone();
        self.bus.dispatch(session, event);
    }
}

async fn read_hello(source: &mut WsSource) -> Result<Duration, PlatformError> {
    while let Some(frame) = source.next().await {
        let frame = frame.map_err(|e| PlatformError::Gateway(e.to_string()))?;
        let WsMessage::Text(text) = frame else {
            continue;
        };

        let payload: Payload = serde_json::from_str(text.as_str())?;
        if payload.op == OP_HELLO {
            let interval = payload.d["heartbeat_interval"].as_u64().unwrap_or(41_250);
            return Ok(Duration::from_millis(interval));
        }
    }

    Err(PlatformError::Gateway("connection closed before hello".to_string()))
}

async fn send(sink: &mut WsSink, payload: &Value) -> Result<(), PlatformError> {
    sink.send(WsMessage::text(payload.to_string()))
        .await
        .map_err(|e| PlatformError::Gateway(e.to_string()))
}
