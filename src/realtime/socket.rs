//! # WebSocket Endpoint
//!
//! Each client connected to `/ws` is served by one [`ChatSocket`] actor. The actor owns
//! the socket; the rest of the server reaches it through an [`ActorTransport`], which
//! pushes text frames into the actor's mailbox.
//!
//! ## Lifecycle:
//! 1. **Started**: the connection is registered and greeted with `welcome`
//! 2. **Text frames**: handed to the [`MessageRouter`]; server-side translations run on
//!    a spawned task
//! 3. **Heartbeat**: a ping every 30 seconds; a client silent for 60 seconds is dropped
//! 4. **Stopped**: room-leave cleanup, then removal from the registry

use super::protocol::{ServerMessage, INVALID_FORMAT};
use super::registry::{SendError, Transport};
use super::router::{Dispatch, MessageRouter};
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// True once a client has been silent for longer than `timeout`.
fn heartbeat_expired(last_heartbeat: Instant, now: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(last_heartbeat) > timeout
}

/// A text frame to write to the socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// [`Transport`] backed by a socket actor's mailbox.
pub struct ActorTransport {
    recipient: Recipient<Outbound>,
}

impl ActorTransport {
    pub fn new(recipient: Recipient<Outbound>) -> Self {
        Self { recipient }
    }
}

impl Transport for ActorTransport {
    fn is_open(&self) -> bool {
        self.recipient.connected()
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.recipient
            .try_send(Outbound(text.to_string()))
            .map_err(|e| match e {
                actix::prelude::SendError::Full(_) => SendError::Full,
                actix::prelude::SendError::Closed(_) => SendError::Closed,
            })
    }
}

/// WebSocket actor for one room participant.
pub struct ChatSocket {
    /// Registry id, assigned once the actor has started
    connection_id: Option<String>,
    router: Arc<MessageRouter>,
    last_heartbeat: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl ChatSocket {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self::with_heartbeat(router, HEARTBEAT_INTERVAL, CLIENT_TIMEOUT)
    }

    pub fn with_heartbeat(router: Arc<MessageRouter>, interval: Duration, timeout: Duration) -> Self {
        Self {
            connection_id: None,
            router,
            last_heartbeat: Instant::now(),
            heartbeat_interval: interval,
            client_timeout: timeout,
        }
    }

    fn handle_text(&mut self, text: &str) {
        let Some(id) = self.connection_id.clone() else {
            warn!("Text frame before registration, dropping");
            return;
        };

        if let Dispatch::Translate(pending) = self.router.dispatch(&id, text) {
            let router = self.router.clone();
            debug!(connection_id = %id, "Spawning server-side translation");
            tokio::spawn(async move {
                router.complete_translation(pending).await;
            });
        }
    }

    fn send_direct(&self, ctx: &mut ws::WebsocketContext<Self>, message: &ServerMessage) {
        if let Ok(json) = serde_json::to_string(message) {
            ctx.text(json);
        }
    }
}

impl Actor for ChatSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let transport = ActorTransport::new(ctx.address().recipient());
        let id = self.router.connect(Arc::new(transport));
        info!(connection_id = %id, "WebSocket connection started");
        self.connection_id = Some(id);

        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if heartbeat_expired(act.last_heartbeat, Instant::now(), act.client_timeout) {
                warn!(connection_id = ?act.connection_id, "WebSocket heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(id) = self.connection_id.take() {
            self.router.disconnect(&id);
            info!(connection_id = %id, "WebSocket connection stopped");
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.handle_text(&text);
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.send_direct(ctx, &ServerMessage::error(INVALID_FORMAT));
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(connection_id = ?self.connection_id, reason = ?reason, "WebSocket closed by client");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(connection_id = ?self.connection_id, error = %err, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for ChatSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// WebSocket endpoint handler.
///
/// ## HTTP to WebSocket Upgrade:
/// Upgrades the request and hands the socket to a new [`ChatSocket`] actor.
pub async fn chat_socket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    debug!(peer = ?req.connection_info().peer_addr(), "WebSocket upgrade request");
    ws::start(ChatSocket::new(app_state.router.clone()), &req, stream)
}
