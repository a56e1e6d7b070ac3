//! Inbound SMTP receiver.
//!
//! The wire protocol itself is delegated to `mailin-embedded`, which
//! dispatches one session per connection; [`Session`] adapts its handler
//! callbacks onto [`Receiver::handle`]. The receiver holds no state across
//! calls, so concurrent sessions only share the store.

use std::net::IpAddr;
use std::sync::Arc;

use humansize::{format_size, BINARY};
use mailin_embedded::response::OK;
use mailin_embedded::{Handler, Response, Server, SslConfig};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::store::{MessageId, MessageStore, StoreError};

/// Banner name announced in the SMTP greeting.
pub const BANNER: &str = "postsink";

/// Accepts one SMTP session's envelope and raw body, parses the message
/// for logging only, and persists the raw bytes.
#[derive(Clone)]
pub struct Receiver {
    store: Arc<dyn MessageStore>,
}

impl Receiver {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Handle one completed session.
    ///
    /// The raw bytes are handed to the store unconditionally: a parse
    /// failure only degrades the debug log line, never persistence. Store
    /// failures are classified, logged, and propagated so the caller can
    /// reject the session at the protocol level.
    pub fn handle(
        &self,
        origin: Option<IpAddr>,
        from: &str,
        to: &[String],
        raw: &[u8],
    ) -> Result<MessageId, StoreError> {
        let parsed = mail_parser::MessageParser::default().parse(raw);
        if parsed.is_none() {
            debug!(origin = ?origin, from, "message did not parse, storing raw bytes anyway");
        }
        // A parsed message may simply carry no Subject header.
        let subject = parsed
            .as_ref()
            .and_then(|m| m.subject().map(str::to_string));

        let id = match self.store.store(raw) {
            Ok(id) => id,
            Err(e @ StoreError::SizeLimitExceeded { .. }) => {
                warn!("error storing message: {e}");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "error storing message");
                return Err(e);
            }
        };

        debug!(
            id = %id,
            from,
            to = to.first().map(String::as_str).unwrap_or(""),
            subject = subject.as_deref().unwrap_or(""),
            size = %format_size(raw.len(), BINARY),
            "received mail"
        );
        Ok(id)
    }
}

/// Map a store failure onto an SMTP reply.
///
/// Size-limit rejections are permanent (552); anything else is treated as
/// a transient local failure (451) so a well-behaved client may retry.
fn store_error_response(err: &StoreError) -> (u16, &'static str) {
    match err {
        StoreError::SizeLimitExceeded { .. } => (552, "message exceeds maximum message size"),
        StoreError::Io { .. } => (451, "message store failed, try again later"),
    }
}

/// Per-connection protocol state: envelope plus accumulated DATA bytes.
#[derive(Clone)]
pub struct Session {
    receiver: Receiver,
    peer: Option<IpAddr>,
    from: String,
    to: Vec<String>,
    data: Vec<u8>,
}

impl Session {
    pub fn new(receiver: Receiver) -> Self {
        Self {
            receiver,
            peer: None,
            from: String::new(),
            to: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl Handler for Session {
    fn helo(&mut self, ip: IpAddr, _domain: &str) -> Response {
        self.peer = Some(ip);
        OK
    }

    fn data_start(&mut self, _domain: &str, from: &str, _is8bit: bool, to: &[String]) -> Response {
        self.from = from.to_string();
        self.to = to.to_vec();
        self.data.clear();
        OK
    }

    fn data(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.data.extend_from_slice(buf);
        Ok(())
    }

    fn data_end(&mut self) -> Response {
        let raw = std::mem::take(&mut self.data);
        match self.receiver.handle(self.peer, &self.from, &self.to, &raw) {
            Ok(_) => OK,
            Err(e) => {
                let (code, message) = store_error_response(&e);
                Response::custom(code, message.to_string())
            }
        }
    }
}

/// Start the SMTP listener and serve sessions until the process exits.
///
/// Plaintext only; the banner is the fixed product identifier.
pub fn serve(config: &Config, store: Arc<dyn MessageStore>) -> anyhow::Result<()> {
    let session = Session::new(Receiver::new(store));
    let mut server = Server::new(session);
    server
        .with_name(BANNER)
        .with_ssl(SslConfig::None)
        .map_err(|e| anyhow::anyhow!("ssl setup: {e}"))?
        .with_addr(&config.smtp.listen)
        .map_err(|e| anyhow::anyhow!("bind {}: {e}", config.smtp.listen))?;

    info!(listen = %config.smtp.listen, "starting SMTP listener");
    server
        .serve()
        .map_err(|e| anyhow::anyhow!("smtp listener: {e}"))
}
