//! Outbound SMTP relay client.
//!
//! Plaintext delivery to a local/trusted test server: no authentication,
//! no TLS. This is a test-relay tool, not a general-purpose MTA.

use lettre::address::Envelope as SmtpEnvelope;
use lettre::{Address, SmtpTransport, Transport};
use thiserror::Error;

use crate::model::envelope::Envelope;

/// Failure to deliver one message. Never aborts a batch; the caller logs
/// the path and continues.
#[derive(Error, Debug)]
pub enum RelayError {
    /// An envelope address does not parse as an SMTP address.
    #[error("unusable envelope address '{addr}': {source}")]
    Address {
        addr: String,
        source: lettre::address::AddressError,
    },

    /// The SMTP conversation itself failed.
    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivery of one raw message to one envelope.
///
/// A trait so the ingestion walk can be exercised against a recording fake.
pub trait MailRelay {
    /// Relay `raw` using `envelope`, reporting success or failure.
    fn relay(&self, envelope: &Envelope, raw: &[u8]) -> Result<(), RelayError>;
}

/// [`MailRelay`] backed by a real SMTP connection.
pub struct SmtpRelay {
    transport: SmtpTransport,
}

impl SmtpRelay {
    /// Connect-on-demand relay to `addr` (`host:port`, port defaults to 25).
    pub fn new(addr: &str) -> Self {
        let (host, port) = split_host_port(addr);
        let mut builder = SmtpTransport::builder_dangerous(host);
        if let Some(port) = port {
            builder = builder.port(port);
        }
        Self {
            transport: builder.build(),
        }
    }
}

impl MailRelay for SmtpRelay {
    fn relay(&self, envelope: &Envelope, raw: &[u8]) -> Result<(), RelayError> {
        let sender = parse_address(&envelope.sender)?;
        let recipients = envelope
            .recipients
            .iter()
            .map(|r| parse_address(r))
            .collect::<Result<Vec<_>, _>>()?;

        // `resolve` guarantees at least one recipient, so `new` cannot
        // reject the envelope as empty.
        let smtp_envelope = SmtpEnvelope::new(Some(sender), recipients)
            .expect("envelope has at least one recipient");

        self.transport.send_raw(&smtp_envelope, raw)?;
        Ok(())
    }
}

fn parse_address(addr: &str) -> Result<Address, RelayError> {
    addr.parse::<Address>().map_err(|source| RelayError::Address {
        addr: addr.to_string(),
        source,
    })
}

/// Split `host:port`, tolerating a bare host.
fn split_host_port(addr: &str) -> (&str, Option<u16>) {
    match addr.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (addr, None),
        },
        None => (addr, None),
    }
}
