//! SMTP envelope resolution from parsed headers.
//!
//! The envelope (MAIL FROM / RCPT TO) is derived once per message and
//! consumed immediately by the relay; it is never mutated after creation.

use crate::error::{IngestError, Result};
use crate::parser::header::ParsedHeaders;

/// The SMTP-level sender and recipient list used for delivery,
/// as opposed to the message's header content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope-from address (bare `user@domain`).
    pub sender: String,
    /// Recipient addresses, at least one, duplicates preserved.
    pub recipients: Vec<String>,
}

impl Envelope {
    /// Resolve the envelope for one message.
    ///
    /// Recipients are the union of `To`, `Cc` and `Bcc` in that header
    /// order, exactly as listed (no dedup). The sender is the
    /// `Return-Path` (angle brackets stripped) when present and non-empty,
    /// otherwise the first `From` address, otherwise `default_sender`.
    ///
    /// `default_sender` is the run's sticky default: when unset and the
    /// message carries a `From` header, it is set from that first address
    /// and reused for the rest of the run (first message wins). Messages
    /// with no recipient headers are treated as blind-copied to the
    /// resolved sender.
    pub fn resolve(headers: &ParsedHeaders, default_sender: &mut Option<String>) -> Result<Self> {
        let mut recipients: Vec<String> = Vec::new();
        for name in ["To", "Cc", "Bcc"] {
            recipients.extend(headers.address_list(name).into_iter().map(|a| a.email));
        }

        let from = headers
            .address_list("From")
            .into_iter()
            .next()
            .map(|a| a.email);

        if default_sender.is_none() {
            default_sender.clone_from(&from);
        }

        let sender = headers
            .return_path()
            .map(str::to_string)
            .or(from)
            .or_else(|| default_sender.clone())
            .ok_or(IngestError::NoSenderResolvable)?;

        if recipients.is_empty() {
            recipients.push(sender.clone());
        }

        Ok(Self { sender, recipients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header;

    fn headers(raw: &[u8]) -> ParsedHeaders {
        header::parse(raw).unwrap()
    }

    #[test]
    fn recipients_in_header_order() {
        let h = headers(b"From: f@x.com\nTo: a@x.com\nCc: b@x.com\nBcc: c@x.com\n\nBody\n");
        let env = Envelope::resolve(&h, &mut None).unwrap();
        assert_eq!(env.recipients, ["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn duplicates_preserved() {
        let h = headers(b"From: f@x.com\nTo: a@x.com, a@x.com\nCc: a@x.com\n\nBody\n");
        let env = Envelope::resolve(&h, &mut None).unwrap();
        assert_eq!(env.recipients, ["a@x.com", "a@x.com", "a@x.com"]);
    }

    #[test]
    fn return_path_wins_over_from() {
        let h = headers(b"Return-Path: <r@x.com>\nFrom: f@x.com\nTo: a@x.com\n\nBody\n");
        let env = Envelope::resolve(&h, &mut None).unwrap();
        assert_eq!(env.sender, "r@x.com");
    }

    #[test]
    fn from_used_when_return_path_absent() {
        let h = headers(b"From: f@x.com\nTo: a@x.com\n\nBody\n");
        let env = Envelope::resolve(&h, &mut None).unwrap();
        assert_eq!(env.sender, "f@x.com");
    }

    #[test]
    fn no_recipients_falls_back_to_sender() {
        let h = headers(b"From: f@x.com\nSubject: bcc only\n\nBody\n");
        let env = Envelope::resolve(&h, &mut None).unwrap();
        assert_eq!(env.recipients, ["f@x.com"]);
    }

    #[test]
    fn sticky_default_is_first_wins() {
        let mut default = None;
        let first = headers(b"From: first@x.com\nTo: a@x.com\n\nBody\n");
        Envelope::resolve(&first, &mut default).unwrap();
        assert_eq!(default.as_deref(), Some("first@x.com"));

        let second = headers(b"From: second@x.com\nTo: a@x.com\n\nBody\n");
        Envelope::resolve(&second, &mut default).unwrap();
        assert_eq!(default.as_deref(), Some("first@x.com"));
    }

    #[test]
    fn configured_default_used_when_headers_empty() {
        let mut default = Some("fallback@x.com".to_string());
        let h = headers(b"Subject: no addresses at all\n\nBody\n");
        let env = Envelope::resolve(&h, &mut default).unwrap();
        assert_eq!(env.sender, "fallback@x.com");
        assert_eq!(env.recipients, ["fallback@x.com"]);
    }

    #[test]
    fn no_sender_resolvable() {
        let h = headers(b"Subject: nothing useful\n\nBody\n");
        let err = Envelope::resolve(&h, &mut None).unwrap_err();
        assert!(matches!(err, IngestError::NoSenderResolvable));
    }
}
