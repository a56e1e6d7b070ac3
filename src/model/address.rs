//! Email address parsing (RFC 5322 §3.4).
//!
//! Deliberately lenient: captured test mail contains plenty of addresses a
//! strict grammar would reject, and the envelope only needs the bare
//! `user@domain` part anyway.

/// A parsed email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Optional display name (`"Juan García"` in `Juan García <juan@example.com>`).
    pub name: Option<String>,
    /// The bare address (`user@domain`).
    pub email: String,
}

impl Address {
    /// Parse a single address from a header value fragment.
    ///
    /// Accepted forms: `user@domain`, `<user@domain>`,
    /// `Display Name <user@domain>`, `"Quoted, Name" <user@domain>`.
    ///
    /// Returns `None` for empty input or input with no recognizable address.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        // "Display Name <address>" or bare "<address>"
        if let Some(open) = trimmed.rfind('<') {
            if let Some(close) = trimmed.rfind('>') {
                if close > open {
                    let email = trimmed[open + 1..close].trim();
                    if email.is_empty() {
                        return None;
                    }
                    let name = strip_quotes(trimmed[..open].trim());
                    return Some(Self {
                        name: (!name.is_empty()).then_some(name),
                        email: email.to_string(),
                    });
                }
            }
        }

        if trimmed.contains('@') {
            return Some(Self {
                name: None,
                email: trimmed.to_string(),
            });
        }

        None
    }

    /// Parse a comma-separated address list, preserving order and duplicates.
    ///
    /// Commas inside double quotes or angle brackets do not split:
    /// `"Last, First" <a@b.com>, other@c.com` yields two addresses.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut result = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    result.extend(Self::parse(&current));
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
        result.extend(Self::parse(&current));

        result
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// Strip one pair of surrounding double quotes.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_address() {
        let addr = Address::parse("user@example.com").unwrap();
        assert_eq!(addr.email, "user@example.com");
        assert_eq!(addr.name, None);
    }

    #[test]
    fn parse_angle_address() {
        let addr = Address::parse("<user@example.com>").unwrap();
        assert_eq!(addr.email, "user@example.com");
        assert_eq!(addr.name, None);
    }

    #[test]
    fn parse_name_and_address() {
        let addr = Address::parse("User One <user1@example.com>").unwrap();
        assert_eq!(addr.email, "user1@example.com");
        assert_eq!(addr.name.as_deref(), Some("User One"));
    }

    #[test]
    fn parse_quoted_name_with_comma() {
        let addr = Address::parse("\"Last, First\" <user@example.com>").unwrap();
        assert_eq!(addr.email, "user@example.com");
        assert_eq!(addr.name.as_deref(), Some("Last, First"));
    }

    #[test]
    fn parse_empty_is_none() {
        assert!(Address::parse("").is_none());
        assert!(Address::parse("   ").is_none());
        assert!(Address::parse("undisclosed-recipients:;").is_none());
    }

    #[test]
    fn parse_list_order_and_duplicates() {
        let list = Address::parse_list("a@x.com, b@x.com, a@x.com");
        let emails: Vec<&str> = list.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, ["a@x.com", "b@x.com", "a@x.com"]);
    }

    #[test]
    fn parse_list_quoted_comma() {
        let list = Address::parse_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Last, First"));
        assert_eq!(list[1].email, "other@c.com");
    }

    #[test]
    fn display_roundtrip() {
        let addr = Address::parse("Alice <alice@example.com>").unwrap();
        assert_eq!(addr.to_string(), "Alice <alice@example.com>");
        let bare = Address::parse("alice@example.com").unwrap();
        assert_eq!(bare.to_string(), "alice@example.com");
    }
}
