//! Administrator command parsing.
//!
//! Commands start with `/` and form a closed set. Parsing is pure and total:
//! every input maps to exactly one [`Command`] variant.

use std::num::IntErrorKind;

use relaydesk_types::client::ClientId;

/// Default number of messages shown by `/history`.
pub const DEFAULT_HISTORY_COUNT: u32 = 20;

/// Largest count `/history` will honour.
pub const MAX_HISTORY_COUNT: u32 = 100;

/// A parsed administrator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/reply <client_id> <text>`
    Reply { client_id: ClientId, text: String },
    /// `/clients`
    ListClients,
    /// `/history <client_id> [count]`
    FetchHistory { client_id: ClientId, count: u32 },
    /// Not a relay command (free text, or an unknown slash command).
    Unrecognized,
    /// A relay keyword with a broken argument list.
    Malformed { reason: String },
}

/// Parses administrator text into commands.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    default_count: u32,
    max_count: u32,
}

impl CommandRouter {
    pub fn new(default_count: u32, max_count: u32) -> Self {
        let max_count = max_count.max(1);
        Self {
            default_count: default_count.clamp(1, max_count),
            max_count,
        }
    }

    pub fn parse(&self, input: &str) -> Command {
        let (head, rest) = split_token(input);
        if !head.starts_with('/') {
            return Command::Unrecognized;
        }

        // Group chats address commands as `/cmd@botname`.
        let keyword = head.split('@').next().unwrap_or(head).to_lowercase();

        match keyword.as_str() {
            "/reply" => parse_reply(rest),
            "/clients" => {
                if rest.trim().is_empty() {
                    Command::ListClients
                } else {
                    malformed("/clients takes no arguments")
                }
            }
            "/history" => self.parse_history(rest),
            _ => Command::Unrecognized,
        }
    }

    fn parse_history(&self, rest: &str) -> Command {
        let args: Vec<&str> = rest.split_whitespace().collect();

        let client_id = match args.first() {
            Some(token) => match parse_client_id(token) {
                Ok(id) => id,
                Err(reason) => return Command::Malformed { reason },
            },
            None => return malformed("usage: /history <client_id> [count]"),
        };

        if args.len() > 2 {
            return malformed("usage: /history <client_id> [count]");
        }

        let count = match args.get(1) {
            None => self.default_count,
            Some(token) => match token.parse::<i64>() {
                Ok(n) if n > 0 => n.min(i64::from(self.max_count)) as u32,
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => self.max_count,
                _ => return malformed(format!("count must be a positive integer, got '{token}'")),
            },
        };

        Command::FetchHistory { client_id, count }
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_COUNT, MAX_HISTORY_COUNT)
    }
}

fn parse_reply(rest: &str) -> Command {
    let (id_token, body) = split_token(rest);
    if id_token.is_empty() {
        return malformed("usage: /reply <client_id> <text>");
    }

    let client_id = match parse_client_id(id_token) {
        Ok(id) => id,
        Err(reason) => return Command::Malformed { reason },
    };

    let text = body.trim();
    if text.is_empty() {
        return malformed("reply text is empty");
    }

    Command::Reply {
        client_id,
        text: text.to_string(),
    }
}

fn parse_client_id(token: &str) -> Result<ClientId, String> {
    token
        .parse::<ClientId>()
        .map_err(|_| format!("'{token}' is not a valid client id"))
}

fn malformed(reason: impl Into<String>) -> Command {
    Command::Malformed {
        reason: reason.into(),
    }
}

/// Split off the first whitespace-delimited token, returning it and the
/// untouched remainder.
fn split_token(input: &str) -> (&str, &str) {
    let s = input.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

/// Help text shown for unknown or malformed commands.
pub fn usage() -> &'static str {
    "Available commands:\n\
     /clients - list clients by most recent contact\n\
     /history <client_id> [count] - show the latest messages with a client\n\
     /reply <client_id> <text> - send a message to a client"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Command {
        CommandRouter::default().parse(input)
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            parse("/reply 42 Thanks"),
            Command::Reply {
                client_id: ClientId(42),
                text: "Thanks".to_string()
            }
        );
    }

    #[test]
    fn test_parse_reply_keeps_inner_whitespace() {
        assert_eq!(
            parse("/reply 42   Thanks,\n  see you  "),
            Command::Reply {
                client_id: ClientId(42),
                text: "Thanks,\n  see you".to_string()
            }
        );
    }

    #[test]
    fn test_parse_reply_empty_text_is_malformed() {
        assert!(matches!(parse("/reply 42"), Command::Malformed { .. }));
        assert!(matches!(parse("/reply 42    "), Command::Malformed { .. }));
        assert!(matches!(parse("/reply"), Command::Malformed { .. }));
    }

    #[test]
    fn test_parse_reply_bad_id() {
        match parse("/reply bob hello") {
            Command::Malformed { reason } => assert!(reason.contains("'bob'")),
            other => panic!("expected Malformed, got {other:?}"),
        }
        assert!(matches!(
            parse("/reply 99999999999999999999 hi"),
            Command::Malformed { .. }
        ));
    }

    #[test]
    fn test_parse_negative_group_id() {
        assert_eq!(
            parse("/reply -1001 hi"),
            Command::Reply {
                client_id: ClientId(-1001),
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_parse_clients() {
        assert_eq!(parse("/clients"), Command::ListClients);
        assert_eq!(parse("  /CLIENTS  "), Command::ListClients);
        assert_eq!(parse("/clients@relay_bot"), Command::ListClients);
        assert!(matches!(parse("/clients now"), Command::Malformed { .. }));
    }

    #[test]
    fn test_parse_history_default_count() {
        assert_eq!(
            parse("/history 42"),
            Command::FetchHistory {
                client_id: ClientId(42),
                count: DEFAULT_HISTORY_COUNT
            }
        );
    }

    #[test]
    fn test_parse_history_with_count() {
        assert_eq!(
            parse("/history 42 1"),
            Command::FetchHistory {
                client_id: ClientId(42),
                count: 1
            }
        );
    }

    #[test]
    fn test_parse_history_clamps_count() {
        assert_eq!(
            parse("/history 42 5000"),
            Command::FetchHistory {
                client_id: ClientId(42),
                count: MAX_HISTORY_COUNT
            }
        );
    }

    #[test]
    fn test_parse_history_rejects_bad_count() {
        assert!(matches!(parse("/history 42 0"), Command::Malformed { .. }));
        assert!(matches!(parse("/history 42 -3"), Command::Malformed { .. }));
        assert!(matches!(parse("/history 42 lots"), Command::Malformed { .. }));
        assert!(matches!(parse("/history 42 1 2"), Command::Malformed { .. }));
        assert!(matches!(parse("/history"), Command::Malformed { .. }));
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(parse("hello there"), Command::Unrecognized);
        assert_eq!(parse("/start"), Command::Unrecognized);
        assert_eq!(parse("/replyall 1 x"), Command::Unrecognized);
        assert_eq!(parse(""), Command::Unrecognized);
        assert_eq!(parse("   "), Command::Unrecognized);
    }

    #[test]
    fn test_parse_is_total() {
        let inputs = [
            "/",
            "//",
            "/@",
            "/reply\u{00a0}1 x",
            "/history \u{1F600}",
            "/reply 1 \u{1F600}",
            "\u{0000}",
            "/history 1 18446744073709551616",
            "/reply -",
            "@/clients",
        ];
        for input in inputs {
            // Must not panic; any variant is fine.
            let _ = parse(input);
        }
    }

    #[test]
    fn test_custom_router_defaults() {
        let router = CommandRouter::new(5, 10);
        assert_eq!(
            router.parse("/history 1"),
            Command::FetchHistory {
                client_id: ClientId(1),
                count: 5
            }
        );
        assert_eq!(
            router.parse("/history 1 50"),
            Command::FetchHistory {
                client_id: ClientId(1),
                count: 10
            }
        );
    }

    #[test]
    fn test_history_count_overflow_clamps_to_max() {
        assert_eq!(
            parse("/history 42 99999999999999999999"),
            Command::FetchHistory {
                client_id: ClientId(42),
                count: MAX_HISTORY_COUNT
            }
        );
        // Negative overflow is still not a positive count.
        assert!(matches!(
            parse("/history 42 -99999999999999999999"),
            Command::Malformed { .. }
        ));
    }
}
