//! Minimal IRC line framing.
//!
//! This sits at the edge of the bridge engine, not in its core: just
//! enough encode/decode to drive registration, JOIN, and PRIVMSG, not a
//! conformance-grade parser.

/// A parsed inbound line: `[:prefix] COMMAND param0 param1 ... :trailing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub command: String,
    pub params: Vec<String>,
}

impl Line {
    pub fn parse(raw: &str) -> Option<Line> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        if raw.is_empty() {
            return None;
        }
        let mut rest = raw;
        if rest.starts_with(':') {
            rest = rest.split_once(' ')?.1;
        }
        let (head, trailing) = match rest.split_once(" :") {
            Some((h, t)) => (h, Some(t)),
            None => (rest, None),
        };
        let mut parts: Vec<String> = head.split(' ').filter(|s| !s.is_empty()).map(str::to_owned).collect();
        if parts.is_empty() {
            return None;
        }
        let command = parts.remove(0).to_ascii_uppercase();
        if let Some(t) = trailing {
            parts.push(t.to_owned());
        }
        Some(Line {
            command,
            params: parts,
        })
    }
}

/// Format a server-to-client message with a `nick!user@host` prefix and a
/// trailing parameter, e.g. a `PRIVMSG` delivery.
pub fn format_prefixed(prefix_nick: &str, prefix_user: &str, prefix_host: &str, command: &str, params: &[&str], trailing: &str) -> String {
    let mut line = format!(":{prefix_nick}!{prefix_user}@{prefix_host} {command}");
    for p in params {
        line.push(' ');
        line.push_str(p);
    }
    line.push_str(" :");
    line.push_str(trailing);
    line
}

/// Format a numeric or plain server notice (no user prefix).
pub fn format_server(server_name: &str, command: &str, params: &[&str], trailing: Option<&str>) -> String {
    let mut line = format!(":{server_name} {command}");
    for p in params {
        line.push(' ');
        line.push_str(p);
    }
    if let Some(t) = trailing {
        line.push_str(" :");
        line.push_str(t);
    }
    line
}
