//! matterircd: an IRC gateway onto a team-chat service.
//!
//! [`bridge`] is the core: session establishment, directory caching,
//! namespace materialization, event translation, and outbound command
//! handling. [`irc`] and [`conn`] are the thin IRC-facing collaborators
//! (line framing, namespace registry, per-connection dispatch) that the
//! bridge design treats as external.

pub mod bridge;
pub mod conn;
pub mod irc;
