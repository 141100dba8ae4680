//! Span attribute extraction.
//!
//! Pure helpers that turn a command invocation and a client's endpoint
//! configuration into OpenTelemetry attributes. Extraction never fails:
//! anything that cannot be rendered (an unknown endpoint, a non-UTF-8 key)
//! is skipped and logged, and the remaining attributes are still produced.

use opentelemetry::KeyValue;

use crate::client::ServerAddress;
use crate::command::Command;

/// Database system attribute key.
pub const DB_TYPE: &str = "db.type";
/// Rendered command statement attribute key.
pub const DB_STATEMENT: &str = "db.statement";
/// Peer hostname or socket path attribute key.
pub const NET_PEER_NAME: &str = "net.peer.name";
/// Peer TCP port attribute key.
pub const NET_PEER_PORT: &str = "net.peer.port";
/// Transport attribute key.
pub const NET_TRANSPORT: &str = "net.transport";
/// Instrumentation name attribute key.
pub const SERVICE: &str = "service";

/// `db.type` value for every span this crate produces.
pub const DB_TYPE_MEMCACHED: &str = "memcached";
/// `net.transport` value for TCP endpoints.
pub const TRANSPORT_TCP: &str = "IP.TCP";
/// `net.transport` value for unix socket endpoints.
pub const TRANSPORT_UNIX: &str = "Unix";

/// Connection-level attributes for a client endpoint.
///
/// Always contains `db.type`. TCP endpoints add peer name, port and
/// transport; unix sockets add the socket path as peer name plus transport.
/// An unknown endpoint contributes nothing beyond `db.type`.
pub fn connection_attributes(address: Option<&ServerAddress>) -> Vec<KeyValue> {
    let mut attributes = vec![KeyValue::new(DB_TYPE, DB_TYPE_MEMCACHED)];
    match address {
        Some(ServerAddress::Tcp { host, port }) => {
            attributes.push(KeyValue::new(NET_PEER_NAME, host.clone()));
            attributes.push(KeyValue::new(NET_PEER_PORT, i64::from(*port)));
            attributes.push(KeyValue::new(NET_TRANSPORT, TRANSPORT_TCP));
        }
        Some(ServerAddress::Unix { path }) => {
            attributes.push(KeyValue::new(NET_PEER_NAME, path.display().to_string()));
            attributes.push(KeyValue::new(NET_TRANSPORT, TRANSPORT_UNIX));
        }
        None => {
            tracing::debug!("client endpoint unknown, omitting peer attributes");
        }
    }
    attributes
}

/// Join the UTF-8-renderable keys with single spaces.
///
/// Keys that are not valid UTF-8 are skipped with a warning; when nothing
/// renders, the result is empty.
pub fn query_string<'a>(keys: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut rendered = String::new();
    for key in keys {
        match std::str::from_utf8(key) {
            Ok(key) => {
                if !rendered.is_empty() {
                    rendered.push(' ');
                }
                rendered.push_str(key);
            }
            Err(_) => {
                tracing::warn!("skipping non-utf8 key in command statement");
            }
        }
    }
    rendered
}

/// Render the `db.statement` value for a command and its keys.
///
/// The statement is the command name followed by the rendered
/// [`query_string`], `"get user:1"` style, with no trailing space when no
/// key renders. Values are never part of the statement.
pub fn command_statement<'a>(
    command: Command,
    keys: impl IntoIterator<Item = &'a [u8]>,
) -> String {
    let rendered = query_string(keys);
    if rendered.is_empty() {
        command.as_str().to_string()
    } else {
        format!("{command} {rendered}")
    }
}
