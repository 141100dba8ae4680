//! Client-side contract for memcached protocol clients.
//!
//! [`MemcachedCommands`] is the seam this crate instruments: any client that
//! implements it can be wrapped by
//! [`InstrumentedClient`](crate::InstrumentedClient) without changing its
//! observable behavior. Method names and shapes follow the common text
//! protocol client surface, so adapting an existing client is mostly
//! delegation.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;

/// The server endpoint a client is configured against.
///
/// Reported on spans as `net.peer.name` / `net.peer.port` /
/// `net.transport`. Clients that do not track their endpoint (pools,
/// mocks) return `None` from [`MemcachedCommands::server_address`] and the
/// peer attributes are simply omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddress {
    /// TCP endpoint.
    Tcp {
        /// Hostname or IP literal, exactly as configured.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Unix domain socket endpoint.
    Unix {
        /// Socket path.
        path: PathBuf,
    },
}

impl ServerAddress {
    /// Convenience constructor for a TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        ServerAddress::Tcp { host: host.into(), port }
    }

    /// Convenience constructor for a unix socket endpoint.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        ServerAddress::Unix { path: path.into() }
    }
}

/// The memcached client command surface.
///
/// One method per protocol command, plus the `set_multi` / `get_multi`
/// aliases some client libraries expose. Implementations should delegate
/// each alias to its canonical form unless the underlying client
/// distinguishes them.
///
/// All methods take `&mut self`: clients own a connection and the protocol
/// is strictly request/response.
pub trait MemcachedCommands {
    /// Error type surfaced by the underlying client.
    type Error: std::error::Error;

    /// The endpoint this client talks to, if known.
    fn server_address(&self) -> Option<ServerAddress> {
        None
    }

    /// Whether this client already records a span per command.
    ///
    /// [`InstrumentedClient`](crate::InstrumentedClient) reports `true` and
    /// checks this flag at construction so stacking wrappers never yields
    /// more than one span per command. Plain clients keep the default.
    fn is_instrumented(&self) -> bool {
        false
    }

    /// Store `value` under `key`. Returns `true` once the server accepts it.
    fn set(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error>;

    /// Store several key/value pairs. Returns the keys that failed to store
    /// (empty on full success).
    fn set_many(&mut self, values: &[(&str, &[u8])], expire: u32)
        -> Result<Vec<String>, Self::Error>;

    /// Alias for [`set_many`](Self::set_many).
    fn set_multi(&mut self, values: &[(&str, &[u8])], expire: u32)
        -> Result<Vec<String>, Self::Error>
    {
        self.set_many(values, expire)
    }

    /// Store `value` only if `key` is not present. Returns `false` if the
    /// key already existed.
    fn add(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error>;

    /// Store `value` only if `key` is present. Returns `false` if the key
    /// was missing.
    fn replace(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error>;

    /// Append `value` to the existing value of `key`.
    fn append(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error>;

    /// Prepend `value` to the existing value of `key`.
    fn prepend(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error>;

    /// Store `value` only if the entry's cas token still equals `cas`.
    ///
    /// Returns `None` if the key was missing, `Some(false)` if the token
    /// did not match, `Some(true)` on success.
    fn cas(
        &mut self,
        key: &str,
        value: &[u8],
        cas: u64,
        expire: u32,
    ) -> Result<Option<bool>, Self::Error>;

    /// Fetch the value of `key`, or `None` on a miss.
    fn get(&mut self, key: &str) -> Result<Option<Bytes>, Self::Error>;

    /// Fetch several keys at once. Misses are absent from the map.
    fn get_many(&mut self, keys: &[&str]) -> Result<HashMap<String, Bytes>, Self::Error>;

    /// Alias for [`get_many`](Self::get_many).
    fn get_multi(&mut self, keys: &[&str]) -> Result<HashMap<String, Bytes>, Self::Error> {
        self.get_many(keys)
    }

    /// Fetch the value of `key` together with its cas token.
    fn gets(&mut self, key: &str) -> Result<Option<(Bytes, u64)>, Self::Error>;

    /// Fetch several keys together with their cas tokens.
    fn gets_many(
        &mut self,
        keys: &[&str],
    ) -> Result<HashMap<String, (Bytes, u64)>, Self::Error>;

    /// Remove `key`. Returns `false` if it was not present.
    fn delete(&mut self, key: &str) -> Result<bool, Self::Error>;

    /// Remove several keys. Returns `true` once the deletions are issued.
    fn delete_many(&mut self, keys: &[&str]) -> Result<bool, Self::Error>;

    /// Add `delta` to the numeric value of `key`. `None` if the key is
    /// missing.
    fn incr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error>;

    /// Subtract `delta` from the numeric value of `key`, flooring at zero.
    /// `None` if the key is missing.
    fn decr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error>;

    /// Reset the expiration of `key` without touching its value.
    fn touch(&mut self, key: &str, expire: u32) -> Result<bool, Self::Error>;

    /// Fetch server statistics, optionally scoped by `args`
    /// (e.g. `["slabs"]`).
    fn stats(&mut self, args: &[&str]) -> Result<HashMap<String, String>, Self::Error>;

    /// Fetch the server version string.
    fn version(&mut self) -> Result<String, Self::Error>;

    /// Invalidate every entry after `delay` seconds.
    fn flush_all(&mut self, delay: u32) -> Result<bool, Self::Error>;

    /// Close the connection. The client is unusable afterwards.
    fn quit(&mut self) -> Result<(), Self::Error>;
}
