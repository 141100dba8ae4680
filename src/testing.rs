//! Test doubles for exercising instrumentation without a live server.
//!
//! [`InMemoryClient`] is a small in-process model of a memcached server:
//! enough command semantics to observe hits, misses, cas token churn and
//! error propagation, plus a single-shot fault hook for failure-path tests.
//! Expirations are stored but never enforced.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::client::{MemcachedCommands, ServerAddress};

const NON_NUMERIC: &str = "cannot increment or decrement non-numeric value";
const VERSION: &str = "1.6.21";

/// Failure classes a memcached client can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemcacheError {
    /// `CLIENT_ERROR` response from the server.
    #[error("client error: {0}")]
    Client(String),
    /// `SERVER_ERROR` response from the server.
    #[error("server error: {0}")]
    Server(String),
    /// Transport-level failure.
    #[error("connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    cas: u64,
    expire: u32,
}

#[derive(Debug, Default)]
struct Counters {
    cmd_get: u64,
    cmd_set: u64,
    get_hits: u64,
    get_misses: u64,
}

/// In-memory memcached model implementing [`MemcachedCommands`].
///
/// Cas tokens are handed out from a per-client counter, so two clients
/// driven through the same command sequence produce identical tokens.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    entries: HashMap<String, Entry>,
    server: Option<ServerAddress>,
    next_cas: u64,
    counters: Counters,
    pending_fault: Option<MemcacheError>,
}

impl InMemoryClient {
    /// Client with no endpoint configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client reporting a TCP endpoint.
    pub fn with_address(host: impl Into<String>, port: u16) -> Self {
        InMemoryClient { server: Some(ServerAddress::tcp(host, port)), ..Self::default() }
    }

    /// Client reporting a unix socket endpoint.
    pub fn with_unix_socket(path: impl Into<PathBuf>) -> Self {
        InMemoryClient { server: Some(ServerAddress::unix(path)), ..Self::default() }
    }

    /// Fail the next command, whichever it is, with `error`.
    pub fn fail_next(&mut self, error: MemcacheError) {
        self.pending_fault = Some(error);
    }

    /// Expiration currently recorded for `key`, for test assertions.
    pub fn expire_of(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(|entry| entry.expire)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take_fault(&mut self) -> Result<(), MemcacheError> {
        match self.pending_fault.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store(&mut self, key: &str, value: &[u8], expire: u32) {
        self.next_cas += 1;
        self.entries.insert(
            key.to_string(),
            Entry { value: Bytes::copy_from_slice(value), cas: self.next_cas, expire },
        );
    }

    fn record_lookup(&mut self, hit: bool) {
        self.counters.cmd_get += 1;
        if hit {
            self.counters.get_hits += 1;
        } else {
            self.counters.get_misses += 1;
        }
    }
}

fn parse_numeric(value: &Bytes) -> Result<u64, MemcacheError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| MemcacheError::Client(NON_NUMERIC.to_string()))
}

impl MemcachedCommands for InMemoryClient {
    type Error = MemcacheError;

    fn server_address(&self) -> Option<ServerAddress> {
        self.server.clone()
    }

    fn set(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        self.counters.cmd_set += 1;
        self.store(key, value, expire);
        Ok(true)
    }

    fn set_many(
        &mut self,
        values: &[(&str, &[u8])],
        expire: u32,
    ) -> Result<Vec<String>, Self::Error> {
        self.take_fault()?;
        for (key, value) in values.iter().copied() {
            self.counters.cmd_set += 1;
            self.store(key, value, expire);
        }
        Ok(Vec::new())
    }

    fn add(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        if self.entries.contains_key(key) {
            return Ok(false);
        }
        self.counters.cmd_set += 1;
        self.store(key, value, expire);
        Ok(true)
    }

    fn replace(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        self.counters.cmd_set += 1;
        self.store(key, value, expire);
        Ok(true)
    }

    fn append(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        let next_cas = self.next_cas + 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                let mut combined = BytesMut::with_capacity(entry.value.len() + value.len());
                combined.extend_from_slice(&entry.value);
                combined.extend_from_slice(value);
                entry.value = combined.freeze();
                entry.cas = next_cas;
                entry.expire = expire;
                self.next_cas = next_cas;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn prepend(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        let next_cas = self.next_cas + 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                let mut combined = BytesMut::with_capacity(entry.value.len() + value.len());
                combined.extend_from_slice(value);
                combined.extend_from_slice(&entry.value);
                entry.value = combined.freeze();
                entry.cas = next_cas;
                entry.expire = expire;
                self.next_cas = next_cas;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn cas(
        &mut self,
        key: &str,
        value: &[u8],
        cas: u64,
        expire: u32,
    ) -> Result<Option<bool>, Self::Error> {
        self.take_fault()?;
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) if entry.cas != cas => Ok(Some(false)),
            Some(_) => {
                self.counters.cmd_set += 1;
                self.store(key, value, expire);
                Ok(Some(true))
            }
        }
    }

    fn get(&mut self, key: &str) -> Result<Option<Bytes>, Self::Error> {
        self.take_fault()?;
        let value = self.entries.get(key).map(|entry| entry.value.clone());
        self.record_lookup(value.is_some());
        Ok(value)
    }

    fn get_many(&mut self, keys: &[&str]) -> Result<HashMap<String, Bytes>, Self::Error> {
        self.take_fault()?;
        let mut found = HashMap::new();
        for key in keys {
            let value = self.entries.get(*key).map(|entry| entry.value.clone());
            self.record_lookup(value.is_some());
            if let Some(value) = value {
                found.insert((*key).to_string(), value);
            }
        }
        Ok(found)
    }

    fn gets(&mut self, key: &str) -> Result<Option<(Bytes, u64)>, Self::Error> {
        self.take_fault()?;
        let value = self
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.cas));
        self.record_lookup(value.is_some());
        Ok(value)
    }

    fn gets_many(
        &mut self,
        keys: &[&str],
    ) -> Result<HashMap<String, (Bytes, u64)>, Self::Error> {
        self.take_fault()?;
        let mut found = HashMap::new();
        for key in keys {
            let value = self
                .entries
                .get(*key)
                .map(|entry| (entry.value.clone(), entry.cas));
            self.record_lookup(value.is_some());
            if let Some(value) = value {
                found.insert((*key).to_string(), value);
            }
        }
        Ok(found)
    }

    fn delete(&mut self, key: &str) -> Result<bool, Self::Error> {
        self.take_fault()?;
        Ok(self.entries.remove(key).is_some())
    }

    fn delete_many(&mut self, keys: &[&str]) -> Result<bool, Self::Error> {
        self.take_fault()?;
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(true)
    }

    fn incr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error> {
        self.take_fault()?;
        let next_cas = self.next_cas + 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                let current = parse_numeric(&entry.value)?;
                let updated = current.wrapping_add(delta);
                entry.value = Bytes::from(updated.to_string());
                entry.cas = next_cas;
                self.next_cas = next_cas;
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    fn decr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error> {
        self.take_fault()?;
        let next_cas = self.next_cas + 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                let current = parse_numeric(&entry.value)?;
                let updated = current.saturating_sub(delta);
                entry.value = Bytes::from(updated.to_string());
                entry.cas = next_cas;
                self.next_cas = next_cas;
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    fn touch(&mut self, key: &str, expire: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expire = expire;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Scoped stats ("slabs", "items") are not modeled, every query
    // returns the counter set.
    fn stats(&mut self, _args: &[&str]) -> Result<HashMap<String, String>, Self::Error> {
        self.take_fault()?;
        let mut stats = HashMap::new();
        stats.insert("cmd_get".to_string(), self.counters.cmd_get.to_string());
        stats.insert("cmd_set".to_string(), self.counters.cmd_set.to_string());
        stats.insert("get_hits".to_string(), self.counters.get_hits.to_string());
        stats.insert("get_misses".to_string(), self.counters.get_misses.to_string());
        stats.insert("curr_items".to_string(), self.entries.len().to_string());
        Ok(stats)
    }

    fn version(&mut self) -> Result<String, Self::Error> {
        self.take_fault()?;
        Ok(VERSION.to_string())
    }

    fn flush_all(&mut self, _delay: u32) -> Result<bool, Self::Error> {
        self.take_fault()?;
        self.entries.clear();
        Ok(true)
    }

    fn quit(&mut self) -> Result<(), Self::Error> {
        self.take_fault()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_respects_existing_entry() {
        let mut client = InMemoryClient::new();
        assert!(client.add("k", b"first", 0).unwrap());
        assert!(!client.add("k", b"second", 0).unwrap());
        assert_eq!(client.get("k").unwrap(), Some(Bytes::from_static(b"first")));
    }

    #[test]
    fn test_replace_requires_existing_entry() {
        let mut client = InMemoryClient::new();
        assert!(!client.replace("k", b"v", 0).unwrap());
        client.set("k", b"v", 0).unwrap();
        assert!(client.replace("k", b"v2", 0).unwrap());
        assert_eq!(client.get("k").unwrap(), Some(Bytes::from_static(b"v2")));
    }

    #[test]
    fn test_append_and_prepend_splice_value() {
        let mut client = InMemoryClient::new();
        client.set("k", b"b", 0).unwrap();
        assert!(client.append("k", b"c", 0).unwrap());
        assert!(client.prepend("k", b"a", 0).unwrap());
        assert_eq!(client.get("k").unwrap(), Some(Bytes::from_static(b"abc")));
        assert!(!client.append("missing", b"x", 0).unwrap());
    }

    #[test]
    fn test_cas_token_flow() {
        let mut client = InMemoryClient::new();
        client.set("k", b"v1", 0).unwrap();
        let (_, token) = client.gets("k").unwrap().unwrap();

        // Another write invalidates the fetched token.
        client.set("k", b"v2", 0).unwrap();
        assert_eq!(client.cas("k", b"v3", token, 0).unwrap(), Some(false));

        let (_, fresh) = client.gets("k").unwrap().unwrap();
        assert_eq!(client.cas("k", b"v3", fresh, 0).unwrap(), Some(true));
        assert_eq!(client.cas("missing", b"v", 1, 0).unwrap(), None);
        assert_eq!(client.get("k").unwrap(), Some(Bytes::from_static(b"v3")));
    }

    #[test]
    fn test_incr_decr_arithmetic() {
        let mut client = InMemoryClient::new();
        client.set("n", b"10", 0).unwrap();
        assert_eq!(client.incr("n", 5).unwrap(), Some(15));
        assert_eq!(client.decr("n", 20).unwrap(), Some(0));
        assert_eq!(client.incr("missing", 1).unwrap(), None);

        client.set("s", b"text", 0).unwrap();
        assert_eq!(
            client.incr("s", 1),
            Err(MemcacheError::Client(NON_NUMERIC.to_string()))
        );
    }

    #[test]
    fn test_touch_updates_expiration() {
        let mut client = InMemoryClient::new();
        client.set("k", b"v", 60).unwrap();
        assert_eq!(client.expire_of("k"), Some(60));

        assert!(client.touch("k", 300).unwrap());
        assert_eq!(client.expire_of("k"), Some(300));
        assert!(!client.touch("missing", 300).unwrap());
    }

    #[test]
    fn test_fail_next_is_single_shot() {
        let mut client = InMemoryClient::new();
        client.fail_next(MemcacheError::Connection("connection reset".to_string()));
        assert!(client.get("k").is_err());
        assert!(client.get("k").is_ok());
    }

    #[test]
    fn test_stats_reflect_traffic() {
        let mut client = InMemoryClient::new();
        client.set("k", b"v", 0).unwrap();
        client.get("k").unwrap();
        client.get("missing").unwrap();

        let stats = client.stats(&[]).unwrap();
        assert_eq!(stats["cmd_set"], "1");
        assert_eq!(stats["cmd_get"], "2");
        assert_eq!(stats["get_hits"], "1");
        assert_eq!(stats["get_misses"], "1");
        assert_eq!(stats["curr_items"], "1");
    }

    #[test]
    fn test_flush_all_clears_entries() {
        let mut client = InMemoryClient::new();
        client.set("a", b"1", 0).unwrap();
        client.set("b", b"2", 0).unwrap();
        assert_eq!(client.len(), 2);
        assert!(client.flush_all(0).unwrap());
        assert!(client.is_empty());
    }

    #[test]
    fn test_get_many_omits_misses() {
        let mut client = InMemoryClient::new();
        client.set("a", b"1", 0).unwrap();
        let found = client.get_many(&["a", "missing"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], Bytes::from_static(b"1"));
    }
}
