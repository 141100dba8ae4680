//! Span-producing decorator for memcached clients.
//!
//! [`InstrumentedClient`] wraps any [`MemcachedCommands`] implementation and
//! records one `memcached.command` span around every command it forwards.
//! The wrapper is itself a [`MemcachedCommands`], so it drops into existing
//! code unchanged, and unwrapping with [`InstrumentedClient::into_inner`]
//! stops tracing without disturbing the client.

use std::collections::HashMap;

use bytes::Bytes;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{Span, SpanKind, Status, Tracer, TracerProvider};
use opentelemetry::KeyValue;

use crate::attributes;
use crate::client::{MemcachedCommands, ServerAddress};
use crate::command::Command;

/// Instrumentation scope name reported on every span.
pub const INSTRUMENTATION_NAME: &str = env!("CARGO_PKG_NAME");
/// Instrumentation scope version reported on every span.
pub const INSTRUMENTATION_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name shared by every command span.
pub const SPAN_NAME: &str = "memcached.command";

/// A memcached client wrapper that records one span per command.
///
/// Each span is named [`SPAN_NAME`], has kind `INTERNAL` and carries the
/// rendered command statement plus the connection attributes of the wrapped
/// client. Command results and errors pass through untouched; a failed
/// command additionally records the error on its span and marks the span
/// status as error.
///
/// Wrapping an already-instrumented client is detected at construction via
/// [`MemcachedCommands::is_instrumented`] and turns the outer wrapper into a
/// plain passthrough, so stacking wrappers still yields exactly one span per
/// command.
pub struct InstrumentedClient<C> {
    inner: C,
    tracer: BoxedTracer,
    passthrough: bool,
}

impl<C: MemcachedCommands> InstrumentedClient<C> {
    /// Wrap `inner`, acquiring a tracer from the globally registered
    /// tracer provider.
    pub fn new(inner: C) -> Self {
        let tracer = global::tracer_provider().versioned_tracer(
            INSTRUMENTATION_NAME,
            Some(INSTRUMENTATION_VERSION),
            None::<&'static str>,
            None,
        );
        Self::from_tracer(inner, tracer)
    }

    /// Wrap `inner`, acquiring a tracer from `provider` instead of the
    /// global one.
    pub fn with_tracer_provider<P>(inner: C, provider: &P) -> Self
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        let tracer = provider.versioned_tracer(
            INSTRUMENTATION_NAME,
            Some(INSTRUMENTATION_VERSION),
            None::<&'static str>,
            None,
        );
        Self::from_tracer(inner, BoxedTracer::new(Box::new(tracer)))
    }

    fn from_tracer(inner: C, tracer: BoxedTracer) -> Self {
        let passthrough = inner.is_instrumented();
        if passthrough {
            tracing::debug!("client is already instrumented, wrapper will not record spans");
        }
        InstrumentedClient { inner, tracer, passthrough }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Mutable access to the wrapped client, bypassing instrumentation.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Unwrap, returning the client as it was before instrumentation.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn traced<R>(
        &mut self,
        command: Command,
        keys: &[&[u8]],
        op: impl FnOnce(&mut C) -> Result<R, C::Error>,
    ) -> Result<R, C::Error> {
        if self.passthrough {
            return op(&mut self.inner);
        }

        let mut span = self
            .tracer
            .span_builder(SPAN_NAME)
            .with_kind(SpanKind::Internal)
            .start(&self.tracer);
        span.set_attribute(KeyValue::new(attributes::SERVICE, INSTRUMENTATION_NAME));
        span.set_attribute(KeyValue::new(
            attributes::DB_STATEMENT,
            attributes::command_statement(command, keys.iter().copied()),
        ));
        span.set_attributes(attributes::connection_attributes(
            self.inner.server_address().as_ref(),
        ));

        let result = op(&mut self.inner);
        if let Err(error) = &result {
            span.record_error(error);
            span.set_status(Status::error(error.to_string()));
        }
        span.end();

        result
    }
}

impl<C: MemcachedCommands> MemcachedCommands for InstrumentedClient<C> {
    type Error = C::Error;

    fn server_address(&self) -> Option<ServerAddress> {
        self.inner.server_address()
    }

    // The wrapper is what makes a client instrumented.
    fn is_instrumented(&self) -> bool {
        true
    }

    fn set(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Set, &[key.as_bytes()], |c| c.set(key, value, expire))
    }

    fn set_many(
        &mut self,
        values: &[(&str, &[u8])],
        expire: u32,
    ) -> Result<Vec<String>, Self::Error> {
        let key_bytes: Vec<&[u8]> = values.iter().map(|(key, _)| key.as_bytes()).collect();
        self.traced(Command::SetMany, &key_bytes, |c| c.set_many(values, expire))
    }

    fn set_multi(
        &mut self,
        values: &[(&str, &[u8])],
        expire: u32,
    ) -> Result<Vec<String>, Self::Error> {
        let key_bytes: Vec<&[u8]> = values.iter().map(|(key, _)| key.as_bytes()).collect();
        self.traced(Command::SetMulti, &key_bytes, |c| c.set_multi(values, expire))
    }

    fn add(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Add, &[key.as_bytes()], |c| c.add(key, value, expire))
    }

    fn replace(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Replace, &[key.as_bytes()], |c| c.replace(key, value, expire))
    }

    fn append(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Append, &[key.as_bytes()], |c| c.append(key, value, expire))
    }

    fn prepend(&mut self, key: &str, value: &[u8], expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Prepend, &[key.as_bytes()], |c| c.prepend(key, value, expire))
    }

    fn cas(
        &mut self,
        key: &str,
        value: &[u8],
        cas: u64,
        expire: u32,
    ) -> Result<Option<bool>, Self::Error> {
        self.traced(Command::Cas, &[key.as_bytes()], |c| c.cas(key, value, cas, expire))
    }

    fn get(&mut self, key: &str) -> Result<Option<Bytes>, Self::Error> {
        self.traced(Command::Get, &[key.as_bytes()], |c| c.get(key))
    }

    fn get_many(&mut self, keys: &[&str]) -> Result<HashMap<String, Bytes>, Self::Error> {
        let key_bytes: Vec<&[u8]> = keys.iter().map(|key| key.as_bytes()).collect();
        self.traced(Command::GetMany, &key_bytes, |c| c.get_many(keys))
    }

    fn get_multi(&mut self, keys: &[&str]) -> Result<HashMap<String, Bytes>, Self::Error> {
        let key_bytes: Vec<&[u8]> = keys.iter().map(|key| key.as_bytes()).collect();
        self.traced(Command::GetMulti, &key_bytes, |c| c.get_multi(keys))
    }

    fn gets(&mut self, key: &str) -> Result<Option<(Bytes, u64)>, Self::Error> {
        self.traced(Command::Gets, &[key.as_bytes()], |c| c.gets(key))
    }

    fn gets_many(
        &mut self,
        keys: &[&str],
    ) -> Result<HashMap<String, (Bytes, u64)>, Self::Error> {
        let key_bytes: Vec<&[u8]> = keys.iter().map(|key| key.as_bytes()).collect();
        self.traced(Command::GetsMany, &key_bytes, |c| c.gets_many(keys))
    }

    fn delete(&mut self, key: &str) -> Result<bool, Self::Error> {
        self.traced(Command::Delete, &[key.as_bytes()], |c| c.delete(key))
    }

    fn delete_many(&mut self, keys: &[&str]) -> Result<bool, Self::Error> {
        let key_bytes: Vec<&[u8]> = keys.iter().map(|key| key.as_bytes()).collect();
        self.traced(Command::DeleteMany, &key_bytes, |c| c.delete_many(keys))
    }

    fn incr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error> {
        self.traced(Command::Incr, &[key.as_bytes()], |c| c.incr(key, delta))
    }

    fn decr(&mut self, key: &str, delta: u64) -> Result<Option<u64>, Self::Error> {
        self.traced(Command::Decr, &[key.as_bytes()], |c| c.decr(key, delta))
    }

    fn touch(&mut self, key: &str, expire: u32) -> Result<bool, Self::Error> {
        self.traced(Command::Touch, &[key.as_bytes()], |c| c.touch(key, expire))
    }

    fn stats(&mut self, args: &[&str]) -> Result<HashMap<String, String>, Self::Error> {
        let arg_bytes: Vec<&[u8]> = args.iter().map(|arg| arg.as_bytes()).collect();
        self.traced(Command::Stats, &arg_bytes, |c| c.stats(args))
    }

    fn version(&mut self) -> Result<String, Self::Error> {
        self.traced(Command::Version, &[], |c| c.version())
    }

    fn flush_all(&mut self, delay: u32) -> Result<bool, Self::Error> {
        self.traced(Command::FlushAll, &[], |c| c.flush_all(delay))
    }

    fn quit(&mut self) -> Result<(), Self::Error> {
        self.traced(Command::Quit, &[], |c| c.quit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryClient;

    #[test]
    fn test_wrapper_reports_instrumented() {
        let client = InstrumentedClient::new(InMemoryClient::new());
        assert!(client.is_instrumented());
        assert!(!client.passthrough);
    }

    #[test]
    fn test_double_wrap_turns_outer_into_passthrough() {
        let inner = InstrumentedClient::new(InMemoryClient::new());
        let outer = InstrumentedClient::new(inner);
        assert!(outer.passthrough);
        assert!(!outer.inner.passthrough);
    }

    #[test]
    fn test_into_inner_returns_untouched_client() {
        let mut raw = InMemoryClient::new();
        raw.set("key", b"value", 0).unwrap();

        let wrapped = InstrumentedClient::new(raw);
        let mut raw = wrapped.into_inner();
        assert_eq!(raw.get("key").unwrap(), Some(bytes::Bytes::from_static(b"value")));
    }

    #[test]
    fn test_inner_mut_bypasses_instrumentation() {
        let mut wrapped = InstrumentedClient::new(InMemoryClient::new());
        wrapped.inner_mut().set("key", b"value", 0).unwrap();
        assert_eq!(wrapped.inner().len(), 1);
    }
}
