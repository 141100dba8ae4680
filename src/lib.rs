//! OpenTelemetry tracing instrumentation for memcached protocol clients.
//!
//! Wraps any client implementing [`MemcachedCommands`] so that every cache
//! command records one `memcached.command` span: kind `INTERNAL`, the
//! rendered statement under `db.statement` (keys only, never values) and
//! the client's endpoint under the `net.peer.*` attributes. Results and
//! errors pass through the wrapper unchanged.
//!
//! Spans go to the globally registered tracer provider by default;
//! [`InstrumentedClient::with_tracer_provider`] pins a specific one.
//! Calling [`InstrumentedClient::into_inner`] returns the bare client and
//! stops tracing.
//!
//! # Usage
//!
//! ```
//! use otel_instrumentation_memcache::testing::InMemoryClient;
//! use otel_instrumentation_memcache::{InstrumentedClient, MemcachedCommands};
//!
//! // Any client implementing `MemcachedCommands` works here.
//! let client = InMemoryClient::with_address("localhost", 11211);
//! let mut client = InstrumentedClient::new(client);
//!
//! client.set("some_key", b"some_value", 0)?;
//! let value = client.get("some_key")?;
//! assert_eq!(value.as_deref(), Some(b"some_value".as_ref()));
//! # Ok::<(), otel_instrumentation_memcache::testing::MemcacheError>(())
//! ```

pub mod attributes;
mod client;
mod command;
mod instrument;
pub mod testing;

pub use client::{MemcachedCommands, ServerAddress};
pub use command::Command;
pub use instrument::{
    InstrumentedClient, INSTRUMENTATION_NAME, INSTRUMENTATION_VERSION, SPAN_NAME,
};
