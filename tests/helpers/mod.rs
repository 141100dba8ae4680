//! Shared helpers for instrumentation integration tests.
//!
//! Provides an in-memory span exporter wired to a synchronous tracer
//! provider, attribute lookup helpers, and a driver that runs one call of
//! every command through a client.

use std::sync::Arc;

use futures::future::BoxFuture;
use opentelemetry::trace::TraceResult;
use opentelemetry::{Context, Value};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::trace::{Span, SpanProcessor, TracerProvider};
use otel_instrumentation_memcache::MemcachedCommands;
use parking_lot::Mutex;

/// Exporter that captures every ended span for later assertions.
#[derive(Debug, Clone, Default)]
pub struct CapturingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl CapturingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the spans exported so far.
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn span_count(&self) -> usize {
        self.spans.lock().len()
    }
}

impl SpanExporter for CapturingExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().extend(batch);
        Box::pin(futures::future::ready(Ok(())))
    }
}

/// Processor that hands ended spans to the exporter on the calling thread.
///
/// The SDK's `SimpleSpanProcessor` ships spans to a background thread, so a
/// test reading the exporter right after a command would race the export.
#[derive(Debug)]
struct CapturingProcessor {
    exporter: Mutex<CapturingExporter>,
}

impl SpanProcessor for CapturingProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) {
        let _ = futures::executor::block_on(self.exporter.lock().export(vec![span]));
    }

    fn force_flush(&self) -> TraceResult<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> TraceResult<()> {
        Ok(())
    }
}

/// Tracer provider that exports synchronously into a fresh
/// [`CapturingExporter`], so spans are visible as soon as they end.
pub fn test_provider() -> (TracerProvider, CapturingExporter) {
    let exporter = CapturingExporter::new();
    let provider = TracerProvider::builder()
        .with_span_processor(CapturingProcessor { exporter: Mutex::new(exporter.clone()) })
        .build();
    (provider, exporter)
}

/// String attribute of a span, if present with that type.
pub fn attr_str(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .and_then(|kv| match &kv.value {
            Value::String(value) => Some(value.as_str().to_string()),
            _ => None,
        })
}

/// Integer attribute of a span, if present with that type.
pub fn attr_i64(span: &SpanData, key: &str) -> Option<i64> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .and_then(|kv| match kv.value {
            Value::I64(value) => Some(value),
            _ => None,
        })
}

/// Whether the span carries an attribute under `key`, of any type.
pub fn has_attr(span: &SpanData, key: &str) -> bool {
    span.attributes.iter().any(|kv| kv.key.as_str() == key)
}

/// Drive one call of every command through `client`.
///
/// Keys are chosen so every call succeeds on an empty in-memory client:
/// the stale cas token yields `Ok(Some(false))`, never an error.
pub fn run_all_commands<C: MemcachedCommands>(client: &mut C) -> Result<(), C::Error> {
    client.set("k", b"v", 0)?;
    client.set_many(&[("n", b"1".as_slice()), ("m", b"2".as_slice())], 0)?;
    client.add("fresh", b"x", 0)?;
    client.replace("k", b"v2", 0)?;
    client.append("k", b"!", 0)?;
    client.prepend("k", b">", 0)?;
    client.cas("k", b"v3", 0, 0)?;
    client.get("k")?;
    client.get_many(&["k", "n"])?;
    client.gets("k")?;
    client.gets_many(&["k"])?;
    client.delete("m")?;
    client.delete_many(&["missing"])?;
    client.incr("n", 1)?;
    client.decr("n", 1)?;
    client.touch("k", 60)?;
    client.stats(&[])?;
    client.version()?;
    client.flush_all(0)?;
    client.set_multi(&[("a", b"1".as_slice())], 0)?;
    client.get_multi(&["a"])?;
    client.quit()?;
    Ok(())
}
