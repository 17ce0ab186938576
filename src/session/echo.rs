//! Observability sinks for sent responses

/// Receives every response as it is sent, when echo is enabled.
///
/// Closures taking `(pattern_key, response)` implement this trait.
pub trait EchoSink: Send {
    /// Called once per response, before it is written.
    fn echo(&mut self, key: &str, response: &str);
}

/// Default sink: logs each response at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EchoSink for TracingSink {
    fn echo(&mut self, key: &str, response: &str) {
        tracing::info!(pattern = key, response, "sending response");
    }
}

impl<F> EchoSink for F
where
    F: FnMut(&str, &str) + Send,
{
    fn echo(&mut self, key: &str, response: &str) {
        self(key, response)
    }
}
