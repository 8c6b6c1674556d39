//! Lazily produced response bodies.

use std::fmt;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::JaxRxError;

/// A byte stream produced on demand by a backend.
///
/// The transport polls it chunk by chunk while writing the response, so a
/// backend may return arbitrarily large results without buffering them.
pub struct StreamingOutput {
    inner: BoxStream<'static, Result<Bytes, JaxRxError>>,
}

impl StreamingOutput {
    /// Wraps an arbitrary chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, JaxRxError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Yields each chunk of the iterator as it is polled.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator + Send + 'static,
        I::IntoIter: Send + 'static,
        I::Item: Into<Bytes>,
    {
        Self::from_stream(stream::iter(chunks.into_iter().map(|c| Ok(c.into()))))
    }

    /// A single-chunk output.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::from_stream(stream::once(async move { Ok(bytes) }))
    }

    /// An output with no body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Consumes the output, returning the underlying stream.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, JaxRxError>> {
        self.inner
    }

    /// Drains the whole stream into memory. Intended for tests and small
    /// outputs only.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream.
    pub async fn collect(self) -> Result<Vec<u8>, JaxRxError> {
        let mut out = Vec::new();
        let mut stream = self.inner;
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl fmt::Debug for StreamingOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingOutput").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn chunks_are_concatenated() {
        let out = StreamingOutput::from_chunks(vec!["<a>", "b", "</a>"]);
        assert_eq!(out.collect().await.unwrap(), b"<a>b</a>");
    }

    #[tokio::test]
    async fn empty_output_has_no_bytes() {
        assert!(StreamingOutput::empty().collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunks_are_produced_only_when_polled() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let out = StreamingOutput::from_stream(stream::iter(0..3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(i.to_string()))
        }));
        assert_eq!(produced.load(Ordering::SeqCst), 0);

        assert_eq!(out.collect().await.unwrap(), b"012");
        assert_eq!(produced.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn collect_stops_at_first_error() {
        let out = StreamingOutput::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(JaxRxError::bad_request("broken")),
        ]));
        let err = out.collect().await.unwrap_err();
        assert!(matches!(err, JaxRxError::BadRequest(m) if m == "broken"));
    }
}
