//! Response body draining.
//!
//! Draining consumes a body once, frame by frame, into one owned buffer.
//! The source cannot be read again afterwards: callers that still need to
//! send the response must hand the buffered copy onward with
//! [`ResponseBuffer::to_body`].

use bytes::{BufMut, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use http_body::Body;
use http_body_util::{BodyExt, Full};

/// A fully materialized response body.
///
/// # Example
///
/// ```
/// use covenant_middleware::ResponseBuffer;
/// use http_body_util::Full;
/// use bytes::Bytes;
///
/// # tokio_test::block_on(async {
/// let buffer = ResponseBuffer::drain(Full::new(Bytes::from_static(b"{\"id\":1}")))
///     .await
///     .unwrap();
/// assert_eq!(buffer.as_bytes(), &b"{\"id\":1}"[..]);
/// # });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBuffer {
    bytes: Bytes,
}

impl ResponseBuffer {
    /// Wraps bytes that are already in memory.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Drains an HTTP body into a buffer. Trailers are discarded.
    ///
    /// # Errors
    ///
    /// Returns the body's error if a frame fails; the bytes read so far are
    /// lost.
    pub async fn drain<B>(body: B) -> Result<Self, B::Error>
    where
        B: Body,
    {
        let mut buf = BytesMut::new();
        let mut body = std::pin::pin!(body);

        while let Some(frame) = body.as_mut().frame().await {
            if let Ok(data) = frame?.into_data() {
                buf.put(data);
            }
        }

        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Drains a stream of byte chunks into a buffer.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn drain_stream<S, E>(stream: S) -> Result<Self, E>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let mut buf = BytesMut::new();
        let mut stream = std::pin::pin!(stream);

        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }

        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Returns the buffered bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Consumes the buffer and returns the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Returns the body length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Builds a fresh body over the buffered bytes.
    #[must_use]
    pub fn to_body(&self) -> Full<Bytes> {
        Full::new(self.bytes.clone())
    }
}

impl From<Bytes> for ResponseBuffer {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{Empty, StreamBody};
    use http_body::Frame;
    use std::convert::Infallible;

    #[tokio::test]
    async fn test_drain_multi_frame_body() {
        let chunks: Vec<Result<Frame<Bytes>, Infallible>> = vec![
            Ok(Frame::data(Bytes::from_static(b"{\"na"))),
            Ok(Frame::data(Bytes::from_static(b"me\":"))),
            Ok(Frame::data(Bytes::from_static(b"\"Rex\"}"))),
        ];
        let body = StreamBody::new(stream::iter(chunks));

        let buffer = ResponseBuffer::drain(body).await.unwrap();
        assert_eq!(buffer.as_bytes(), &Bytes::from_static(b"{\"name\":\"Rex\"}"));
    }

    #[tokio::test]
    async fn test_drain_skips_trailers() {
        let mut trailers = http::HeaderMap::new();
        trailers.insert("x-checksum", http::HeaderValue::from_static("abc"));
        let chunks: Vec<Result<Frame<Bytes>, Infallible>> = vec![
            Ok(Frame::data(Bytes::from_static(b"ok"))),
            Ok(Frame::trailers(trailers)),
        ];

        let buffer = ResponseBuffer::drain(StreamBody::new(stream::iter(chunks)))
            .await
            .unwrap();
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test]
    async fn test_drain_empty_body() {
        let buffer = ResponseBuffer::drain(Empty::<Bytes>::new()).await.unwrap();
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_drain_propagates_frame_error() {
        let chunks: Vec<Result<Frame<Bytes>, &'static str>> = vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err("connection reset"),
        ];

        let err = ResponseBuffer::drain(StreamBody::new(stream::iter(chunks)))
            .await
            .unwrap_err();
        assert_eq!(err, "connection reset");
    }

    #[test]
    fn test_drain_stream_chunks() {
        let chunks: Vec<Result<Bytes, Infallible>> =
            vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"bc"))];

        let buffer = tokio_test::block_on(ResponseBuffer::drain_stream(stream::iter(chunks))).unwrap();
        assert_eq!(buffer.into_bytes(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn test_to_body_replays_bytes() {
        let buffer = ResponseBuffer::from_bytes("hello");
        let replayed = buffer.to_body().collect().await.unwrap().to_bytes();
        assert_eq!(replayed, Bytes::from_static(b"hello"));
        // the buffer itself is unaffected
        assert_eq!(buffer.len(), 5);
    }
}
