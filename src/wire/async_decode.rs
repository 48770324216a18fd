//! Message decoding from an async byte stream (tokio).
//!
//! Same framing rules and errors as [`Decoder`](super::Decoder); used by the
//! server to read consecutive messages from one connection.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use bytes::Bytes;

use super::decode::{check_segment_len, parse_header, SEGMENT_PREALLOC};
use super::{DecodeError, DecodeLimits, DecodeResult, HEADER_TERMINATOR};

/// Streaming decoder over an async reader.
pub struct AsyncDecoder<R> {
    reader: BufReader<R>,
    limits: DecodeLimits,
}

impl<R: AsyncRead + Unpin> AsyncDecoder<R> {
    /// Create a decoder with default limits.
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, DecodeLimits::default())
    }

    /// Create a decoder with custom limits.
    pub fn with_limits(reader: R, limits: DecodeLimits) -> Self {
        Self {
            reader: BufReader::new(reader),
            limits,
        }
    }

    /// Wait until input is available; `true` means the stream ended cleanly
    /// on a message boundary.
    ///
    /// Does not consume anything.
    pub async fn is_exhausted(&mut self) -> std::io::Result<bool> {
        Ok(self.reader.fill_buf().await?.is_empty())
    }

    /// Decode the next message on the stream.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`] for each failure mode.
    pub async fn decode(&mut self) -> Result<DecodeResult, DecodeError> {
        let mut raw_header = Vec::new();
        (&mut self.reader)
            .take(self.limits.max_header_len as u64)
            .read_until(HEADER_TERMINATOR, &mut raw_header)
            .await
            .map_err(DecodeError::ReadHeader)?;

        let at_eof = raw_header.last() != Some(&HEADER_TERMINATOR)
            && self.is_exhausted().await.map_err(DecodeError::ReadHeader)?;

        let (encoding, details_len, params_len) =
            parse_header(&raw_header, at_eof, &self.limits)?;

        let raw_details = read_segment(&mut self.reader, details_len)
            .await
            .map_err(DecodeError::ReadDetails)?;
        let raw_params = read_segment(&mut self.reader, params_len)
            .await
            .map_err(DecodeError::ReadParams)?;

        Ok(DecodeResult {
            encoding,
            raw_details,
            raw_params,
        })
    }

    /// Unwrap the decoder, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

async fn read_segment<R: AsyncRead + Unpin>(reader: R, len: u64) -> std::io::Result<Bytes> {
    let mut buf = Vec::with_capacity(len.min(SEGMENT_PREALLOC) as usize);
    let read = reader.take(len).read_to_end(&mut buf).await?;
    check_segment_len(read, len)?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Encoding;
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn test_async_decode_valid_message() {
        let input: &[u8] = br#"1,17,19:{"service":"abc"}{"message":"hello"}"#;
        let mut decoder = AsyncDecoder::new(input);

        let decoded = decoder.decode().await.unwrap();
        assert_eq!(decoded.encoding, Encoding::Json);
        assert_eq!(&decoded.raw_details[..], br#"{"service":"abc"}"#);
        assert_eq!(&decoded.raw_params[..], br#"{"message":"hello"}"#);
        assert!(decoder.is_exhausted().await.unwrap());
    }

    #[tokio::test]
    async fn test_async_decode_errors_match_sync() {
        let cases: [(&[u8], &str); 5] = [
            (b"", "unable to read info header"),
            (b"1,d,3:", "'d' is not an int in info header"),
            (b"2:", "encoding version '2' not implemented"),
            (
                b"1,4,5,6:",
                "requires exactly three info header parts \
                 (version, details length, params length) got '[1, 4, 5, 6]'",
            ),
            (b"1,6,5:null", "unable to read details"),
        ];

        for (input, expected) in cases {
            let err = AsyncDecoder::new(input).decode().await.unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_async_decode_fragmented_input() {
        let (mut client, server) = duplex(64);
        let mut decoder = AsyncDecoder::new(server);

        let writer = tokio::spawn(async move {
            for chunk in [&b"1,2"[..], b",3:", b"{", b"}[1", b"]"] {
                client.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let decoded = decoder.decode().await.unwrap();
        assert_eq!(&decoded.raw_details[..], b"{}");
        assert_eq!(&decoded.raw_params[..], b"[1]");

        drop(writer.await.unwrap());
        assert!(decoder.is_exhausted().await.unwrap());
    }

    #[tokio::test]
    async fn test_async_decode_stream_ends_at_header_limit() {
        let limits = DecodeLimits {
            max_header_len: 4,
            ..DecodeLimits::default()
        };

        let mut decoder = AsyncDecoder::with_limits(&b"1,10"[..], limits);
        let err = decoder.decode().await.unwrap_err();
        assert!(matches!(err, DecodeError::ReadHeader(_)));

        let mut decoder = AsyncDecoder::with_limits(&b"1,10,"[..], limits);
        let err = decoder.decode().await.unwrap_err();
        assert!(matches!(err, DecodeError::HeaderTooLong { limit: 4 }));
    }

    #[tokio::test]
    async fn test_async_decode_consecutive_messages() {
        let input: &[u8] = b"1,2,1:{}11,2,1:{}2";
        let mut decoder = AsyncDecoder::new(input);

        assert_eq!(&decoder.decode().await.unwrap().raw_params[..], b"1");
        assert!(!decoder.is_exhausted().await.unwrap());
        assert_eq!(&decoder.decode().await.unwrap().raw_params[..], b"2");
        assert!(decoder.is_exhausted().await.unwrap());
    }
}
