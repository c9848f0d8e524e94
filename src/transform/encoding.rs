//! Content-Encoding aware body transcoding.

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors raised while transcoding a body.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The body is not a valid stream for its declared encoding.
    #[error("failed to decode {encoding} body: {source}")]
    Decode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Re-compressing the transformed body failed.
    #[error("failed to encode {encoding} body: {source}")]
    Encode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The encoding is not one this proxy can transform.
    #[error("unsupported content encoding `{0}`")]
    Unsupported(String),
}

/// Compression scheme declared by a `Content-Encoding` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Unsupported(String),
}

impl ContentEncoding {
    /// Detect the encoding from a header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(header::CONTENT_ENCODING) {
            None => Self::Identity,
            Some(value) => match value.to_str() {
                Ok(tag) => Self::from_tag(tag),
                Err(_) => Self::Unsupported(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            },
        }
    }

    /// Parse a single encoding tag.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "" | "identity" => Self::Identity,
            "gzip" | "x-gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            _ => Self::Unsupported(tag.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Fully decompress `body`.
    pub fn decode(&self, body: Bytes) -> Result<Bytes, TranscodeError> {
        let decode_err = |source| TranscodeError::Decode {
            encoding: self.name(),
            source,
        };

        let mut out = Vec::with_capacity(body.len().saturating_mul(4));
        match self {
            Self::Identity => return Ok(body),
            Self::Gzip => GzDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(decode_err)?,
            Self::Deflate => ZlibDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(decode_err)?,
            Self::Unsupported(tag) => return Err(TranscodeError::Unsupported(tag.clone())),
        };
        Ok(Bytes::from(out))
    }

    /// Compress `body` with this scheme.
    pub fn encode(&self, body: Bytes) -> Result<Bytes, TranscodeError> {
        let encode_err = |source| TranscodeError::Encode {
            encoding: self.name(),
            source,
        };

        let out = match self {
            Self::Identity => return Ok(body),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&body).map_err(encode_err)?;
                encoder.finish().map_err(encode_err)?
            }
            Self::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&body).map_err(encode_err)?;
                encoder.finish().map_err(encode_err)?
            }
            Self::Unsupported(tag) => return Err(TranscodeError::Unsupported(tag.clone())),
        };
        Ok(Bytes::from(out))
    }
}
