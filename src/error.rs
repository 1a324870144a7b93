//! Crate-wide error types

/// Errors that can occur while decoding a posting list from its byte
/// representation.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A Golomb-coded bitstream ran past the end of the supplied buffer.
    #[error("invalid golomb code: read past end of buffer")]
    InvalidCode,

    /// The `docs_count` carried alongside the bytes does not match the
    /// number of entries the decoder actually produced.
    #[error("postings list decode error: stored {stored} decoded {decoded}")]
    LengthMismatch {
        /// `docs_count` as supplied by the caller (out-of-band).
        stored: u32,
        /// Number of entries actually decoded from the bytes.
        decoded: u32,
    },
}

/// Errors surfaced by a [`crate::store::PostingStore`] implementation.
///
/// The store is an external collaborator (§1); this core does not know or
/// care what backs it, so the error is a boxed, opaque cause plus a
/// human-readable message.
#[derive(Debug, thiserror::Error)]
#[error("store error: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StoreError {
    /// Construct a store error with no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Construct a store error wrapping an underlying cause.
    pub fn from_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors that can occur while flushing an [`crate::fragment::IndexFragment`]
/// entry to the store.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    /// The persisted postings for this token failed to decode.
    #[error("decode error while fetching persisted postings: {0}")]
    Decode(#[from] DecodeError),

    /// The store contract itself failed (fetch or update).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persisted posting list and the in-memory posting list share a
    /// `document_id`; merging is undefined in that case (§4.4, §9).
    #[error("duplicate document_id {0} across merge source and destination")]
    DuplicateDocument(u32),
}
