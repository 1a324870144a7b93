//! Store contract (§6.1): a narrow key/value surface the core reads and
//! writes postings through. The concrete backing store is an external
//! collaborator, out of scope (§1) — this module defines the trait and a
//! small in-memory implementation used by tests.

use rustc_hash::FxHashMap;
use parking_lot::RwLock;

use crate::error::StoreError;

/// Operations a persistent postings store must provide.
pub trait PostingStore {
    /// Fetch the persisted postings for `token_id`, if any, as
    /// `(docs_count, bytes)`. Returns `Ok(None)` when the token has no
    /// persisted postings yet.
    fn get_postings(&self, token_id: u32) -> Result<Option<(u32, Vec<u8>)>, StoreError>;

    /// Replace the persisted postings for `token_id`.
    fn update_postings(
        &self,
        token_id: u32,
        docs_count: u32,
        bytes: &[u8],
    ) -> Result<(), StoreError>;

    /// Resolve (assigning if new) the token id for `token_bytes`. When
    /// `document_id == 0` (query tokenization), also returns the
    /// authoritative corpus-wide `docs_count` for that token (§4.5, §4.4).
    fn get_token_id(&self, token_bytes: &[u8], document_id: u32) -> Result<(u32, u32), StoreError>;

    /// Look up the UTF-8 bytes of a previously assigned token id.
    fn get_token(&self, token_id: u32) -> Result<Vec<u8>, StoreError>;

    /// Total number of documents indexed so far.
    fn get_document_count(&self) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    postings: FxHashMap<u32, (u32, Vec<u8>)>,
    token_ids: FxHashMap<Vec<u8>, u32>,
    tokens: FxHashMap<u32, Vec<u8>>,
    token_docs_count: FxHashMap<u32, u32>,
    next_token_id: u32,
    document_count: u64,
}

/// In-memory reference implementation of [`PostingStore`], for tests and
/// small examples. Not part of the spec's external interface — a stand-in
/// for whatever production key/value surface a caller plugs in.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                next_token_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Record that `document_id` has been indexed, bumping the corpus
    /// document count used by `get_document_count` and Golomb `m` choice.
    /// Tests call this once per ingested document; a real store would
    /// track this as part of its own document table.
    pub fn note_document(&self, document_id: u32) {
        let mut inner = self.inner.write();
        inner.document_count = inner.document_count.max(document_id as u64);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostingStore for MemoryStore {
    fn get_postings(&self, token_id: u32) -> Result<Option<(u32, Vec<u8>)>, StoreError> {
        Ok(self.inner.read().postings.get(&token_id).cloned())
    }

    fn update_postings(
        &self,
        token_id: u32,
        docs_count: u32,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .postings
            .insert(token_id, (docs_count, bytes.to_vec()));
        Ok(())
    }

    fn get_token_id(&self, token_bytes: &[u8], document_id: u32) -> Result<(u32, u32), StoreError> {
        let mut inner = self.inner.write();
        let token_id = if let Some(&id) = inner.token_ids.get(token_bytes) {
            id
        } else {
            let id = inner.next_token_id;
            inner.next_token_id += 1;
            inner.token_ids.insert(token_bytes.to_vec(), id);
            inner.tokens.insert(id, token_bytes.to_vec());
            inner.token_docs_count.insert(id, 0);
            id
        };

        if document_id != 0 {
            *inner.token_docs_count.entry(token_id).or_insert(0) += 1;
        }

        let docs_count = *inner.token_docs_count.get(&token_id).unwrap_or(&0);
        Ok((token_id, docs_count))
    }

    fn get_token(&self, token_id: u32) -> Result<Vec<u8>, StoreError> {
        self.inner
            .read()
            .tokens
            .get(&token_id)
            .cloned()
            .ok_or_else(|| StoreError::new(format!("unknown token_id {token_id}")))
    }

    fn get_document_count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().document_count)
    }
}
