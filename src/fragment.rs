//! Index Fragment (§4.4): an in-memory, per-session inverted index built
//! during tokenization and later merged into the persistent store.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::config::CompressMode;
use crate::error::FlushError;
use crate::postings::{decode_postings, encode_postings, PostingEntry};
use crate::store::PostingStore;

/// One entry of an [`IndexFragment`]: everything the fragment knows about
/// a single token (§3's "index fragment" record).
#[derive(Debug, Clone)]
pub struct FragmentEntry {
    token_id: u32,
    docs_count: u32,
    postings: Vec<PostingEntry>,
}

impl FragmentEntry {
    /// Token id this entry belongs to.
    pub fn token_id(&self) -> u32 {
        self.token_id
    }

    /// Number of documents this token is believed to occur in. For a
    /// freshly created entry this is either `1` (ingest) or the store's
    /// authoritative corpus-wide count (query construction) — see
    /// [`IndexFragment::insert`].
    pub fn docs_count(&self) -> u32 {
        self.docs_count
    }

    /// The entry's posting list, ordered ascending by `document_id`.
    pub fn postings(&self) -> &[PostingEntry] {
        &self.postings
    }
}

impl fmt::Display for FragmentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TOKEN {} ({}):", self.token_id, self.docs_count)?;
        for entry in &self.postings {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// In-memory inverted index fragment: `token_id -> FragmentEntry` (§3, §4.4).
/// Owned by a single indexing session; consumed by [`IndexFragment::flush`]
/// and then discarded.
#[derive(Debug, Default)]
pub struct IndexFragment {
    entries: FxHashMap<u32, FragmentEntry>,
}

impl IndexFragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Number of distinct tokens recorded in this fragment.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the fragment has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the fragment entry for a token, if present.
    pub fn get(&self, token_id: u32) -> Option<&FragmentEntry> {
        self.entries.get(&token_id)
    }

    /// Iterate over all entries. Order is unspecified (§3).
    pub fn entries(&self) -> impl Iterator<Item = &FragmentEntry> {
        self.entries.values()
    }

    /// Record a single occurrence of `token_id` at `position` within
    /// `document_id` (§4.4).
    ///
    /// If the fragment already has an entry for `token_id`, `position` is
    /// appended to that entry's single posting entry (the caller — the
    /// tokenizer — only ever calls this with one `document_id` per
    /// fragment-building pass; see the invariant on [`IndexFragment`]).
    /// Otherwise a fresh entry is allocated with `docs_count` taken from
    /// `docs_count_hint` when given (query construction, §4.5) or `1`
    /// (document ingest).
    ///
    /// # Panics
    /// Debug builds assert `position` is strictly greater than the last
    /// position already recorded for this `(token_id, document_id)` pair,
    /// and that an existing entry's postings refer to the same
    /// `document_id` — multiple documents in one fragment-building pass for
    /// the same token must arrive through distinct `insert` sequences
    /// followed by [`IndexFragment::merge_into`], never interleaved.
    pub fn insert(&mut self, token_id: u32, document_id: u32, position: u32, docs_count_hint: Option<u32>) {
        match self.entries.get_mut(&token_id) {
            Some(entry) => {
                let pl = entry
                    .postings
                    .last_mut()
                    .expect("fragment entry always has at least one posting");
                debug_assert_eq!(
                    pl.document_id(),
                    document_id,
                    "insert called with a different document_id for a token already open in this fragment"
                );
                pl.push_position(position);
            }
            None => {
                let docs_count = docs_count_hint.unwrap_or(1);
                self.entries.insert(
                    token_id,
                    FragmentEntry {
                        token_id,
                        docs_count,
                        postings: vec![PostingEntry::new(document_id, position)],
                    },
                );
            }
        }
    }

    /// Destructively transfer every entry of `other` into `self` (§4.4).
    /// For tokens present in both, the posting lists are merged (§ merge
    /// rule) and `docs_count` fields are summed — valid only when the two
    /// posting lists have disjoint `document_id` sets (§9 Open Questions).
    /// After the call `other` is empty.
    pub fn merge_into(&mut self, other: &mut IndexFragment) {
        for (token_id, incoming) in other.entries.drain() {
            match self.entries.remove(&token_id) {
                Some(existing) => {
                    let merged_postings = merge_postings(existing.postings, incoming.postings);
                    self.entries.insert(
                        token_id,
                        FragmentEntry {
                            token_id,
                            docs_count: existing.docs_count + incoming.docs_count,
                            postings: merged_postings,
                        },
                    );
                }
                None => {
                    self.entries.insert(token_id, incoming);
                }
            }
        }
    }

    /// Read persisted postings for `entry`'s token, merge them with the
    /// fragment's in-memory postings for that token, encode the result,
    /// and write it back through `store` (§4.4).
    pub fn flush(
        &self,
        store: &impl PostingStore,
        compress: CompressMode,
        token_id: u32,
    ) -> Result<(), FlushError> {
        let entry = match self.entries.get(&token_id) {
            Some(entry) => entry,
            None => return Ok(()),
        };

        let persisted = store
            .get_postings(token_id)
            .map_err(FlushError::Store)?;

        let (total_docs_count, merged) = match persisted {
            Some((persisted_docs_count, bytes)) if !bytes.is_empty() => {
                let persisted_postings = decode_postings(compress, &bytes, persisted_docs_count)?;
                assert_disjoint(&persisted_postings, &entry.postings)?;
                let merged = merge_postings(persisted_postings, entry.postings.clone());
                (persisted_docs_count + entry.docs_count, merged)
            }
            _ => (entry.docs_count, entry.postings.clone()),
        };

        let documents_count = store.get_document_count().map_err(FlushError::Store)?;
        let bytes = encode_postings(compress, &merged, documents_count);
        store
            .update_postings(token_id, total_docs_count, &bytes)
            .map_err(FlushError::Store)?;
        Ok(())
    }

    /// Flush every entry in this fragment (convenience over repeated calls
    /// to [`IndexFragment::flush`]).
    pub fn flush_all(
        &self,
        store: &impl PostingStore,
        compress: CompressMode,
    ) -> Result<(), FlushError> {
        for token_id in self.entries.keys().copied().collect::<Vec<_>>() {
            self.flush(store, compress, token_id)?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries.values() {
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

fn assert_disjoint(a: &[PostingEntry], b: &[PostingEntry]) -> Result<(), FlushError> {
    let mut ai = a.iter().peekable();
    let mut bi = b.iter().peekable();
    while let (Some(x), Some(y)) = (ai.peek(), bi.peek()) {
        if x.document_id() == y.document_id() {
            log::error!(
                "flush: document_id {} present in both persisted and in-memory postings",
                x.document_id()
            );
            return Err(FlushError::DuplicateDocument(x.document_id()));
        } else if x.document_id() < y.document_id() {
            ai.next();
        } else {
            bi.next();
        }
    }
    Ok(())
}

/// Merge two posting lists with no shared `document_id`, preserving
/// ascending order (§4.4 "Posting-list merge rule"). A shared
/// `document_id` indicates corrupted input and is a programming error.
fn merge_postings(a: Vec<PostingEntry>, b: Vec<PostingEntry>) -> Vec<PostingEntry> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();

    loop {
        match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => {
                if x.document_id() < y.document_id() {
                    out.push(a.next().unwrap());
                } else if y.document_id() < x.document_id() {
                    out.push(b.next().unwrap());
                } else {
                    panic!(
                        "merge_postings: duplicate document_id {} across inputs",
                        x.document_id()
                    );
                }
            }
            (Some(_), None) => out.push(a.next().unwrap()),
            (None, Some(_)) => out.push(b.next().unwrap()),
            (None, None) => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn insert_creates_entry_with_docs_count_one_during_ingest() {
        let mut frag = IndexFragment::new();
        frag.insert(1, 7, 0, None);
        let entry = frag.get(1).unwrap();
        assert_eq!(entry.docs_count(), 1);
        assert_eq!(entry.postings().len(), 1);
        assert_eq!(entry.postings()[0].document_id(), 7);
        assert_eq!(entry.postings()[0].positions(), &[0]);
    }

    #[test]
    fn insert_uses_hinted_docs_count_for_query_construction() {
        let mut frag = IndexFragment::new();
        frag.insert(1, 0, 0, Some(42));
        assert_eq!(frag.get(1).unwrap().docs_count(), 42);
    }

    #[test]
    fn repeated_insert_appends_positions_to_same_document() {
        let mut frag = IndexFragment::new();
        frag.insert(1, 7, 0, None);
        frag.insert(1, 7, 3, None);
        let entry = frag.get(1).unwrap();
        assert_eq!(entry.postings().len(), 1);
        assert_eq!(entry.postings()[0].positions(), &[0, 3]);
    }

    #[test]
    fn merge_into_is_commutative_on_disjoint_ids() {
        let mut a = IndexFragment::new();
        a.insert(1, 1, 0, None);
        let mut b = IndexFragment::new();
        b.insert(1, 2, 0, None);

        let mut merged_ab = IndexFragment::new();
        merged_ab.insert(1, 1, 0, None);
        let mut b2 = IndexFragment::new();
        b2.insert(1, 2, 0, None);
        merged_ab.merge_into(&mut b2);

        let mut merged_ba = IndexFragment::new();
        merged_ba.insert(1, 2, 0, None);
        let mut a2 = IndexFragment::new();
        a2.insert(1, 1, 0, None);
        merged_ba.merge_into(&mut a2);

        let ids_ab: Vec<_> = merged_ab.get(1).unwrap().postings().iter().map(|p| p.document_id()).collect();
        let ids_ba: Vec<_> = merged_ba.get(1).unwrap().postings().iter().map(|p| p.document_id()).collect();
        assert_eq!(ids_ab, ids_ba);
        assert_eq!(ids_ab, vec![1, 2]);
    }

    #[test]
    fn merge_into_drains_other() {
        let mut base = IndexFragment::new();
        let mut other = IndexFragment::new();
        other.insert(1, 1, 0, None);
        base.merge_into(&mut other);
        assert!(other.is_empty());
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn merge_into_preserves_ascending_order() {
        // Each document gets its own single-document fragment (insert's
        // per-call invariant), merged together afterwards.
        let mut base = IndexFragment::new();
        base.insert(1, 5, 0, None);
        let mut doc9 = IndexFragment::new();
        doc9.insert(1, 9, 0, None);
        base.merge_into(&mut doc9);

        let mut other = IndexFragment::new();
        other.insert(1, 2, 0, None);

        base.merge_into(&mut other);
        let ids: Vec<_> = base.get(1).unwrap().postings().iter().map(|p| p.document_id()).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn flush_merges_with_persisted_postings() {
        // §8 scenario 4: store holds doc2[0,5], doc9[3]; fragment adds doc5[1].
        let store = MemoryStore::new();
        let raw = encode_postings(
            CompressMode::None,
            &[
                PostingEntry::from_parts(2, vec![0, 5]),
                PostingEntry::from_parts(9, vec![3]),
            ],
            0,
        );
        store.update_postings(1, 2, &raw).unwrap();

        let mut frag = IndexFragment::new();
        frag.insert(1, 5, 1, None);

        frag.flush(&store, CompressMode::None, 1).unwrap();

        let (docs_count, bytes) = store.get_postings(1).unwrap().unwrap();
        assert_eq!(docs_count, 3);
        let decoded = decode_postings(CompressMode::None, &bytes, docs_count).unwrap();
        let ids: Vec<_> = decoded.iter().map(|p| p.document_id()).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
