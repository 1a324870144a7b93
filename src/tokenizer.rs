//! N-gram tokenizer and ingest (§4.5).
//!
//! Operates directly on Rust `char`s, which are already UTF-32 Unicode
//! scalar values — the "text-decoding layer that yields UTF-32 input from
//! UTF-8" (§1) collapses to `str::chars()` in this language and is not a
//! separate component here.

use crate::error::StoreError;
use crate::fragment::IndexFragment;
use crate::store::PostingStore;

/// Maximum UTF-8 bytes a single Unicode scalar value can encode to.
const MAX_UTF8_SIZE: usize = 4;

/// Whether `c` is ignored for tokenization purposes: ASCII punctuation and
/// whitespace, plus a small set of CJK punctuation (§4.5).
pub fn is_ignored_char(c: char) -> bool {
    matches!(
        c,
        ' ' | '\x0c' | '\n' | '\r' | '\t' | '\x0b'
            | '!' | '"' | '#' | '$' | '%' | '&' | '\'' | '(' | ')' | '*' | '+' | ','
            | '-' | '.' | '/'
            | ':' | ';' | '<' | '=' | '>' | '?' | '@'
            | '[' | '\\' | ']' | '^' | '_' | '`'
            | '{' | '|' | '}' | '~'
            | '\u{3000}' // ideographic space
            | '\u{3001}' // 、
            | '\u{3002}' // 。
            | '\u{FF08}' // （
            | '\u{FF09}' // ）
            | '\u{FF01}' // ！
            | '\u{FF0C}' // ，
            | '\u{FF1A}' // ：
            | '\u{FF1B}' // ；
            | '\u{FF1F}' // ？
    )
}

/// One yielded N-gram: its characters and the position it was emitted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ngram<'a> {
    /// The characters making up this token (length may be `< n` at the end
    /// of an indexable run).
    pub chars: &'a [char],
    /// Position counter — increments once per yielded token, not per
    /// character (§4.5).
    pub position: u32,
}

/// Iterator yielding overlapping N-grams of up to `n` indexable characters
/// from `text` (§4.5).
///
/// - `document_id > 0` (indexing): short tokens at the end of an indexable
///   run are kept.
/// - `document_id == 0` (query tokenization): short tokens are dropped so
///   queries cannot match spurious suffixes.
pub struct NgramIter<'a> {
    text: &'a [char],
    n: usize,
    document_id: u32,
    cursor: usize,
    position: u32,
}

impl<'a> NgramIter<'a> {
    /// Create an iterator over `text` with N-gram size `n`, for the given
    /// `document_id` (`0` selects query-tokenization short-tail dropping).
    pub fn new(text: &'a [char], n: usize, document_id: u32) -> Self {
        assert!(n >= 2, "n-gram size must be at least 2");
        Self {
            text,
            n,
            document_id,
            cursor: 0,
            position: 0,
        }
    }
}

impl<'a> Iterator for NgramIter<'a> {
    type Item = Ngram<'a>;

    fn next(&mut self) -> Option<Ngram<'a>> {
        loop {
            // Skip leading ignored characters.
            while self.cursor < self.text.len() && is_ignored_char(self.text[self.cursor]) {
                self.cursor += 1;
            }
            if self.cursor >= self.text.len() {
                return None;
            }

            let start = self.cursor;
            let mut len = 0;
            while len < self.n
                && start + len < self.text.len()
                && !is_ignored_char(self.text[start + len])
            {
                len += 1;
            }

            // Advance by one character (overlap step = 1), and the
            // position counter by one yielded token.
            self.cursor += 1;
            let position = self.position;
            self.position += 1;

            let keep = len >= self.n || self.document_id != 0;
            if keep {
                return Some(Ngram {
                    chars: &self.text[start..start + len],
                    position,
                });
            }
            // Short tail dropped in query mode: loop around, having
            // already advanced the cursor and position counter.
        }
    }
}

/// Encode a token's characters to UTF-8, bounded by `n * MAX_UTF8_SIZE`
/// bytes (§4.5).
pub fn token_to_utf8(chars: &[char]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(chars.len() * MAX_UTF8_SIZE);
    let mut enc = [0u8; MAX_UTF8_SIZE];
    for &c in chars {
        buf.extend_from_slice(c.encode_utf8(&mut enc).as_bytes());
    }
    buf
}

/// Tokenize `text` into N-grams and record each occurrence into `fragment`
/// by resolving token ids through `store` (§4.5's indexing data flow).
///
/// `document_id` must be nonzero; use [`tokenize_query`] for query-side
/// tokenization, which does not touch the fragment or the store's
/// document-count bookkeeping.
pub fn index_document(
    store: &impl PostingStore,
    fragment: &mut IndexFragment,
    document_id: u32,
    text: &str,
    n: usize,
) -> Result<(), StoreError> {
    assert!(document_id != 0, "index_document requires document_id != 0");
    let chars: Vec<char> = text.chars().collect();
    for ngram in NgramIter::new(&chars, n, document_id) {
        let token_bytes = token_to_utf8(ngram.chars);
        let (token_id, _docs_count) = store.get_token_id(&token_bytes, document_id)?;
        fragment.insert(token_id, document_id, ngram.position, None);
    }
    Ok(())
}

/// Tokenize a query string into the token ids that should be looked up,
/// dropping short trailing N-grams (§4.5, `document_id == 0`). Each
/// returned token id is paired with the store's authoritative corpus-wide
/// `docs_count`, matching [`IndexFragment::insert`]'s `docs_count_hint`.
pub fn tokenize_query(
    store: &impl PostingStore,
    text: &str,
    n: usize,
) -> Result<Vec<(u32, u32)>, StoreError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    for ngram in NgramIter::new(&chars, n, 0) {
        let token_bytes = token_to_utf8(ngram.chars);
        let (token_id, docs_count) = store.get_token_id(&token_bytes, 0)?;
        out.push((token_id, docs_count));
    }
    Ok(out)
}
