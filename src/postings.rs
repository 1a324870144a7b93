//! Data model (§3) and Posting Codec (§4.3, §6.2).

use std::fmt;

use crate::bitbuffer::{BitBuffer, BitReader};
use crate::config::CompressMode;
use crate::error::DecodeError;
use crate::golomb::{mean_gap_m, GolombParams};

/// One entry of a posting list: a document and the strictly ascending
/// positions the token occurred at within it (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingEntry {
    document_id: u32,
    positions: Vec<u32>,
}

impl PostingEntry {
    /// Create a new entry for `document_id` with a single initial
    /// occurrence at `position`.
    pub fn new(document_id: u32, position: u32) -> Self {
        Self {
            document_id,
            positions: vec![position],
        }
    }

    /// Construct an entry from an already-built, strictly ascending
    /// position list. Intended for decoding and tests.
    pub fn from_parts(document_id: u32, positions: Vec<u32>) -> Self {
        Self {
            document_id,
            positions,
        }
    }

    /// The document this entry refers to.
    pub fn document_id(&self) -> u32 {
        self.document_id
    }

    /// Occurrence positions, strictly ascending.
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// `positions_count` — the number of occurrences recorded so far.
    pub fn positions_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Append an occurrence. The caller must ensure `position` is strictly
    /// greater than the last position already recorded (§3 invariant).
    pub fn push_position(&mut self, position: u32) {
        debug_assert!(
            self.positions.last().map_or(true, |&last| position > last),
            "positions must be strictly ascending"
        );
        self.positions.push(position);
    }
}

impl fmt::Display for PostingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc_id {} (", self.document_id)?;
        for p in &self.positions {
            write!(f, "{} ", p)?;
        }
        write!(f, ")")
    }
}

/// Encode a posting list to its byte representation under `mode` (§4.3,
/// §6.2). `documents_count` is the corpus size, only consulted in
/// `CompressMode::Golomb` mode to pick the document-gap modulus.
pub fn encode_postings(
    mode: CompressMode,
    postings: &[PostingEntry],
    documents_count: u64,
) -> Vec<u8> {
    match mode {
        CompressMode::None => encode_none(postings),
        CompressMode::Golomb => encode_golomb(postings, documents_count),
    }
}

/// Decode a posting list from its byte representation under `mode`.
/// `docs_count` is the count carried alongside the bytes out-of-band; the
/// caller must have already verified it (or will verify the returned
/// length against it) per §4.3 — this function itself cross-checks `docs_count`
/// for the `golomb` format, where it is embedded in the stream, and leaves
/// verification against the `none` format's implicit length to the caller.
pub fn decode_postings(
    mode: CompressMode,
    bytes: &[u8],
    docs_count: u32,
) -> Result<Vec<PostingEntry>, DecodeError> {
    match mode {
        CompressMode::None => decode_none(bytes),
        CompressMode::Golomb => decode_golomb(bytes, docs_count),
    }
}

fn encode_none(postings: &[PostingEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in postings {
        out.extend_from_slice(&entry.document_id.to_le_bytes());
        out.extend_from_slice(&entry.positions_count().to_le_bytes());
        for &pos in &entry.positions {
            out.extend_from_slice(&pos.to_le_bytes());
        }
    }
    out
}

fn decode_none(bytes: &[u8]) -> Result<Vec<PostingEntry>, DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let document_id = read_u32_le(bytes, &mut pos)?;
        let positions_count = read_u32_le(bytes, &mut pos)?;
        let mut positions = Vec::with_capacity(positions_count as usize);
        for _ in 0..positions_count {
            positions.push(read_u32_le(bytes, &mut pos)?);
        }
        out.push(PostingEntry::from_parts(document_id, positions));
    }
    Ok(out)
}

fn read_u32_le(bytes: &[u8], pos: &mut usize) -> Result<u32, DecodeError> {
    let end = *pos + 4;
    if end > bytes.len() {
        log::warn!("posting list decode ran past end of buffer at offset {pos}");
        return Err(DecodeError::InvalidCode);
    }
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&bytes[*pos..end]);
    *pos = end;
    Ok(u32::from_le_bytes(arr))
}

fn encode_golomb(postings: &[PostingEntry], documents_count: u64) -> Vec<u8> {
    let docs_count = postings.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&docs_count.to_le_bytes());

    if postings.is_empty() {
        return out;
    }

    let m_doc = mean_gap_m(documents_count, postings.len() as u64);
    out.extend_from_slice(&(m_doc as u32).to_le_bytes());
    let params = GolombParams::new(m_doc);

    let mut buf = BitBuffer::new();
    let mut prev_doc_id: i64 = 0;
    for entry in postings {
        let gap = entry.document_id() as i64 - prev_doc_id - 1;
        params.encode(gap as u64, &mut buf);
        prev_doc_id = entry.document_id() as i64;
    }
    buf.flush_byte();
    out.extend_from_slice(buf.as_bytes());

    for entry in postings {
        let positions_count = entry.positions_count();
        out.extend_from_slice(&positions_count.to_le_bytes());

        let last_position = *entry.positions().last().unwrap();
        let m_pos = ((last_position as u64 + 1) / positions_count as u64).max(1);
        out.extend_from_slice(&(m_pos as u32).to_le_bytes());
        let params = GolombParams::new(m_pos);

        let mut buf = BitBuffer::new();
        let mut prev_position: i64 = -1;
        for &position in entry.positions() {
            let gap = position as i64 - prev_position - 1;
            params.encode(gap as u64, &mut buf);
            prev_position = position as i64;
        }
        buf.flush_byte();
        out.extend_from_slice(buf.as_bytes());
    }

    out
}

fn decode_golomb(bytes: &[u8], docs_count: u32) -> Result<Vec<PostingEntry>, DecodeError> {
    let mut cursor = 0usize;
    let total_docs_count = read_u32_le(bytes, &mut cursor)?;

    if total_docs_count == 0 {
        if docs_count != 0 {
            return Err(DecodeError::LengthMismatch {
                stored: docs_count,
                decoded: 0,
            });
        }
        return Ok(Vec::new());
    }

    let m_doc = read_u32_le(bytes, &mut cursor)? as u64;
    let params = GolombParams::new(m_doc.max(1));

    let mut reader = BitReader::new(&bytes[cursor..]);
    let mut document_ids = Vec::with_capacity(total_docs_count as usize);
    let mut prev_doc_id: i64 = 0;
    for _ in 0..total_docs_count {
        let gap = params.decode(&mut reader)? as i64;
        let document_id = prev_doc_id + gap + 1;
        document_ids.push(document_id as u32);
        prev_doc_id = document_id;
    }
    reader.align_to_byte();
    cursor += reader.byte_pos();

    let mut entries = Vec::with_capacity(total_docs_count as usize);
    for &document_id in &document_ids {
        let positions_count = read_u32_le(bytes, &mut cursor)?;
        let m_pos = read_u32_le(bytes, &mut cursor)? as u64;
        let params = GolombParams::new(m_pos.max(1));

        let mut reader = BitReader::new(&bytes[cursor..]);
        let mut positions = Vec::with_capacity(positions_count as usize);
        let mut prev_position: i64 = -1;
        for _ in 0..positions_count {
            let gap = params.decode(&mut reader)? as i64;
            let position = prev_position + gap + 1;
            positions.push(position as u32);
            prev_position = position;
        }
        reader.align_to_byte();
        cursor += reader.byte_pos();

        entries.push(PostingEntry::from_parts(document_id, positions));
    }

    if entries.len() as u32 != docs_count {
        log::error!(
            "posting list length mismatch: stored docs_count {docs_count} but decoded {} entries",
            entries.len()
        );
        return Err(DecodeError::LengthMismatch {
            stored: docs_count,
            decoded: entries.len() as u32,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(u32, &[u32])]) -> Vec<PostingEntry> {
        pairs
            .iter()
            .map(|&(doc, positions)| PostingEntry::from_parts(doc, positions.to_vec()))
            .collect()
    }

    #[test]
    fn none_round_trip() {
        let list = entries(&[(7, &[0, 3]), (12, &[1])]);
        let bytes = encode_postings(CompressMode::None, &list, 0);
        let decoded = decode_postings(CompressMode::None, &bytes, list.len() as u32).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn none_empty_list_is_zero_bytes() {
        let bytes = encode_postings(CompressMode::None, &[], 0);
        assert!(bytes.is_empty());
        let decoded = decode_postings(CompressMode::None, &bytes, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn golomb_round_trip() {
        let list = entries(&[(3, &[0]), (10, &[2, 5]), (50, &[0, 1, 9])]);
        let bytes = encode_postings(CompressMode::Golomb, &list, 100);
        let decoded = decode_postings(CompressMode::Golomb, &bytes, list.len() as u32).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn golomb_empty_list_is_docs_count_only() {
        let bytes = encode_postings(CompressMode::Golomb, &[], 100);
        assert_eq!(bytes.len(), 4);
        let decoded = decode_postings(CompressMode::Golomb, &bytes, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn golomb_length_mismatch_is_reported() {
        let list = entries(&[(3, &[0]), (10, &[2])]);
        let bytes = encode_postings(CompressMode::Golomb, &list, 100);
        let err = decode_postings(CompressMode::Golomb, &bytes, 5).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { stored: 5, decoded: 2 }));
    }

    #[test]
    fn position_zero_is_legal_first_gap() {
        // prev = -1, position 0 => gap = 0 - (-1) - 1 = 0 (§8 boundary case).
        let list = entries(&[(1, &[0])]);
        let bytes = encode_postings(CompressMode::Golomb, &list, 10);
        let decoded = decode_postings(CompressMode::Golomb, &bytes, 1).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn m_equals_one_still_round_trips() {
        // documents_count == postings_len forces m_doc == 1 (pure unary).
        let list = entries(&[(1, &[0]), (2, &[1]), (3, &[2])]);
        let bytes = encode_postings(CompressMode::Golomb, &list, 3);
        let decoded = decode_postings(CompressMode::Golomb, &bytes, list.len() as u32).unwrap();
        assert_eq!(decoded, list);
    }
}
