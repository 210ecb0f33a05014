//! Append-only, random-access store of `IF_DATA` block text, keyed by the
//! block's source position. Backed by a `tempfile::NamedTempFile` the way
//! [`crate::preprocessor::token_store::A2lTokenStore`] is — see §5.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

use tempfile::NamedTempFile;

use crate::tokenizer::Span;

/// `(start_line, start_col)` — the position of the `/begin IF_DATA` token,
/// which the A2L parser already has in hand when it wants this block's text.
pub type IfDataKey = (usize, usize);

struct Slot {
    offset: u64,
    len: u64,
}

pub struct IfDataStore {
    file: NamedTempFile,
    index: HashMap<IfDataKey, Slot>,
    write_cursor: u64,
}

impl IfDataStore {
    pub fn create() -> io::Result<Self> {
        Ok(Self {
            file: NamedTempFile::new()?,
            index: HashMap::new(),
            write_cursor: 0,
        })
    }

    /// Appends one IF_DATA block's raw payload (its span plus the
    /// concatenated token bytes including internal whitespace).
    pub fn append(&mut self, span: Span, payload: &[u8]) -> io::Result<()> {
        let key = (span.start_line, span.start_col);
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(self.write_cursor))?;
        file.write_all(payload)?;
        self.index.insert(
            key,
            Slot {
                offset: self.write_cursor,
                len: payload.len() as u64,
            },
        );
        self.write_cursor += payload.len() as u64;
        Ok(())
    }

    /// Seeks to the stored offset and reads back the raw IF_DATA text for
    /// the block starting at `pos`. Returns `None` if no block was recorded
    /// at that position.
    pub fn get(&mut self, pos: IfDataKey) -> io::Result<Option<Vec<u8>>> {
        let Some(slot) = self.index.get(&pos) else {
            return Ok(None);
        };
        let (offset, len) = (slot.offset, slot.len);
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IfDataKey> {
        self.index.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_blocks_round_trip_by_position() {
        let mut store = IfDataStore::create().unwrap();
        let span_a = Span::new(10, 1, 12, 9);
        let span_b = Span::new(20, 1, 20, 30);
        store.append(span_a, b"payload A").unwrap();
        store.append(span_b, b"payload B, longer").unwrap();

        assert_eq!(store.get((10, 1)).unwrap(), Some(b"payload A".to_vec()));
        assert_eq!(
            store.get((20, 1)).unwrap(),
            Some(b"payload B, longer".to_vec())
        );
    }

    #[test]
    fn missing_key_returns_none() {
        let mut store = IfDataStore::create().unwrap();
        assert_eq!(store.get((1, 1)).unwrap(), None);
    }

    #[test]
    fn len_tracks_the_number_of_recorded_blocks() {
        let mut store = IfDataStore::create().unwrap();
        assert!(store.is_empty());
        store.append(Span::new(1, 1, 1, 5), b"abc").unwrap();
        assert_eq!(store.len(), 1);
    }
}
