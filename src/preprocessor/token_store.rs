//! Scoped on-disk resources produced by the preprocessor: the length-prefixed
//! A2L token stream and the AML text blob. Each wraps a
//! [`tempfile::NamedTempFile`]; `Drop` on the temp file removes it, so
//! there's no explicit teardown method the caller must remember to call —
//! the Rust expression of the source's scoped-resource idiom (§5).

use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};

use tempfile::NamedTempFile;

use crate::tokenizer::Span;

/// One record in the persisted A2L token stream: enough to reconstruct the
/// tokenizer's output without holding the whole stream in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub token_type_id: u8,
    pub span: Span,
    pub payload: Vec<u8>,
}

/// Append-only during preprocessing, then reopened for a single sequential
/// read by the A2L parser. Random access isn't needed here (unlike
/// [`crate::preprocessor::ifdata_store::IfDataStore`]) because the A2L
/// parser always consumes the stream front-to-back.
pub struct A2lTokenStore {
    file: NamedTempFile,
}

impl A2lTokenStore {
    pub fn create() -> io::Result<Self> {
        Ok(Self {
            file: NamedTempFile::new()?,
        })
    }

    pub fn write_all(&mut self, tokens: &[StoredToken]) -> io::Result<()> {
        let mut writer = BufWriter::new(self.file.as_file_mut());
        for token in tokens {
            write_record(&mut writer, token)?;
        }
        writer.flush()
    }

    /// Reads every record back in order. Called once, after preprocessing
    /// finishes, by the A2L parser's driver loop.
    pub fn read_all(&mut self) -> io::Result<Vec<StoredToken>> {
        self.file.as_file_mut().seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        self.file.as_file_mut().read_to_end(&mut bytes)?;
        let mut cursor = 0usize;
        let mut out = Vec::new();
        while cursor < bytes.len() {
            let (token, consumed) = read_record(&bytes[cursor..])?;
            out.push(token);
            cursor += consumed;
        }
        Ok(out)
    }
}

fn write_record(writer: &mut impl Write, token: &StoredToken) -> io::Result<()> {
    writer.write_all(&(token.payload.len() as u32).to_le_bytes())?;
    writer.write_all(&[token.token_type_id])?;
    for field in [
        token.span.start_line,
        token.span.start_col,
        token.span.end_line,
        token.span.end_col,
    ] {
        writer.write_all(&(field as u64).to_le_bytes())?;
    }
    writer.write_all(&token.payload)
}

fn read_record(bytes: &[u8]) -> io::Result<(StoredToken, usize)> {
    let err = || io::Error::new(io::ErrorKind::UnexpectedEof, "truncated token record");
    if bytes.len() < 5 {
        return Err(err());
    }
    let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let token_type_id = bytes[4];
    let span_start = 5;
    let span_len = 8 * 4;
    if bytes.len() < span_start + span_len + len {
        return Err(err());
    }
    let mut fields = [0usize; 4];
    for (i, field) in fields.iter_mut().enumerate() {
        let offset = span_start + i * 8;
        *field = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    }
    let payload_start = span_start + span_len;
    let payload = bytes[payload_start..payload_start + len].to_vec();
    let consumed = payload_start + len;
    Ok((
        StoredToken {
            token_type_id,
            span: Span::new(fields[0], fields[1], fields[2], fields[3]),
            payload,
        },
        consumed,
    ))
}

/// The AML text blob (everything between `/begin A2ML` and `/end A2ML`,
/// inclusive), held on disk the same way as the token stream even though a
/// single `String` would fit in memory, so that teardown goes through the
/// same RAII path as the other two scoped resources (§5).
pub struct AmlBlobStore {
    file: NamedTempFile,
}

impl AmlBlobStore {
    pub fn create() -> io::Result<Self> {
        Ok(Self {
            file: NamedTempFile::new()?,
        })
    }

    pub fn write(&mut self, blob: &str) -> io::Result<()> {
        self.file.as_file_mut().write_all(blob.as_bytes())
    }

    pub fn read(&mut self) -> io::Result<String> {
        self.file.as_file_mut().seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        self.file.as_file_mut().read_to_string(&mut contents)?;
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token(payload: &[u8]) -> StoredToken {
        StoredToken {
            token_type_id: 3,
            span: Span::new(1, 1, 1, payload.len()),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn a2l_token_store_round_trips_records() {
        let mut store = A2lTokenStore::create().unwrap();
        let tokens = vec![sample_token(b"MEASUREMENT"), sample_token(b"foo")];
        store.write_all(&tokens).unwrap();
        let read_back = store.read_all().unwrap();
        assert_eq!(read_back, tokens);
    }

    #[test]
    fn aml_blob_store_round_trips_text() {
        let mut store = AmlBlobStore::create().unwrap();
        store.write("/begin A2ML struct X { int; }; /end A2ML").unwrap();
        let text = store.read().unwrap();
        assert_eq!(text, "/begin A2ML struct X { int; }; /end A2ML");
    }
}
