//! Handles `/include`, strips comments, segregates `A2ML` and `IF_DATA`
//! content, and produces the three side channels the rest of the pipeline
//! consumes: the A2L token stream, the AML text blob, and the IF_DATA index.

pub mod ifdata_store;
pub mod line_map;
pub mod token_store;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::ParserConfig;
use crate::tokenizer::{tokenize, Span, Token, TokenClass};

use ifdata_store::IfDataStore;
use line_map::LineMap;
use token_store::{A2lTokenStore, AmlBlobStore, StoredToken};

#[derive(Debug)]
pub enum PreprocessorError {
    Io(std::io::Error),
    IncludeNotFound {
        file: String,
        line: usize,
        col: usize,
        name: String,
    },
    CircularInclude {
        file: String,
        line: usize,
        col: usize,
        name: String,
    },
    UnterminatedBlock {
        file: String,
        line: usize,
        col: usize,
        keyword: &'static str,
    },
}

impl fmt::Display for PreprocessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessorError::Io(e) => write!(f, "I/O error: {}", e),
            PreprocessorError::IncludeNotFound { file, line, col, name } => write!(
                f,
                "{}:{}:{}: include file not found: {}",
                file, line, col, name
            ),
            PreprocessorError::CircularInclude { file, line, col, name } => write!(
                f,
                "{}:{}:{}: circular include of {}",
                file, line, col, name
            ),
            PreprocessorError::UnterminatedBlock { file, line, col, keyword } => write!(
                f,
                "{}:{}:{}: unterminated /begin {}",
                file, line, col, keyword
            ),
        }
    }
}

impl std::error::Error for PreprocessorError {}

impl From<std::io::Error> for PreprocessorError {
    fn from(e: std::io::Error) -> Self {
        PreprocessorError::Io(e)
    }
}

/// The three scoped artifacts the preprocessor hands to the rest of the
/// pipeline, plus the line map for diagnostics.
pub struct PreprocessResult {
    pub tokens: A2lTokenStore,
    pub aml_blob: AmlBlobStore,
    pub if_data: IfDataStore,
    pub line_map: LineMap,
}

pub struct Preprocessor<'a> {
    config: &'a ParserConfig,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, root: &Path) -> Result<PreprocessResult, PreprocessorError> {
        let mut builder = Builder {
            config: self.config,
            tokens: Vec::new(),
            aml_blob: String::new(),
            if_data: IfDataStore::create()?,
            line_map: LineMap::new(),
            include_stack: Vec::new(),
            absolute_cursor: 1,
        };
        builder.process_file(root)?;
        builder.line_map.finalize();

        let mut token_store = A2lTokenStore::create()?;
        token_store.write_all(&builder.tokens)?;
        let mut aml_store = AmlBlobStore::create()?;
        aml_store.write(&builder.aml_blob)?;

        Ok(PreprocessResult {
            tokens: token_store,
            aml_blob: aml_store,
            if_data: builder.if_data,
            line_map: builder.line_map,
        })
    }
}

/// Replaces every byte with a space except embedded newlines, which are kept
/// so line numbers downstream stay correct.
fn blank(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .map(|&b| if b == b'\n' { b'\n' } else { b' ' })
        .collect()
}

struct Builder<'a> {
    config: &'a ParserConfig,
    tokens: Vec<StoredToken>,
    aml_blob: String,
    if_data: IfDataStore,
    line_map: LineMap,
    include_stack: Vec<PathBuf>,
    absolute_cursor: usize,
}

impl<'a> Builder<'a> {
    fn process_file(&mut self, path: &Path) -> Result<(), PreprocessorError> {
        let canonical = path
            .canonicalize()
            .map_err(PreprocessorError::Io)?;
        if self.include_stack.contains(&canonical) {
            return Err(PreprocessorError::CircularInclude {
                file: display_path(path),
                line: 0,
                col: 0,
                name: display_path(path),
            });
        }
        info!("preprocessing {}", path.display());
        self.include_stack.push(canonical);

        let bytes = fs::read(path).map_err(PreprocessorError::Io)?;
        let tokens = tokenize(&bytes);
        let local_line_count = tokens.iter().map(|t| t.span.end_line).max().unwrap_or(1);
        let source_file = display_path(path);
        let own_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        // A file's own lines are split into one line-map section per run
        // between `/include` directives, since each include interleaves a
        // whole other file's absolute line range in the middle of this
        // one's. `run_start_rel`/`offset` describe the run currently being
        // emitted; `walk_tokens` flushes and restarts one at each include.
        let mut run_start_rel = 1usize;
        let mut offset = self.absolute_cursor as i64 - run_start_rel as i64;
        self.walk_tokens(&tokens, path, &own_dir, &source_file, &mut run_start_rel, &mut offset)?;
        self.flush_run(&source_file, run_start_rel, local_line_count, offset);

        self.include_stack.pop();
        Ok(())
    }

    /// Records the line-map section for one contiguous run of `source_file`'s
    /// own lines and advances `absolute_cursor` past it. A no-op if the run
    /// is empty (e.g. a file that ends on its own final `/include` line).
    fn flush_run(&mut self, source_file: &str, run_start_rel: usize, run_end_rel: usize, offset: i64) {
        if run_end_rel < run_start_rel {
            return;
        }
        let absolute_start = (run_start_rel as i64 + offset) as usize;
        let absolute_end = (run_end_rel as i64 + offset) as usize;
        self.line_map
            .add_section(absolute_start, absolute_end, run_start_rel, run_end_rel, source_file.to_string());
        self.absolute_cursor = absolute_end + 1;
    }

    /// Drives the token-class state machine for one file's already-tokenized
    /// contents: passes regular content through, blanks comments, resolves
    /// `/include`, and diverts `A2ML`/`IF_DATA` regions to their own stores.
    ///
    /// `run_start_rel`/`offset` track the current line-map run (see
    /// [`Builder::flush_run`]); an `/include` flushes the run seen so far,
    /// recurses into the included file, then starts a fresh run (with a
    /// fresh offset, since `absolute_cursor` has moved past the included
    /// file's own range) for whatever follows in this file.
    fn walk_tokens(
        &mut self,
        tokens: &[Token],
        path: &Path,
        own_dir: &Path,
        source_file: &str,
        run_start_rel: &mut usize,
        offset: &mut i64,
    ) -> Result<(), PreprocessorError> {
        let mut i = 0usize;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.class {
                TokenClass::Comment => {
                    self.push_stored(TokenClass::Comment, token.span.shifted(*offset), blank(&token.bytes));
                    i += 1;
                }
                TokenClass::Regular if token.bytes == b"/include" => {
                    let (name_tok, next_i) = self.next_significant(tokens, i + 1);
                    let Some(name_tok) = name_tok else {
                        return Err(PreprocessorError::IncludeNotFound {
                            file: source_file.to_string(),
                            line: token.span.start_line,
                            col: token.span.start_col,
                            name: String::new(),
                        });
                    };
                    let name = name_tok.text_lossy();
                    let resolved = self.resolve_include(&name, own_dir).ok_or_else(|| {
                        PreprocessorError::IncludeNotFound {
                            file: source_file.to_string(),
                            line: token.span.start_line,
                            col: token.span.start_col,
                            name: name.clone(),
                        }
                    })?;
                    debug!("resolved /include \"{}\" -> {}", name, resolved.display());

                    let run_end_rel = token.span.start_line.saturating_sub(1);
                    self.flush_run(source_file, *run_start_rel, run_end_rel, *offset);

                    self.process_file(&resolved)?;

                    *run_start_rel = token.span.start_line;
                    *offset = self.absolute_cursor as i64 - *run_start_rel as i64;
                    i = next_i;
                }
                TokenClass::Regular if token.bytes == b"/begin" => {
                    let (kw_tok, after_kw) = self.next_significant(tokens, i + 1);
                    match kw_tok.map(|t| t.bytes.as_slice()) {
                        Some(b"A2ML") => {
                            i = self.consume_a2ml_block(tokens, i, after_kw, *offset, path)?;
                        }
                        Some(b"IF_DATA") => {
                            i = self.consume_if_data_block(tokens, i, after_kw, *offset, path)?;
                        }
                        _ => {
                            self.push_stored(token.class, token.span.shifted(*offset), token.bytes.clone());
                            i += 1;
                        }
                    }
                }
                _ => {
                    self.push_stored(token.class, token.span.shifted(*offset), token.bytes.clone());
                    i += 1;
                }
            }
        }
        Ok(())
    }

    fn push_stored(&mut self, class: TokenClass, span: Span, bytes: Vec<u8>) {
        self.tokens.push(StoredToken {
            token_type_id: class.as_u8(),
            span,
            payload: bytes,
        });
    }

    fn next_significant<'t>(&self, tokens: &'t [Token], from: usize) -> (Option<&'t Token>, usize) {
        let mut i = from;
        while i < tokens.len() && tokens[i].class.is_skippable() {
            i += 1;
        }
        if i < tokens.len() {
            (Some(&tokens[i]), i + 1)
        } else {
            (None, i)
        }
    }

    fn resolve_include(&self, name: &str, own_dir: &Path) -> Option<PathBuf> {
        let bare = name.trim_matches('"');
        let candidates = std::iter::once(PathBuf::from(bare))
            .chain(std::iter::once(own_dir.join(bare)))
            .chain(self.config.include_path.iter().map(|dir| dir.join(bare)));
        candidates.find(|p| p.is_file())
    }

    /// Copies the `/begin A2ML ... /end A2ML` region verbatim into the AML
    /// blob (comments blanked inside it unless `suppress_comments` is
    /// false), while the A2L stream keeps only the delimiter tokens and
    /// blanks everything between them.
    fn consume_a2ml_block(
        &mut self,
        tokens: &[Token],
        begin_idx: usize,
        kw_idx: usize,
        offset: i64,
        path: &Path,
    ) -> Result<usize, PreprocessorError> {
        let begin_tok = &tokens[begin_idx];
        self.push_stored(begin_tok.class, begin_tok.span.shifted(offset), begin_tok.bytes.clone());
        for t in &tokens[begin_idx + 1..kw_idx - 1] {
            self.push_stored(t.class, t.span.shifted(offset), blank(&t.bytes));
        }
        let kw_tok = &tokens[kw_idx - 1];
        self.push_stored(kw_tok.class, kw_tok.span.shifted(offset), kw_tok.bytes.clone());

        self.aml_blob.push_str(&begin_tok.text_lossy());
        for t in &tokens[begin_idx + 1..kw_idx - 1] {
            self.aml_blob.push_str(&t.text_lossy());
        }
        self.aml_blob.push_str(&kw_tok.text_lossy());

        let mut i = kw_idx;
        loop {
            if i >= tokens.len() {
                return Err(PreprocessorError::UnterminatedBlock {
                    file: display_path(path),
                    line: begin_tok.span.start_line,
                    col: begin_tok.span.start_col,
                    keyword: "A2ML",
                });
            }
            let t = &tokens[i];
            if t.class == TokenClass::Regular && t.bytes == b"/end" {
                let (after, next_i) = self.next_significant(tokens, i + 1);
                if after.map(|t| t.bytes.as_slice()) == Some(b"A2ML") {
                    for skip in &tokens[i + 1..next_i - 1] {
                        self.push_stored(skip.class, skip.span.shifted(offset), blank(&skip.bytes));
                        self.aml_blob.push_str(&skip.text_lossy());
                    }
                    self.push_stored(t.class, t.span.shifted(offset), t.bytes.clone());
                    let end_kw = &tokens[next_i - 1];
                    self.push_stored(end_kw.class, end_kw.span.shifted(offset), end_kw.bytes.clone());
                    self.aml_blob.push_str(&t.text_lossy());
                    self.aml_blob.push_str(&end_kw.text_lossy());
                    return Ok(next_i);
                }
            }
            let payload = if t.class == TokenClass::Comment && self.config.suppress_comments {
                blank(&t.bytes)
            } else {
                t.bytes.clone()
            };
            self.push_stored(t.class, t.span.shifted(offset), blank(&t.bytes));
            self.aml_blob.push_str(&String::from_utf8_lossy(&payload));
            i += 1;
        }
    }

    /// Copies the `/begin IF_DATA <name> ... /end IF_DATA` body into the
    /// IF_DATA store keyed by the `/begin` token's position, and blanks the
    /// body in the A2L stream while keeping the delimiter tokens verbatim.
    fn consume_if_data_block(
        &mut self,
        tokens: &[Token],
        begin_idx: usize,
        kw_idx: usize,
        offset: i64,
        path: &Path,
    ) -> Result<usize, PreprocessorError> {
        let begin_tok = &tokens[begin_idx];
        let begin_span = begin_tok.span.shifted(offset);
        self.push_stored(begin_tok.class, begin_span, begin_tok.bytes.clone());
        for t in &tokens[begin_idx + 1..kw_idx - 1] {
            self.push_stored(t.class, t.span.shifted(offset), t.bytes.clone());
        }
        let kw_tok = &tokens[kw_idx - 1];
        self.push_stored(kw_tok.class, kw_tok.span.shifted(offset), kw_tok.bytes.clone());

        let (name_tok, after_name) = self.next_significant(tokens, kw_idx);
        if name_tok.is_none() {
            return Err(PreprocessorError::UnterminatedBlock {
                file: display_path(path),
                line: begin_tok.span.start_line,
                col: begin_tok.span.start_col,
                keyword: "IF_DATA",
            });
        }
        for t in &tokens[kw_idx..after_name] {
            self.push_stored(t.class, t.span.shifted(offset), t.bytes.clone());
        }

        let mut payload = Vec::new();
        let mut i = after_name;
        loop {
            if i >= tokens.len() {
                return Err(PreprocessorError::UnterminatedBlock {
                    file: display_path(path),
                    line: begin_tok.span.start_line,
                    col: begin_tok.span.start_col,
                    keyword: "IF_DATA",
                });
            }
            let t = &tokens[i];
            if t.class == TokenClass::Regular && t.bytes == b"/end" {
                let (after, next_i) = self.next_significant(tokens, i + 1);
                if after.map(|t| t.bytes.as_slice()) == Some(b"IF_DATA") {
                    self.if_data.append(begin_span, &payload).map_err(PreprocessorError::Io)?;
                    self.push_stored(t.class, t.span.shifted(offset), t.bytes.clone());
                    let end_kw = &tokens[next_i - 1];
                    self.push_stored(end_kw.class, end_kw.span.shifted(offset), end_kw.bytes.clone());
                    return Ok(next_i);
                }
            }
            payload.extend_from_slice(&t.bytes);
            self.push_stored(t.class, t.span.shifted(offset), blank(&t.bytes));
            i += 1;
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".a2l").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn plain_file_round_trips_into_the_token_store() {
        let file = write_temp("ASAP2_VERSION 1 60\n");
        let config = ParserConfig::default();
        let pre = Preprocessor::new(&config);
        let mut result = pre.process(file.path()).unwrap();
        let tokens = result.tokens.read_all().unwrap();
        let text: String = tokens
            .iter()
            .map(|t| String::from_utf8_lossy(&t.payload).into_owned())
            .collect();
        assert_eq!(text, "ASAP2_VERSION 1 60\n");
    }

    #[test]
    fn comments_are_blanked_to_equal_length_whitespace() {
        let file = write_temp("A /* c */ B\n");
        let config = ParserConfig::default();
        let pre = Preprocessor::new(&config);
        let mut result = pre.process(file.path()).unwrap();
        let tokens = result.tokens.read_all().unwrap();
        let text: String = tokens
            .iter()
            .map(|t| String::from_utf8_lossy(&t.payload).into_owned())
            .collect();
        assert_eq!(text, "A          B\n");
    }

    #[test]
    fn a2ml_block_is_captured_in_the_blob_and_blanked_in_the_stream() {
        let file = write_temp("/begin A2ML struct X { int; }; /end A2ML\n");
        let config = ParserConfig::default();
        let pre = Preprocessor::new(&config);
        let mut result = pre.process(file.path()).unwrap();
        let blob = result.aml_blob.read().unwrap();
        assert!(blob.starts_with("/begin A2ML"));
        assert!(blob.ends_with("/end A2ML"));

        let tokens = result.tokens.read_all().unwrap();
        let text: String = tokens
            .iter()
            .map(|t| String::from_utf8_lossy(&t.payload).into_owned())
            .collect();
        assert!(text.starts_with("/begin A2ML"));
        assert!(text.ends_with("/end A2ML\n"));
        assert!(!text.contains("struct"));
    }

    #[test]
    fn included_file_gets_its_own_non_overlapping_line_map_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inner.a2l"), "INNER1\nINNER2\n").unwrap();
        let outer_path = dir.path().join("outer.a2l");
        std::fs::write(&outer_path, "OUTER1\n/include \"inner.a2l\"\nOUTER2\n").unwrap();

        let config = ParserConfig::default();
        let pre = Preprocessor::new(&config);
        let mut result = pre.process(&outer_path).unwrap();
        let tokens = result.tokens.read_all().unwrap();

        // Every distinct-content token resolves back to the file that
        // actually contributed it, at that file's own original line.
        let find = |name: &str| {
            tokens
                .iter()
                .find(|t| t.payload == name.as_bytes())
                .unwrap_or_else(|| panic!("no token with payload {:?}", name))
        };
        let (file, line) = result.line_map.lookup(find("OUTER1").span.start_line).unwrap();
        assert!(file.ends_with("outer.a2l"));
        assert_eq!(line, 1);
        let (file, line) = result.line_map.lookup(find("OUTER2").span.start_line).unwrap();
        assert!(file.ends_with("outer.a2l"));
        assert_eq!(line, 3);
        let (file, line) = result.line_map.lookup(find("INNER1").span.start_line).unwrap();
        assert!(file.ends_with("inner.a2l"));
        assert_eq!(line, 1);
        let (file, line) = result.line_map.lookup(find("INNER2").span.start_line).unwrap();
        assert!(file.ends_with("inner.a2l"));
        assert_eq!(line, 2);

        // No two sections claim the same absolute line.
        let json = serde_json::to_value(&result.line_map).unwrap();
        let sections = json["sections"].as_array().unwrap();
        for pair in sections.windows(2) {
            let prev_end = pair[0]["absolute_end"].as_u64().unwrap();
            let next_start = pair[1]["absolute_start"].as_u64().unwrap();
            assert!(prev_end < next_start);
        }
    }

    #[test]
    fn if_data_body_is_stored_and_blanked_in_the_stream() {
        let file = write_temp("/begin IF_DATA XCP some payload here /end IF_DATA\n");
        let config = ParserConfig::default();
        let pre = Preprocessor::new(&config);
        let mut result = pre.process(file.path()).unwrap();
        let tokens = result.tokens.read_all().unwrap();
        let text: String = tokens
            .iter()
            .map(|t| String::from_utf8_lossy(&t.payload).into_owned())
            .collect();
        assert!(text.starts_with("/begin IF_DATA XCP"));
        assert!(text.ends_with("/end IF_DATA\n"));
        assert!(!text.contains("payload"));
        assert_eq!(result.if_data.len(), 1);
    }
}
