//! Document boundary types.
//!
//! Parsing and subject-grouping of RDF tuples happen upstream; this module
//! only defines what a delivered document looks like: a resolved integer id
//! plus one token stream per index field. Documents that failed upstream
//! parsing are signaled in-band via a sentinel subject URI rather than an
//! error, so a bad record never aborts a partition.

use std::io::BufRead;

use log::warn;

use crate::error::{LunariaError, Result};
use crate::hash::ResourceHash;

/// Sentinel subject URI marking a document that failed upstream parsing.
pub const FAILED_PARSE_SUBJECT: &str = "@FAILED_PARSE@";

/// One parsed document: a resolved subject id and per-field token streams.
#[derive(Debug, Clone)]
pub struct Document {
    subject: String,
    id: u32,
    fields: Vec<Vec<String>>,
}

impl Document {
    /// Create a document with the given resolved id and per-field tokens.
    pub fn new(subject: String, id: u32, fields: Vec<Vec<String>>) -> Self {
        Document {
            subject,
            id,
            fields,
        }
    }

    /// Create the sentinel document representing an upstream parse failure.
    pub fn failed_parse() -> Self {
        Document {
            subject: FAILED_PARSE_SUBJECT.to_string(),
            id: 0,
            fields: Vec::new(),
        }
    }

    /// Whether this document is the parse-failure sentinel.
    pub fn is_parse_failure(&self) -> bool {
        self.subject == FAILED_PARSE_SUBJECT
    }

    /// The subject URI.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The resolved document id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of fields this document carries content for.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The tokens of one field, in occurrence order. Fields beyond the
    /// document's content are empty.
    pub fn tokens(&self, field: usize) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A sequence of documents delivered by the external document factory.
pub trait DocumentSource {
    /// Produce the next document, or `None` at end of input.
    fn next_document(&mut self) -> Result<Option<Document>>;
}

/// Document source over tab-separated pre-tokenized records.
///
/// Each line is `subject \t field-0 text \t field-1 text \t ...` with field
/// text tokenized on whitespace. Terms are lowercased (the recorded term
/// processor). The subject is resolved through the resource hash; a subject
/// missing from the hash is a fatal error since it means the hash was built
/// from different input. Lines with no subject column yield the
/// parse-failure sentinel.
pub struct TsvDocumentSource<'a, R: BufRead> {
    input: R,
    hash: &'a ResourceHash,
    field_count: usize,
    line: String,
}

impl<'a, R: BufRead> TsvDocumentSource<'a, R> {
    pub fn new(input: R, hash: &'a ResourceHash, field_count: usize) -> Self {
        TsvDocumentSource {
            input,
            hash,
            field_count,
            line: String::new(),
        }
    }
}

impl<R: BufRead> DocumentSource for TsvDocumentSource<'_, R> {
    fn next_document(&mut self) -> Result<Option<Document>> {
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            let mut columns = line.split('\t');
            let subject = match columns.next() {
                Some(s) if !s.is_empty() => s,
                _ => {
                    warn!("record without subject");
                    return Ok(Some(Document::failed_parse()));
                }
            };

            let id = match self.hash.get(subject) {
                Some(id) => id as u32,
                None => {
                    return Err(LunariaError::resolution(subject.to_string()));
                }
            };

            let mut fields = Vec::with_capacity(self.field_count);
            for column in columns.by_ref().take(self.field_count) {
                let tokens = column
                    .split_whitespace()
                    .map(|t| t.to_lowercase())
                    .collect();
                fields.push(tokens);
            }
            fields.resize(self.field_count, Vec::new());

            return Ok(Some(Document::new(subject.to_string(), id, fields)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst::MapBuilder;
    use std::io::{Cursor, Write};

    fn hash_file(entries: &[(&str, u64)]) -> tempfile::NamedTempFile {
        let mut sorted = entries.to_vec();
        sorted.sort();
        let mut builder = MapBuilder::memory();
        for (key, id) in sorted {
            builder.insert(key, id).unwrap();
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&builder.into_inner().unwrap()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_tsv_source() {
        let file = hash_file(&[("http://ex.org/s1", 3), ("http://ex.org/s2", 4)]);
        let hash = ResourceHash::open(file.path()).unwrap();

        let input = "http://ex.org/s1\tHello World\tgreeting\n\
                     http://ex.org/s2\tworld\t\n";
        let mut source = TsvDocumentSource::new(Cursor::new(input), &hash, 2);

        let doc = source.next_document().unwrap().unwrap();
        assert_eq!(doc.id(), 3);
        assert_eq!(doc.tokens(0), ["hello", "world"]);
        assert_eq!(doc.tokens(1), ["greeting"]);

        let doc = source.next_document().unwrap().unwrap();
        assert_eq!(doc.id(), 4);
        assert_eq!(doc.tokens(0), ["world"]);
        assert!(doc.tokens(1).is_empty());

        assert!(source.next_document().unwrap().is_none());
    }

    #[test]
    fn test_unresolved_subject_is_fatal() {
        let file = hash_file(&[("http://ex.org/s1", 0)]);
        let hash = ResourceHash::open(file.path()).unwrap();

        let mut source = TsvDocumentSource::new(Cursor::new("http://ex.org/other\tx\n"), &hash, 1);
        let err = source.next_document().unwrap_err();
        assert!(matches!(err, LunariaError::Resolution(_)));
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let file = hash_file(&[("http://ex.org/s1", 0)]);
        let hash = ResourceHash::open(file.path()).unwrap();

        let mut source = TsvDocumentSource::new(Cursor::new("http://ex.org/s1\n"), &hash, 3);
        let doc = source.next_document().unwrap().unwrap();
        assert_eq!(doc.field_count(), 3);
        assert!(doc.tokens(0).is_empty());
        assert!(doc.tokens(2).is_empty());
    }
}
