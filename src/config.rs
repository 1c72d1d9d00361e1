//! Index generator configuration.

use serde::Serialize;

use crate::error::{LunariaError, Result};

/// Name of the reserved alignment index produced in vertical mode.
pub const ALIGNMENT_INDEX_NAME: &str = "alignment";

/// Prefix marking a field that must not be indexed.
pub const NOINDEX_PREFIX: &str = "NOINDEX";

/// Default cap on the number of documents written per term.
pub const DEFAULT_MAX_POSTING_LIST_SIZE: usize = 50_000_000;

/// Default cap on the number of positions written per document.
pub const DEFAULT_MAX_POSITION_LIST_SIZE: usize = 1_000_000;

/// How RDF predicates are mapped to index fields.
///
/// Selected once at startup; there is no runtime-extensible strategy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexingMethod {
    /// A small fixed set of parallel fields describing each document as a
    /// flat token stream. No alignment index.
    Horizontal,
    /// One field per selected predicate, plus the reserved alignment index
    /// mapping each term to the set of predicate ids it occurs under.
    Vertical,
}

impl std::str::FromStr for IndexingMethod {
    type Err = LunariaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(IndexingMethod::Horizontal),
            "vertical" => Ok(IndexingMethod::Vertical),
            other => Err(LunariaError::config(format!(
                "indexing method must be 'horizontal' or 'vertical', got '{other}'"
            ))),
        }
    }
}

/// One index field of the chosen strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in output file names (already encoded).
    pub name: String,
    /// Original resource name (predicate URI in vertical mode). Used for
    /// alignment id resolution.
    pub resource: String,
    /// Whether this field is indexed at all.
    pub indexed: bool,
}

/// Configuration for one index generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorConfig {
    /// Indexing strategy.
    pub method: IndexingMethod,

    /// Total number of documents in the collection.
    pub num_documents: u64,

    /// Maximum number of documents written per (term, field).
    pub max_posting_list_size: usize,

    /// Maximum number of positions written per (term, field, document).
    pub max_position_list_size: usize,

    /// Documents per skip block in the posting bitstream.
    pub skip_quantum: u32,

    /// Skip tree height. Bounds the skip table of one term at
    /// `2^skip_height` entries.
    pub skip_height: u32,

    /// Number of worker partitions.
    pub partitions: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            method: IndexingMethod::Horizontal,
            num_documents: 0,
            max_posting_list_size: DEFAULT_MAX_POSTING_LIST_SIZE,
            max_position_list_size: DEFAULT_MAX_POSITION_LIST_SIZE,
            skip_quantum: 64,
            skip_height: 8,
            partitions: 1,
        }
    }
}

impl GeneratorConfig {
    /// Resolve the field set for this configuration.
    ///
    /// Horizontal mode uses the fixed parallel fields; vertical mode derives
    /// one field per entry of `predicates` (required).
    pub fn resolve_fields(&self, predicates: Option<&[String]>) -> Result<Vec<FieldSpec>> {
        match self.method {
            IndexingMethod::Horizontal => Ok(["token", "property", "context", "uri"]
                .iter()
                .map(|name| FieldSpec {
                    name: (*name).to_string(),
                    resource: (*name).to_string(),
                    indexed: true,
                })
                .collect()),
            IndexingMethod::Vertical => {
                let predicates = predicates.ok_or_else(|| {
                    LunariaError::config("vertical indexing requires a predicates list")
                })?;
                if predicates.is_empty() {
                    return Err(LunariaError::config("predicates list is empty"));
                }
                Ok(predicates
                    .iter()
                    .map(|predicate| {
                        let name = encode_field_name(predicate);
                        let indexed = !name.starts_with(NOINDEX_PREFIX);
                        FieldSpec {
                            name,
                            resource: predicate.clone(),
                            indexed,
                        }
                    })
                    .collect())
            }
        }
    }
}

/// Encode a resource name as an index field name.
///
/// Runs of non-alphanumeric characters collapse to a single underscore, so
/// e.g. `http://purl.org/dc/terms/title` becomes `http_purl_org_dc_terms_title`.
pub fn encode_field_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            encoded.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            encoded.push('_');
            last_was_underscore = true;
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "horizontal".parse::<IndexingMethod>().unwrap(),
            IndexingMethod::Horizontal
        );
        assert_eq!(
            "Vertical".parse::<IndexingMethod>().unwrap(),
            IndexingMethod::Vertical
        );
        assert!("diagonal".parse::<IndexingMethod>().is_err());
    }

    #[test]
    fn test_encode_field_name() {
        assert_eq!(
            encode_field_name("http://purl.org/dc/terms/title"),
            "http_purl_org_dc_terms_title"
        );
        assert_eq!(encode_field_name("token"), "token");
        assert_eq!(encode_field_name("a--b"), "a_b");
    }

    #[test]
    fn test_horizontal_fields() {
        let config = GeneratorConfig::default();
        let fields = config.resolve_fields(None).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["token", "property", "context", "uri"]);
        assert!(fields.iter().all(|f| f.indexed));
    }

    #[test]
    fn test_vertical_fields_require_predicates() {
        let config = GeneratorConfig {
            method: IndexingMethod::Vertical,
            ..Default::default()
        };
        assert!(config.resolve_fields(None).is_err());

        let predicates = vec![
            "http://example.org/name".to_string(),
            "NOINDEX_internal".to_string(),
        ];
        let fields = config.resolve_fields(Some(&predicates)).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "http_example_org_name");
        assert!(fields[0].indexed);
        assert!(!fields[1].indexed);
    }
}
