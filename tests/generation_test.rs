use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;

use fst::MapBuilder;

use lunaria::index::reader::IndexReader;
use lunaria::{
    GeneratorConfig, IndexGenerator, IndexingMethod, ResourceHash, Result, TsvDocumentSource,
};

fn write_hash(path: &Path, entries: &[(&str, u64)]) {
    let mut sorted = entries.to_vec();
    sorted.sort();
    let mut builder = MapBuilder::memory();
    for (key, id) in sorted {
        builder.insert(key, id).unwrap();
    }
    let mut file = File::create(path).unwrap();
    file.write_all(&builder.into_inner().unwrap()).unwrap();
}

fn run_horizontal(input: &str, hash_entries: &[(&str, u64)], output: &Path) -> Result<()> {
    let work = tempfile::tempdir().unwrap();
    let hash_path = work.path().join("resources.fst");
    write_hash(&hash_path, hash_entries);
    let hash = ResourceHash::open(&hash_path)?;

    let config = GeneratorConfig {
        num_documents: hash_entries.len() as u64,
        ..Default::default()
    };
    let fields = config.resolve_fields(None)?;
    let field_count = fields.len();
    let generator = IndexGenerator::new(config, fields)?;
    let source = TsvDocumentSource::new(BufReader::new(input.as_bytes()), &hash, field_count);
    generator.run(source, None, output)?;
    Ok(())
}

#[test]
fn test_horizontal_end_to_end() -> Result<()> {
    let out = tempfile::tempdir().unwrap();
    let input = "http://ex.org/s0\tthe red fox\tlabel\tctx\thttp uri\n\
                 http://ex.org/s1\tred\tlabel name\t\t\n\
                 http://ex.org/s2\tfox red fox\t\t\t\n";
    run_horizontal(
        input,
        &[
            ("http://ex.org/s0", 0),
            ("http://ex.org/s1", 1),
            ("http://ex.org/s2", 2),
        ],
        out.path(),
    )?;

    let partition = out.path().join("partition-00000");
    let token = IndexReader::open(&partition, "token")?;
    assert_eq!(token.terms(), ["fox", "red", "the"]);

    let red = token.postings("red").unwrap();
    assert_eq!(red.frequency, 3);
    assert_eq!(red.documents[0].doc, 0);
    assert_eq!(red.documents[0].positions, vec![1]);
    assert_eq!(red.documents[2].doc, 2);
    assert_eq!(red.documents[2].positions, vec![1]);

    let fox = token.postings("fox").unwrap();
    assert_eq!(fox.frequency, 2);
    assert_eq!(fox.documents[1].positions, vec![0, 2]);

    // The parallel fields are separate indexes with their own term spaces.
    let property = IndexReader::open(&partition, "property")?;
    assert_eq!(property.terms(), ["label", "name"]);
    assert_eq!(property.postings("label").unwrap().frequency, 2);

    let properties = token.properties();
    assert_eq!(properties.documents, 3);
    assert_eq!(properties.occurrences, 7);
    assert!(properties.has_positions);

    for field in ["token", "property", "context", "uri"] {
        for extension in ["index", "terms", "offsets", "posnumbits", "properties"] {
            assert!(
                partition.join(format!("{field}.{extension}")).exists(),
                "missing {field}.{extension}"
            );
        }
    }
    Ok(())
}

#[test]
fn test_generation_is_deterministic() -> Result<()> {
    let input = "http://ex.org/s0\tcat dog cat bird\tx y\tz\t\n\
                 http://ex.org/s1\tdog emu\ty\t\t\n";
    let entries = [("http://ex.org/s0", 0), ("http://ex.org/s1", 1)];

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    run_horizontal(input, &entries, first.path())?;
    run_horizontal(input, &entries, second.path())?;

    let partition = Path::new("partition-00000");
    let mut names: Vec<_> = fs::read_dir(first.path().join(partition))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    names.sort();
    assert!(!names.is_empty());

    for name in names {
        let a = fs::read(first.path().join(partition).join(&name)).unwrap();
        let b = fs::read(second.path().join(partition).join(&name)).unwrap();
        assert_eq!(a, b, "file {name:?} differs between runs");
    }
    Ok(())
}

#[test]
fn test_vertical_end_to_end() -> Result<()> {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let predicates = vec![
        "http://ex.org/name".to_string(),
        "http://ex.org/desc".to_string(),
    ];
    let hash_path = work.path().join("resources.fst");
    write_hash(
        &hash_path,
        &[
            ("http://ex.org/desc", 21),
            ("http://ex.org/name", 20),
            ("http://ex.org/s0", 0),
            ("http://ex.org/s1", 1),
        ],
    );
    let hash = ResourceHash::open(&hash_path)?;

    let config = GeneratorConfig {
        method: IndexingMethod::Vertical,
        num_documents: 2,
        ..Default::default()
    };
    let fields = config.resolve_fields(Some(&predicates))?;
    let field_count = fields.len();
    let generator = IndexGenerator::new(config, fields)?;

    let input = "http://ex.org/s0\talpha beta\talpha\n\
                 http://ex.org/s1\tbeta\t\n";
    let source = TsvDocumentSource::new(BufReader::new(input.as_bytes()), &hash, field_count);
    let counters = generator.run(source, Some(&hash), out.path())?;
    assert_eq!(counters.documents, 2);
    assert_eq!(counters.unresolved_predicates, 0);

    let partition = out.path().join("partition-00000");
    let name = IndexReader::open(&partition, "http_ex_org_name")?;
    assert_eq!(name.terms(), ["alpha", "beta"]);
    assert_eq!(name.postings("beta").unwrap().frequency, 2);

    // Alignment index: terms map to predicate ids, frequency only.
    let alignment = IndexReader::open(&partition, "alignment")?;
    assert!(!alignment.properties().has_positions);
    let alpha = alignment.postings("alpha").unwrap();
    assert_eq!(alpha.frequency, 2);
    assert_eq!(alpha.documents[0].doc, 20);
    assert_eq!(alpha.documents[1].doc, 21);
    let beta = alignment.postings("beta").unwrap();
    assert_eq!(beta.frequency, 1);
    assert_eq!(beta.documents[0].doc, 20);
    Ok(())
}
