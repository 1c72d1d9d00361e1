use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lunaria::{
    GeneratorConfig, IndexGenerator, IndexingMethod, ResourceHash, TsvDocumentSource,
    index::reader::IndexReader,
};

/// Lunaria - RDF inverted index generator
#[derive(Parser)]
#[command(name = "lunaria", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate indexes from a pre-tokenized document collection.
    Generate(GenerateCommand),
    /// Print the contents of a generated index.
    Inspect(InspectCommand),
}

#[derive(Parser)]
struct GenerateCommand {
    /// Input TSV file: subject, then one tab-separated column per field.
    input: PathBuf,

    /// Output directory. One subdirectory is created per partition.
    output: PathBuf,

    /// Resource hash file mapping resource URIs to ids.
    #[arg(long)]
    resource_hash: PathBuf,

    /// Total number of documents in the collection.
    #[arg(long)]
    num_documents: u64,

    /// Indexing method: horizontal or vertical.
    #[arg(long, default_value = "horizontal")]
    method: IndexingMethod,

    /// File listing the predicates to index, one URI per line.
    /// Required in vertical mode.
    #[arg(long)]
    predicates: Option<PathBuf>,

    /// Number of worker partitions.
    #[arg(long, default_value_t = 1)]
    partitions: usize,

    /// Maximum number of documents per posting list.
    #[arg(long)]
    max_posting_list_size: Option<usize>,

    /// Maximum number of positions per document.
    #[arg(long)]
    max_position_list_size: Option<usize>,

    /// Documents per skip block.
    #[arg(long)]
    skip_quantum: Option<u32>,

    /// Skip tree height.
    #[arg(long)]
    skip_height: Option<u32>,
}

#[derive(Parser)]
struct InspectCommand {
    /// Directory holding the index file set (a partition directory).
    dir: PathBuf,

    /// Field name of the index to inspect.
    name: String,

    /// Also print every term's postings.
    #[arg(long)]
    postings: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(cmd) => generate(cmd),
        Command::Inspect(cmd) => inspect(cmd),
    }
}

fn generate(cmd: GenerateCommand) -> Result<()> {
    let defaults = GeneratorConfig::default();
    let config = GeneratorConfig {
        method: cmd.method,
        num_documents: cmd.num_documents,
        max_posting_list_size: cmd
            .max_posting_list_size
            .unwrap_or(defaults.max_posting_list_size),
        max_position_list_size: cmd
            .max_position_list_size
            .unwrap_or(defaults.max_position_list_size),
        skip_quantum: cmd.skip_quantum.unwrap_or(defaults.skip_quantum),
        skip_height: cmd.skip_height.unwrap_or(defaults.skip_height),
        partitions: cmd.partitions,
    };

    let predicates = match &cmd.predicates {
        Some(path) => Some(read_predicates(path)?),
        None => None,
    };
    let fields = config.resolve_fields(predicates.as_deref())?;

    let hash = ResourceHash::open(&cmd.resource_hash).with_context(|| {
        format!("Failed to open resource hash {}", cmd.resource_hash.display())
    })?;
    let input = BufReader::new(
        File::open(&cmd.input)
            .with_context(|| format!("Failed to open input {}", cmd.input.display()))?,
    );
    let source = TsvDocumentSource::new(input, &hash, fields.len());

    let generator = IndexGenerator::new(config, fields)?;
    let hash_for_alignment = match cmd.method {
        IndexingMethod::Vertical => Some(&hash),
        IndexingMethod::Horizontal => None,
    };
    let counters = generator.run(source, hash_for_alignment, &cmd.output)?;

    println!("{}", serde_json::to_string_pretty(&counters)?);
    Ok(())
}

fn read_predicates(path: &PathBuf) -> Result<Vec<String>> {
    let file = BufReader::new(
        File::open(path)
            .with_context(|| format!("Failed to open predicates file {}", path.display()))?,
    );
    let mut predicates = Vec::new();
    for line in file.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            predicates.push(line.to_string());
        }
    }
    Ok(predicates)
}

fn inspect(cmd: InspectCommand) -> Result<()> {
    let reader = IndexReader::open(&cmd.dir, &cmd.name)
        .with_context(|| format!("Failed to open index '{}'", cmd.name))?;

    let properties = reader.properties();
    println!("field:       {}", properties.field);
    println!("documents:   {}", properties.documents);
    println!("terms:       {}", properties.terms);
    println!("postings:    {}", properties.postings);
    println!("occurrences: {}", properties.occurrences);
    println!("positions:   {}", properties.has_positions);

    if cmd.postings {
        for (rank, term) in reader.terms().iter().enumerate() {
            let postings = reader.postings_at(rank);
            print!("{term} ({})", postings.frequency);
            for document in &postings.documents {
                if properties.has_positions {
                    print!(
                        " {}:{}",
                        document.doc,
                        document
                            .positions
                            .iter()
                            .map(u32::to_string)
                            .collect::<Vec<_>>()
                            .join(",")
                    );
                } else {
                    print!(" {}", document.doc);
                }
            }
            println!();
        }
    }
    Ok(())
}
