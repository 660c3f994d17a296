//! SeqXRef Ingest - UniProt cross-reference fetch tool

use anyhow::{bail, Context, Result};
use clap::Parser;
use seqxref_common::logging::{init_logging, LogConfig, LogLevel};
use seqxref_common::store::{DataFormat, DataStore};
use seqxref_ingest::download::{file_name, FileFetcher};
use seqxref_ingest::uniprot::matching::search_id;
use seqxref_ingest::uniprot::{
    reformat, FetchOptions, ReferenceCache, ReferenceTable, UniProtConfig, UniProtFetcher,
    UniProtReader, VariantRegistry, DEFAULT_LOOKUP_SOURCE, EXCHANGE_FORMAT,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "seqxref-ingest")]
#[command(author, version, about = "UniProt cross-reference fetch tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Fetch UniProt entries and build the match index
    Fetch {
        /// Accessions, optionally isoform-suffixed (e.g. P42284-3)
        ids: Vec<String>,

        /// File with one accession per line
        #[arg(long)]
        id_file: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./data/uniprot")]
        output: PathBuf,

        /// Accessions per request
        #[arg(long, env = "SEQXREF_MAX_CHUNK_SIZE")]
        chunk_size: Option<usize>,

        /// Skip the primary service
        #[arg(long)]
        no_primary: bool,

        /// Do not fall back to the secondary service
        #[arg(long)]
        no_fallback: bool,

        /// Also write exchange-format records
        #[arg(long)]
        exchange: bool,

        /// Write the raw XML responses to this file
        #[arg(long)]
        save_xml: Option<PathBuf>,

        /// Reuse and update a reference cache in the output directory
        #[arg(long)]
        use_cache: bool,
    },

    /// Parse a local UniProt XML file (.gz is decompressed)
    Parse {
        file: PathBuf,

        /// Isoform codes to materialize (e.g. P42284-3)
        #[arg(long = "isoform")]
        isoforms: Vec<String>,

        /// Maximum number of entries to read
        #[arg(long)]
        limit: Option<usize>,

        /// Output directory
        #[arg(short, long, default_value = "./data/uniprot")]
        output: PathBuf,

        /// Also write exchange-format records
        #[arg(long)]
        exchange: bool,
    },

    /// Fetch sequences only
    Sequences {
        ids: Vec<String>,

        /// Output file (JSON); printed as FASTA when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map identifiers from another database to UniProtKB accessions
    Lookup {
        items: Vec<String>,

        /// Source database
        #[arg(long, default_value = DEFAULT_LOOKUP_SOURCE)]
        from: String,
    },

    /// Find UniProtKB accessions for a gene name
    GeneLookup {
        gene: String,

        /// NCBI taxonomy id
        #[arg(long, default_value_t = 9606)]
        tax_id: i64,

        /// Only reviewed (Swiss-Prot) entries
        #[arg(long)]
        reviewed: bool,
    },

    /// Download a file
    Download {
        url: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("seqxref-ingest")
        .build();

    // Environment settings take precedence when present
    let log_config = if std::env::var("LOG_LEVEL").is_ok() {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };

    init_logging(&log_config)?;

    let config = UniProtConfig::from_env();

    match cli.command {
        Command::Fetch {
            ids,
            id_file,
            output,
            chunk_size,
            no_primary,
            no_fallback,
            exchange,
            save_xml,
            use_cache,
        } => {
            let ids = collect_ids(ids, id_file.as_deref())?;
            let options = FetchOptions::new(chunk_size.unwrap_or(config.max_chunk_size))
                .with_primary(!no_primary)
                .with_fallback(!no_fallback);
            let config = config.with_save_text(save_xml.is_some());
            let mut fetcher = UniProtFetcher::new(config)?;

            info!(ids = ids.len(), "Fetching UniProt entries");
            let (reference, matches) = if use_cache {
                let cache = ReferenceCache::new(output.join("cache").join("reference.json"));
                cache.load_or_fetch(&mut fetcher, &ids, options).await?
            } else {
                fetcher.fetch_list(&ids, options).await?
            };

            let store = DataStore::new();
            export_reference(&store, &output, &reference, exchange)?;
            store.do_export(output.join("match_index.json"), &matches, DataFormat::Json)?;
            if let Some(path) = save_xml {
                fetcher.write_raw_xml(&path)?;
            }

            let unmatched = matches.unmatched();
            if !unmatched.is_empty() {
                warn!(ids = ?unmatched, "Unmatched identifiers");
            }
            info!(
                records = reference.len(),
                output = %output.display(),
                "Fetch complete"
            );
        },
        Command::Parse {
            file,
            isoforms,
            limit,
            output,
            exchange,
        } => {
            let mut variants = VariantRegistry::new();
            for isoform in &isoforms {
                let parent = search_id(isoform);
                if parent != isoform.as_str() {
                    variants.register_variant(isoform, parent);
                }
            }
            let reader = limit.map_or_else(UniProtReader::new, UniProtReader::with_limit);
            let reference = reader
                .read_file(&file, &variants)
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            export_reference(&DataStore::new(), &output, &reference, exchange)?;
            info!(
                records = reference.len(),
                output = %output.display(),
                "Parse complete"
            );
        },
        Command::Sequences { ids, output } => {
            let fetcher = UniProtFetcher::new(config)?;
            let (ok, records) = fetcher.fetch_sequence_list(&ids, true, true).await;
            if !ok {
                warn!(
                    missing = ids.len().saturating_sub(records.len()),
                    "Some sequences could not be fetched"
                );
            }
            match output {
                Some(path) => {
                    DataStore::new().do_export(&path, &records, DataFormat::Json)?;
                    info!(records = records.len(), path = %path.display(), "Wrote sequences");
                },
                None => {
                    for (id, record) in &records {
                        println!(">{id}\n{}", record.sequence);
                    }
                },
            }
        },
        Command::Lookup { items, from } => {
            let fetcher = UniProtFetcher::new(config)?;
            for accession in fetcher.do_lookup(&items, &from).await? {
                println!("{accession}");
            }
        },
        Command::GeneLookup {
            gene,
            tax_id,
            reviewed,
        } => {
            let fetcher = UniProtFetcher::new(config)?;
            for accession in fetcher.do_gene_lookup(&gene, tax_id, reviewed).await? {
                println!("{accession}");
            }
        },
        Command::Download { url, output_dir } => {
            let Some(name) = file_name(&url) else {
                bail!("Cannot determine a file name for {}", url);
            };
            if !FileFetcher::new()?.get(&url, output_dir.join(&name)).await {
                bail!("Download of {} failed", url);
            }
        },
    }

    Ok(())
}

/// Write `reference.json` and, when asked, `exchange.json` under `output`
fn export_reference(
    store: &DataStore,
    output: &Path,
    reference: &ReferenceTable,
    exchange: bool,
) -> Result<()> {
    store.do_export(output.join("reference.json"), reference, DataFormat::Json)?;
    if exchange {
        let records = reformat(reference, EXCHANGE_FORMAT);
        store.do_export(output.join("exchange.json"), &records, DataFormat::Json)?;
    }
    Ok(())
}

/// Identifiers from the command line followed by those in `id_file`
fn collect_ids(mut ids: Vec<String>, id_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = id_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read id file {}", path.display()))?;
        ids.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if ids.is_empty() {
        bail!("No identifiers given");
    }
    Ok(ids)
}
