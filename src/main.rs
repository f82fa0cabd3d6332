use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use citation_graph::config::{find_config_file, get_config, load_config, Config};
use citation_graph::models::{CitationMap, ConversionResult, IdType, LinkDirection, Metadata};
use citation_graph::{build_linked_authors, LinkedAuthors, PmcSource, Source};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Citation Graph - convert PubMed Central ids, follow citations and link authors
#[derive(Parser, Debug)]
#[command(name = "citation-graph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert PubMed Central ids, follow citation links and link authors", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Contact email sent to NCBI (overrides the configuration)
    #[arg(long, global = true, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// Tool name sent to NCBI (overrides the configuration)
    #[arg(long, global = true)]
    tool: Option<String>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// JSON (machine-readable)
    Json,
    /// Tab-separated plain text
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert ids to another scheme
    Convert {
        /// Ids to convert (any scheme, the service detects it)
        #[arg(required = true)]
        ids: Vec<String>,

        /// Target scheme: pmcid, pmid, mid or doi
        #[arg(long, short)]
        to: IdType,
    },

    /// Fetch citation links for PMIDs
    Citations {
        /// PMIDs to look up
        #[arg(required = true)]
        ids: Vec<String>,

        /// citing (papers citing these) or cited_by (papers these cite)
        #[arg(long, short, default_value = "citing")]
        direction: LinkDirection,
    },

    /// Fetch metadata for one PMC id
    Metadata {
        /// PMC id, with or without the PMC prefix
        id: String,
    },

    /// Link each paper's authors to the authors of the papers it cites
    LinkedAuthors {
        /// File with one PMC id per line
        #[arg(long, short)]
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citation_graph={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(&cli)?;

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = PmcSource::new(&config)?;

    tokio::select! {
        result = run(cli.command, &source, cli.output) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, abandoning outstanding requests");
            std::process::exit(130);
        }
    }
}

/// Load the configuration file (explicit or discovered) and apply CLI overrides
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        load_config(path).with_context(|| format!("loading {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        load_config(&path).with_context(|| format!("loading {}", path.display()))?
    } else {
        get_config()?
    };

    if let Some(email) = &cli.email {
        config.client.email = Some(email.clone());
    }
    if let Some(tool) = &cli.tool {
        config.client.tool = tool.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.client.request_timeout_secs = timeout;
    }

    Ok(config)
}

async fn run(command: Commands, source: &dyn Source, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Convert { ids, to } => {
            let converted = source.convert(&ids, to).await?;
            output_conversions(&ids, &converted, format)
        }
        Commands::Citations { ids, direction } => {
            let links = source.get_citations(&ids, direction).await?;
            output_citations(&ids, &links, format)
        }
        Commands::Metadata { id } => {
            let metadata = source.get_metadata(&id).await?;
            output_metadata(&metadata, format)
        }
        Commands::LinkedAuthors { input, save } => {
            let ids = read_ids(&input)?;
            let linked = build_linked_authors(source, &ids).await?;
            match save {
                Some(path) => {
                    std::fs::write(&path, serde_json::to_string_pretty(&linked)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Wrote {} records to {}", linked.len(), path.display());
                    Ok(())
                }
                None => output_linked(&linked, format),
            }
        }
        Commands::Config => Ok(()),
    }
}

/// One id per line; blank lines are ignored
fn read_ids(path: &Path) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_ids(&content))
}

fn parse_ids(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn output_conversions(ids: &[String], converted: &ConversionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let sorted: BTreeMap<_, _> = converted.iter().collect();
            println!("{}", serde_json::to_string_pretty(&sorted)?);
        }
        OutputFormat::Plain => {
            for id in ids {
                if let Some(to) = converted.get(id) {
                    println!("{}\t{}", id, to);
                }
            }
        }
    }
    Ok(())
}

fn output_citations(ids: &[String], links: &CitationMap, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let sorted: BTreeMap<_, _> = links.iter().collect();
            println!("{}", serde_json::to_string_pretty(&sorted)?);
        }
        OutputFormat::Plain => {
            for id in ids {
                let linked = links.get(id).map(|l| l.join(",")).unwrap_or_default();
                println!("{}\t{}", id, linked);
            }
        }
    }
    Ok(())
}

fn output_metadata(metadata: &Metadata, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(metadata)?),
        OutputFormat::Plain => {
            for (name, value) in metadata.iter() {
                println!("{}\t{}", name, value.values().join("; "));
            }
        }
    }
    Ok(())
}

fn output_linked(linked: &[LinkedAuthors], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(linked)?),
        OutputFormat::Plain => {
            for record in linked {
                println!(
                    "{}\t{}\t{}",
                    record.paper_id,
                    record.authors.join("; "),
                    record.cited_authors.join("; ")
                );
            }
        }
    }
    Ok(())
}
