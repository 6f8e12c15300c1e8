//! CLI entry point for the TRACER case engine.
//!
//! Reports and listings go to stdout; logs go to stderr.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tracer_core::config::TracerConfig;
use tracer_core::{CaseId, ElementType, InfoMap, InfoSide, MovementType};
use tracer_engine::prompt::Prompter;
use tracer_engine::report::render_diagram;
use tracer_engine::{CaseEngine, ElementRequest};
use tracer_store::{open_repository, CaseRepository, DefaultRepository};

#[derive(Parser)]
#[command(name = "tracer")]
#[command(about = "Document the network path of a threat during an incident")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: tracer).
    #[arg(short, long, default_value = "tracer", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Open a new case for an initial detection.
    New {
        #[arg(long)]
        threat: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        destination: String,
    },
    /// Add a network element to a case.
    Add {
        case_id: String,
        /// Element type keyword, or other:<label>.
        #[arg(long = "type")]
        element_type: String,
        #[arg(long)]
        name: String,
        /// direct or lateral.
        #[arg(long, default_value = "direct")]
        movement: String,
        /// Insertion point; appends before the destination when omitted.
        #[arg(long)]
        position: Option<usize>,
        /// Source-side entry as key=value (repeatable).
        #[arg(long = "src", value_parser = parse_entry)]
        source_info: Vec<(String, String)>,
        /// Destination-side entry as key=value (repeatable).
        #[arg(long = "dst", value_parser = parse_entry)]
        destination_info: Vec<(String, String)>,
    },
    /// Append an information entry to an existing element.
    Entry {
        case_id: String,
        position: usize,
        /// source or destination.
        #[arg(long, default_value = "source")]
        side: String,
        key: String,
        value: String,
    },
    /// Remove the element at a position.
    Remove { case_id: String, position: usize },
    /// List the current insertion points of a case.
    Points { case_id: String },
    /// Show a case and its path.
    Show { case_id: String },
    /// Classify the path and print the report.
    Report {
        case_id: String,
        /// Print the structured report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a shareable export file.
    Export {
        case_id: String,
        /// Output directory (default: export.dir from config).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List stored cases.
    List,
    /// Show the activity log of a case.
    History { case_id: String },
    /// Show which storage backend is serving calls.
    Status,
    /// Interactive enrichment session.
    Trace {
        /// Continue an existing case instead of starting a new one.
        #[arg(long = "case")]
        case_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();
    let config = TracerConfig::load(&cli.config)?;

    let repo = open_repository(&config.storage).await?;
    let engine = CaseEngine::new(repo).with_pivot_rule(config.analysis.pivot_rule);

    match cli.command {
        Command::New {
            threat,
            source,
            destination,
        } => {
            let case = engine.new_case(&threat, &source, &destination).await?;
            println!("{}", case.case_id);
        }
        Command::Add {
            case_id,
            element_type,
            name,
            movement,
            position,
            source_info,
            destination_info,
        } => {
            let case_id = CaseId::parse(&case_id)?;
            let request = ElementRequest {
                element_type: element_type.parse::<ElementType>()?,
                name,
                movement_type: movement.parse::<MovementType>()?,
                source_info: Some(InfoMap::from_pairs(source_info)?),
                destination_info: Some(InfoMap::from_pairs(destination_info)?),
            };
            let element = request.into_element()?;
            let case = match position {
                Some(position) => engine.add_element(&case_id, position, element).await?,
                None => engine.append_element(&case_id, element).await?,
            };
            print!("{}", render_diagram(&case.path));
        }
        Command::Entry {
            case_id,
            position,
            side,
            key,
            value,
        } => {
            let case_id = CaseId::parse(&case_id)?;
            let side = side.parse::<InfoSide>()?;
            let case = engine.add_entry(&case_id, position, side, &key, &value).await?;
            print!("{}", render_diagram(&case.path));
        }
        Command::Remove { case_id, position } => {
            let case_id = CaseId::parse(&case_id)?;
            let case = engine.remove_element(&case_id, position).await?;
            print!("{}", render_diagram(&case.path));
        }
        Command::Points { case_id } => {
            let case_id = CaseId::parse(&case_id)?;
            for point in engine.insertion_points(&case_id).await? {
                println!("[{}] {} -> {}", point.position, point.after, point.before);
            }
        }
        Command::Show { case_id } => {
            let case = engine.retrieve(&CaseId::parse(&case_id)?).await?;
            println!("--- CASE DETAILS: {} ---", case.case_id);
            println!("Threat: {}", case.threat_type);
            println!("Created: {}", case.created_at.to_rfc3339());
            println!("Network Elements: {}", case.element_count());
            println!();
            print!("{}", render_diagram(&case.path));
        }
        Command::Report { case_id, json } => {
            let generated = engine.generate_report(&CaseId::parse(&case_id)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&generated.report)?);
            } else {
                print!("{}", generated.text);
            }
        }
        Command::Export { case_id, dir } => {
            let export = engine.export_case(&CaseId::parse(&case_id)?).await?;
            let dir = dir.unwrap_or_else(|| PathBuf::from(&config.export.dir));
            tokio::fs::create_dir_all(&dir).await?;
            let path = dir.join(&export.file_name);
            tokio::fs::write(&path, &export.contents).await?;
            println!("Case exported to: {}", path.display());
            println!("Content hash (BLAKE3): {}", export.content_hash);
        }
        Command::List => {
            let cases = engine.list_cases().await?;
            if cases.is_empty() {
                println!("No cases found.");
            }
            for case in cases {
                println!(
                    "{}  {}  {} -> {}  ({} elements)",
                    case.case_id,
                    case.threat_type,
                    case.source_ip,
                    case.destination_ip,
                    case.element_count
                );
            }
        }
        Command::History { case_id } => {
            for event in engine.history(&CaseId::parse(&case_id)?).await? {
                println!(
                    "{}  {}  {}",
                    event.timestamp.to_rfc3339(),
                    event.action(),
                    serde_json::to_string(&event.payload)?
                );
            }
        }
        Command::Status => print_status(&engine, &config).await?,
        Command::Trace { case_id } => {
            let existing = case_id.as_deref().map(CaseId::parse).transpose()?;
            let stdin = io::stdin();
            let stdout = BufWriter::new(io::stdout());
            let mut prompter = Prompter::new(&engine, stdin.lock(), stdout);
            let case_id = prompter.run(existing).await?;
            tracing::info!(case_id = %case_id, "Trace session finished");
        }
    }

    Ok(())
}

async fn print_status(
    engine: &CaseEngine<DefaultRepository>,
    config: &TracerConfig,
) -> anyhow::Result<()> {
    let repo = engine.repository();
    println!("Storage backend: {}", repo.backend());
    println!("Degraded: {}", repo.is_degraded());
    println!("Data directory: {}", config.storage.data_dir);
    if let Some(uri) = &config.storage.graph.uri {
        println!("Graph URI: {uri}");
    }
    println!("Pivot rule: {:?}", engine.pivot_rule());
    println!("Cases: {}", repo.list().await?.len());
    Ok(())
}

fn parse_entry(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
