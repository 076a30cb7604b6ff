//! Schema Graph CLI
//!
//! Loads a schema directory and inspects the resolved type graph.

use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use fbs_graph::config::OutputFormat;
use fbs_graph::views::GraphExport;
use fbs_graph::{nullable_fields, nullable_wrappers, reference_files, Context, GraphConfig, TypeClass, TypeGraph, TypeRef};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-graph")]
#[command(about = "Resolve a directory of FlatBuffers schemas and inspect the type graph")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema directory (overrides [input] path)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show scope, record and enum counts
    Summary,

    /// Classify every field of a record
    Classify {
        /// Record name, optionally namespace-qualified
        record: String,
    },

    /// List distinct nullable payload types
    Nullable {
        /// Print the synthesized wrapper schema for each entry
        #[arg(long)]
        render: bool,
    },

    /// List the raw schema files a record refers to
    Refs {
        /// Record name, optionally namespace-qualified
        record: String,
    },

    /// Print records and enums with dependencies first
    Order,

    /// Export the resolved graph and derived views as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the type dependency graph in DOT format
    Dot {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GraphConfig::load_from(cli.config.as_deref())?;
    let dir = cli.dir.unwrap_or_else(|| config.input_path());
    let ctx = Context::load(&dir, &config.load_config())
        .with_context(|| format!("loading schemas from {}", dir.display()))?;

    match cli.command {
        Commands::Summary => {
            let stats = ctx.stats();
            println!("📊 Schema graph: {}", dir.display());
            println!("   Scopes:  {}", stats.scopes);
            println!("   Records: {}", stats.records);
            println!("   Enums:   {}", stats.enums);
            println!("   Fields:  {}", stats.fields);
            println!("   Bundle:  {}", ctx.bundle_hash().short());

            let cycles = TypeGraph::build(&ctx).cycles();
            if !cycles.is_empty() {
                println!("\n🔁 Reference cycles:");
                for group in cycles {
                    let names: Vec<String> = group.iter().map(|t| ctx.qualified_name(*t)).collect();
                    println!("   {}", names.join(" -> "));
                }
            }
        }

        Commands::Classify { record } => {
            let record = ctx
                .find_record(&record)
                .ok_or_else(|| anyhow!("record `{}` not found", record))?;
            println!("{} {}", record.kind.keyword(), ctx.qualified_name(TypeRef::Record(record.id)));
            for field in &record.fields {
                let class = match ctx.classify(field) {
                    TypeClass::Array => format!("array of {}", describe(&ctx, ctx.classify_element(field))),
                    other => describe(&ctx, other),
                };
                println!("  {}: {}  ({})", field.name, field.ty, class);
            }
            for name in &record.deprecated_fields {
                println!("  {}: deprecated, skipped", name);
            }
        }

        Commands::Nullable { render } => {
            if render {
                for wrapper in nullable_wrappers(&ctx) {
                    println!("// ==== {} ({}) ====", wrapper.file_name(), wrapper.checksum.short());
                    println!("{}", wrapper.text);
                }
            } else {
                for field in nullable_fields(&ctx) {
                    let record = ctx.record(field.record);
                    println!("{}  (first used by {}.{})", field.key, record.name, field.field);
                }
            }
        }

        Commands::Refs { record } => {
            let record = ctx
                .find_record(&record)
                .ok_or_else(|| anyhow!("record `{}` not found", record))?;
            for file in reference_files(&ctx, record.id) {
                println!("{}.fbs", file);
            }
        }

        Commands::Order => {
            for group in TypeGraph::build(&ctx).compile_order() {
                let names: Vec<String> = group.iter().map(|t| ctx.qualified_name(*t)).collect();
                println!("{}", names.join(", "));
            }
        }

        Commands::Export { output } => {
            let export = GraphExport::new(&ctx);
            let json = match config.export.output_format {
                OutputFormat::Pretty => serde_json::to_string_pretty(&export)?,
                OutputFormat::Compact => serde_json::to_string(&export)?,
            };
            write_output(output, &json)?;
        }

        Commands::Dot { output } => {
            let dot = TypeGraph::build(&ctx).to_dot(&ctx);
            write_output(output, &dot)?;
        }
    }

    Ok(())
}

fn describe(ctx: &Context, class: TypeClass) -> String {
    match class {
        TypeClass::Primitive(primitive) => format!("primitive {}", primitive),
        TypeClass::Array => "array".to_string(),
        TypeClass::Unknown => "unknown".to_string(),
        other => match other.type_ref() {
            Some(type_ref @ TypeRef::Record(_)) => format!("record {}", ctx.qualified_name(type_ref)),
            Some(type_ref) => format!("enum {}", ctx.qualified_name(type_ref)),
            None => "unknown".to_string(),
        },
    }
}

fn write_output(output: Option<PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, content)?;
            eprintln!("✅ Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
