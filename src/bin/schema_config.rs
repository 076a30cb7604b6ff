//! Schema Config CLI
//!
//! View and manage schema graph configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fbs_graph::GraphConfig;

#[derive(Parser)]
#[command(name = "schema-config")]
#[command(about = "View and manage schema graph configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "fbs-graph.toml")]
        output: PathBuf,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = GraphConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Schema Graph Configuration\n");
                println!("Input:");
                println!("  Path: {:?}", cfg.input.path);
                println!("  Pattern: {}", cfg.input.pattern);
                println!("  Recursive: {}", cfg.input.recursive);
                if !cfg.input.skip_prefixes.is_empty() {
                    println!("  Skip:");
                    for prefix in &cfg.input.skip_prefixes {
                        println!("    - {}", prefix);
                    }
                }

                println!("\nResolve:");
                println!("  Policy: {:?}", cfg.resolve.policy);

                println!("\nExport:");
                println!("  Format: {:?}", cfg.export.output_format);
            }
        }

        Commands::Init { output } => {
            let cfg = GraphConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output.display());
        }

        Commands::Validate { config } => match GraphConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("   Input: {:?}", cfg.input_path());
                println!("   Pattern: {}", cfg.input.pattern);
                println!("   Policy: {:?}", cfg.resolve.policy);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
