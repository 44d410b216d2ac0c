use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "callweave")]
#[command(about = "Heuristic call-graph extraction and architecture analysis")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default callweave.toml
    Init {
        /// Target file (defaults to ./callweave.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Scan source roots and write the IR artifact
    Scan {
        /// Root directories to scan (overrides configuration)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Output path for the IR artifact
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Escalate warnings (skipped files, id collisions) to errors
        #[arg(long)]
        strict: bool,
    },

    /// Compute coupling, cycles, anti-patterns, and connascence from an IR artifact
    Analyze {
        /// Path to the IR artifact (defaults to the configured location)
        #[arg(short, long)]
        ir: Option<PathBuf>,

        /// Output path for the analysis artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthesize call-chain sequences from an IR artifact
    Sequence {
        /// Path to the IR artifact (defaults to the configured location)
        #[arg(short, long)]
        ir: Option<PathBuf>,

        /// Output path for the sequence artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scan, analyze, and synthesize in one pass
    Run {
        /// Root directories to scan (overrides configuration)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Escalate warnings to errors
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => engine.init(path).await,
            Commands::Scan { root, output, strict } => {
                let roots = if root.is_empty() { None } else { Some(root) };
                engine.scan(roots, output, strict).await.map(|_| ())
            }
            Commands::Analyze { ir, output } => engine.analyze(ir, output).await,
            Commands::Sequence { ir, output } => engine.sequence(ir, output).await,
            Commands::Run { root, strict } => {
                let roots = if root.is_empty() { None } else { Some(root) };
                engine.run(roots, strict).await
            }
        }
    }
}
