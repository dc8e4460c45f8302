mod cmd;
mod output;
mod sources;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, generate::GenerateArgs, knowledge::KnowledgeSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "syllabus",
    about = "Synthesize a course syllabus with aligned outcomes, assessments, and questions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Pipeline configuration file (YAML; defaults apply when omitted)
    #[arg(long, global = true, env = "SYLLABUS_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge base file (YAML; the built-in knowledge base when omitted)
    #[arg(long, global = true, env = "SYLLABUS_KNOWLEDGE")]
    knowledge: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log pipeline progress to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a syllabus from a course description
    Generate(GenerateArgs),

    /// Inspect or export the knowledge base
    Knowledge {
        #[command(subcommand)]
        subcommand: KnowledgeSubcommand,
    },

    /// Inspect or validate the pipeline configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let sources = sources::Sources {
        config: cli.config,
        knowledge: cli.knowledge,
    };

    let result = match cli.command {
        Commands::Generate(args) => cmd::generate::run(&sources, args, cli.json),
        Commands::Knowledge { subcommand } => cmd::knowledge::run(&sources, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&sources, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
