use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod config;
mod display;
mod feed;
mod search;

#[derive(Parser)]
#[command(name = "omcs")]
#[command(about = "Search and browse a cheatsheet library kept in GitHub issues", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search cheatsheets and labels
    #[command(alias = "s")]
    Search(search::SearchArgs),

    /// List cheatsheets, newest first
    #[command(alias = "f")]
    Feed(feed::FeedArgs),

    /// List labels
    Labels(feed::LabelsArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug (overridden by RUST_LOG)
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Search(args) => search::execute(args),
        Commands::Feed(args) => feed::execute(args),
        Commands::Labels(args) => feed::execute_labels(args),
        Commands::Config(args) => config::execute(args),
    }
}
