use crate::display;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::ProgressBar;
use omcs_api::{AlgoliaSearch, Config};
use omcs_search::{
    CollectionSpec, MultiIndexSearchClient, QueryDebouncer, SearchResults, SearchSession,
    FULL_HITS_PER_PAGE,
};
use std::sync::Arc;
use std::time::Duration;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
#[command(about = "Search cheatsheets and labels")]
pub struct SearchArgs {
    /// Search term (empty lists everything)
    #[arg(default_value = "")]
    pub term: String,

    /// Show the full results page instead of the typeahead preview
    #[arg(long)]
    pub full: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

pub fn execute(args: SearchArgs) -> Result<()> {
    let config = Config::load()?;
    let service = AlgoliaSearch::from_config(&config).context("Search is not configured")?;

    let mut client = MultiIndexSearchClient::new(Arc::new(service)).with_collections(vec![
        CollectionSpec::content().with_index_name(&config.search.content_index),
        CollectionSpec::tags().with_index_name(&config.search.tag_index),
    ]);
    if args.full {
        client = client.with_hits_per_page(FULL_HITS_PER_PAGE);
    }

    log::debug!(
        "Searching {:?} in {} and {}",
        args.term,
        config.search.content_index,
        config.search.tag_index
    );
    let mut session =
        SearchSession::spawn(Arc::new(client), QueryDebouncer::new(config.debounce()));
    session.submit(args.term.as_str());

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Searching...");
    let finished = session.wait(SEARCH_TIMEOUT);
    spinner.finish_and_clear();

    if !finished {
        match session.error() {
            Some(e) => anyhow::bail!("Search failed: {}", e),
            None => anyhow::bail!("Search timed out after {:?}", SEARCH_TIMEOUT),
        }
    }

    if let Some(results) = session.results() {
        for collection in &results.collections {
            if let Some(error) = &collection.error {
                eprintln!(
                    "{} {} unavailable: {}",
                    "Warning:".yellow(),
                    collection.collection.label(),
                    error
                );
            }
        }
    }

    match args.format {
        OutputFormat::Human => {
            for line in display::view_lines(&session.view()) {
                println!("{}", line);
            }
            if let Some(results) = session.results() {
                println!("{}", format!("({:.0?})", results.duration).dimmed());
            }
        }
        OutputFormat::Json => {
            let json = session.results().map(results_json).unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    session.close();
    Ok(())
}

fn results_json(results: &SearchResults) -> serde_json::Value {
    let collections: Vec<_> = results
        .collections
        .iter()
        .map(|c| {
            let hits: Vec<_> = c
                .hits
                .iter()
                .map(|hit| {
                    let fields: serde_json::Map<String, serde_json::Value> = hit
                        .display_fields
                        .iter()
                        .map(|(name, field)| (name.clone(), field.markup.clone().into()))
                        .collect();
                    serde_json::json!({
                        "id": hit.id,
                        "route": c.collection.route(&hit.id).path(),
                        "fields": fields,
                    })
                })
                .collect();
            serde_json::json!({
                "collection": c.collection.label(),
                "estimated_total": c.estimated_total,
                "error": c.error,
                "hits": hits,
            })
        })
        .collect();
    serde_json::json!({ "term": results.term, "collections": collections })
}
