use crate::display;
use crate::search::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use omcs_api::{Config, GithubClient, Issue, Label};
use omcs_search::{FeedItem, InfiniteFeedController, PaginationCursor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
#[command(about = "List cheatsheets, newest first")]
pub struct FeedArgs {
    /// Only cheatsheets under this label id, as in /sheet/label/<id>
    #[arg(short, long)]
    pub label: Option<String>,

    /// Number of pages to load
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
#[command(about = "List labels")]
pub struct LabelsArgs {
    /// Number of pages to load
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

pub fn execute(args: FeedArgs) -> Result<()> {
    let config = Config::load()?;
    let github = Arc::new(GithubClient::from_config(&config).context("GitHub is not configured")?);

    let mut cursor = PaginationCursor::new("issues", config.feed.page_size);
    if let Some(label) = &args.label {
        cursor = cursor.with_partition(label);
    }
    let feed = InfiniteFeedController::<Issue>::spawn(github, cursor);
    let (issues, more) = load_pages(feed, args.pages)?;

    print_items(&issues, more, args.format, display::issue_line)
}

pub fn execute_labels(args: LabelsArgs) -> Result<()> {
    let config = Config::load()?;
    let github = Arc::new(GithubClient::from_config(&config).context("GitHub is not configured")?);

    let cursor = PaginationCursor::new("labels", config.feed.page_size);
    let feed = InfiniteFeedController::<Label>::spawn(github, cursor);
    let (labels, more) = load_pages(feed, args.pages)?;

    print_items(&labels, more, args.format, display::label_line)
}

/// Load up to `pages` pages one after another. Returns the items and whether
/// the feed has more after them.
fn load_pages<T>(mut feed: InfiniteFeedController<T>, pages: usize) -> Result<(Vec<T>, bool)>
where
    T: FeedItem + Clone + Send + 'static,
{
    for _ in 0..pages {
        if !feed.load_more() {
            break;
        }
        if feed.is_loading() && !feed.wait_for_page(PAGE_TIMEOUT) {
            match feed.last_error() {
                Some(e) => anyhow::bail!("Failed to load page {}: {}", feed.pages().len() + 1, e),
                None => anyhow::bail!("Timed out waiting for page {}", feed.pages().len() + 1),
            }
        }
    }

    let more = !feed.is_end();
    let items = feed.items().to_vec();
    log::debug!(
        "Loaded {} items in {} pages from {}",
        items.len(),
        feed.pages().len(),
        feed.cursor().namespace()
    );
    feed.close();
    Ok((items, more))
}

fn print_items<T: Serialize>(
    items: &[T],
    more: bool,
    format: OutputFormat,
    line: fn(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Human => {
            if items.is_empty() {
                println!("{}", "Nothing here yet".yellow());
            }
            for item in items {
                println!("{}", line(item));
            }
            if more {
                println!("{}", "More available, use --pages to load further".dimmed());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
    }
    Ok(())
}
