use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use feedpost::config::{is_debug_flag, Config};
use feedpost::content::format_post;
use feedpost::feed::{fetch_posts, HttpFeedSource};
use feedpost::storage::{merge_new_posts, PostStore};

/// Get the config directory path (~/.config/feedpost/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedpost"))
}

#[derive(Parser, Debug)]
#[command(name = "feedpost", about = "Turn blog feed posts into LinkedIn-ready drafts")]
struct Args {
    /// Config file (defaults to ~/.config/feedpost/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log per-entry diagnostics while fetching
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed and store posts not seen before
    Fetch,
    /// List stored posts
    List,
    /// Print the formatted post at INDEX (as shown by `list`)
    Preview {
        index: usize,
    },
    /// Record the date a post went out on LinkedIn (omit DATE to clear it)
    SetDate {
        url: String,
        /// YYYY-MM-DD
        date: Option<String>,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };

    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from '{}'", path.display()))?;
    config
        .apply_env()
        .context("Invalid environment override")?;
    if args.debug {
        config.debug = true;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_fetch(config: &Config, store: &PostStore) -> Result<()> {
    let source = HttpFeedSource::new(reqwest::Client::new());
    let report = fetch_posts(
        &source,
        &config.feed_url,
        config.posts_per_page,
        &config.ladder,
        config.debug,
    )
    .await;

    let Some(fetched) = report.outcome.into_records() else {
        eprintln!("Failed to fetch posts from RSS feed. Please check the feed URL.");
        std::process::exit(1);
    };

    tracing::debug!(
        attempts = report.log.attempts(),
        accepted = ?report.log.accepted_url(),
        skipped_entries = report.log.skipped_entries.len(),
        "Fetch finished"
    );

    let mut posts = store.load().context("Failed to load stored posts")?;
    let added = merge_new_posts(&mut posts, fetched);
    if added == 0 {
        println!("No new posts found");
        return Ok(());
    }

    store.save(&posts).context("Failed to save posts")?;
    println!("Fetched {added} new posts");
    Ok(())
}

fn run_list(store: &PostStore) -> Result<()> {
    let posts = store.load().context("Failed to load stored posts")?;
    if posts.is_empty() {
        println!("No posts stored. Run `feedpost fetch` first.");
        return Ok(());
    }

    for (index, post) in posts.iter().enumerate() {
        let published = if post.published.is_empty() {
            "-"
        } else {
            post.published.as_str()
        };
        let shared = if post.linkedin_date.is_empty() {
            "-"
        } else {
            post.linkedin_date.as_str()
        };
        println!("{index:>4}  {published:<31}  {shared:<10}  {}", post.title);
    }
    Ok(())
}

fn run_preview(config: &Config, store: &PostStore, index: usize) -> Result<()> {
    let post = store.get(index)?;
    let formatted = format_post(&post, config.max_length);
    println!("{}", formatted.body);
    tracing::debug!(
        chars = formatted.body.chars().count(),
        images = formatted.images.len(),
        "Formatted post"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // Subscriber first: config loading logs unknown keys
    let env_debug = std::env::var("FEEDPOST_DEBUG").is_ok_and(|v| is_debug_flag(&v));
    init_tracing(args.debug || env_debug);

    let config = load_config(&args)?;
    let store = PostStore::new(&config.posts_file);

    match &args.command {
        Command::Fetch => run_fetch(&config, &store).await?,
        Command::List => run_list(&store)?,
        Command::Preview { index } => run_preview(&config, &store, *index)?,
        Command::SetDate { url, date } => {
            let date = date.as_deref().unwrap_or("");
            store
                .set_linkedin_date(url, date)
                .with_context(|| format!("Failed to update '{url}'"))?;
            if date.is_empty() {
                println!("Cleared LinkedIn date for {url}");
            } else {
                println!("Set LinkedIn date for {url} to {date}");
            }
        }
    }

    Ok(())
}
