use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dealfeed::{Config, FeedAggregator, FeedClient, ImageUrlResolver, LoadState};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Maximum concurrent image-resolution fetches for `fetch --resolve-images`.
const RESOLVE_CONCURRENCY: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "dealfeed", about = "Fetch and normalize a WordPress deal feed")]
struct Cli {
    /// Path to a config file (default: ~/.config/dealfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed and print normalized deals
    Fetch {
        /// Case-insensitive substring filter against the raw title
        #[arg(long)]
        query: Option<String>,

        /// Only show deals whose title mentions this store
        #[arg(long)]
        store: Option<String>,

        /// Print at most this many deals
        #[arg(long)]
        limit: Option<usize>,

        /// Resolve a page image for deals without structured media
        #[arg(long)]
        resolve_images: bool,
    },
    /// Fetch the feed and print the distinct store names seen
    Stores,
    /// Resolve a representative image for one page URL
    Resolve {
        /// The post permalink to scrape
        page_url: String,
    },
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.config {
        return Ok(path.clone());
    }
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("dealfeed")
        .join("config.toml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&config_path(&cli)?)?;
    let http = reqwest::Client::new();

    match cli.command {
        Command::Fetch {
            query,
            store,
            limit,
            resolve_images,
        } => {
            let aggregator = load_feed(http.clone(), &config, query, store).await?;
            let resolver = resolve_images.then(|| {
                Arc::new(
                    ImageUrlResolver::new(http, config.image_cache_file())
                        .timeout(Duration::from_secs(config.resolve_timeout_secs))
                        .user_agent(config.user_agent.clone()),
                )
            });

            let tz = config.timezone();
            let visible = aggregator.visible_posts();
            let shown = match limit {
                Some(n) => &visible[..n.min(visible.len())],
                None => &visible[..],
            };

            let images = resolve_missing_images(resolver.as_ref(), shown).await;

            for (post, resolved) in shown.iter().zip(images) {
                let image = post.image_url().or(resolved);
                print_deal(post, image.as_ref(), tz);
            }
            eprintln!("{} of {} deals shown", shown.len(), aggregator.posts().len());
        }
        Command::Stores => {
            let aggregator = load_feed(http, &config, None, None).await?;
            for store in aggregator.stores_last_week() {
                println!("{store}");
            }
        }
        Command::Resolve { page_url } => {
            let page: Url = page_url.parse().context("Invalid page URL")?;
            let resolver = ImageUrlResolver::new(http, config.image_cache_file())
                .timeout(Duration::from_secs(config.resolve_timeout_secs))
                .user_agent(config.user_agent.clone());
            match resolver.resolve(&page).await {
                Some(image) => println!("{image}"),
                None => anyhow::bail!("No image candidate found for {page}"),
            }
        }
    }

    Ok(())
}

async fn load_feed(
    http: reqwest::Client,
    config: &Config,
    query: Option<String>,
    store: Option<String>,
) -> Result<FeedAggregator> {
    let client = FeedClient::new(http, config)?;
    let mut aggregator = FeedAggregator::new(client);
    aggregator.load().await;

    if let LoadState::Failed(message) = aggregator.state() {
        anyhow::bail!("Feed fetch failed: {message}");
    }

    if let Some(query) = query {
        aggregator.set_query(query);
    }
    aggregator.select_store(store);
    Ok(aggregator)
}

/// Resolves images for the posts that lack one, a bounded number at a time.
/// Returns one slot per post, `None` where nothing needed resolving or the
/// cascade came up empty.
async fn resolve_missing_images(
    resolver: Option<&Arc<ImageUrlResolver>>,
    posts: &[&dealfeed::Post],
) -> Vec<Option<Url>> {
    let Some(resolver) = resolver else {
        return vec![None; posts.len()];
    };

    stream::iter(posts.iter().map(|post| {
        let resolver = Arc::clone(resolver);
        let needs_image = post.image_url().is_none();
        let link = post.link.clone();
        async move {
            if needs_image {
                resolver.resolve(&link).await
            } else {
                None
            }
        }
    }))
    .buffered(RESOLVE_CONCURRENCY)
    .collect()
    .await
}

fn print_deal(post: &dealfeed::Post, image: Option<&Url>, tz: chrono_tz::Tz) {
    let store = post.store_name().unwrap_or_else(|| "-".to_string());
    let price = post.price().unwrap_or_else(|| "-".to_string());
    println!(
        "{:<20} {:<10} {}  [{}]",
        store,
        price,
        post.clean_title(),
        post.display_timestamp(tz)
    );
    println!("    {}", post.link);
    if let Some(image) = image {
        println!("    image: {image}");
    }
}
