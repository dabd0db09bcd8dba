//! CLI entry point for taxi_insight.
//!
//! Each subcommand loads a trip upload, runs one analysis, and prints the
//! structured result as JSON for a dashboard (or a human) to render.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use taxi_insight::aggregate::{
    DatasetOverview, OutlierBound, TaxiOrderSummary, duration_frequency, duration_summary,
    filter_by_duration, filter_orders, hourly_stats, order_count_summary, order_counts, overview,
    records_for_taxi, taxis_with_orders_between,
};
use taxi_insight::cache::DatasetCache;
use taxi_insight::cluster::{ClusterParams, DEFAULT_BATCH_SIZE};
use taxi_insight::config::Config;
use taxi_insight::geocode::auth::UrlParam;
use taxi_insight::geocode::{BasicClient, HttpGeocoder, MemoGeocoder};
use taxi_insight::hotspot::find_hot_spots;
use taxi_insight::loader::read_upload;
use taxi_insight::output::{print_pretty, to_json, write_table};
use taxi_insight::route::{default_route_selection, taxi_routes};
use taxi_insight::session::Session;
use taxi_insight::stats::Summary;
use taxi_insight::views::{PickupView, TripEndView, map_centre};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_insight")]
#[command(about = "Explore taxi pickup and dropoff records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record counts and the distribution of orders per taxi
    Summary {
        /// Headerless 8-column trip file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Drop taxis with fewer orders than this
        #[arg(long)]
        min_orders: Option<u64>,

        /// Drop taxis with more orders than this
        #[arg(long)]
        max_orders: Option<u64>,

        /// Also write the per-taxi order table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Look up taxis by id or by order count
    Query {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Show every trip of this taxi
        #[arg(long)]
        id: Option<i64>,

        /// List taxis with strictly more orders than this
        #[arg(long, requires = "below")]
        above: Option<u64>,

        /// List taxis with strictly fewer orders than this
        #[arg(long, requires = "above")]
        below: Option<u64>,
    },
    /// Trip durations and per-hour activity
    Temporal {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Shortest duration (whole minutes) to keep
        #[arg(long)]
        min_minutes: Option<u64>,

        /// Longest duration (whole minutes) to keep
        #[arg(long)]
        max_minutes: Option<u64>,

        /// Also write the hourly table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Cluster pickups into hot spots and geocode their centres
    Hotspots {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of hot spots (1-20)
        #[arg(short, default_value_t = 3)]
        k: usize,

        /// Seed for reproducible clustering
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Also write the hot spot table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Pickup-to-dropoff routes of selected taxis
    Routes {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Taxi ids to include; defaults to the three smallest ids
        #[arg(long = "id")]
        ids: Vec<i64>,
    },
}

#[derive(Serialize)]
struct SummaryReport {
    overview: DatasetOverview,
    bound: Option<OutlierBound>,
    order_summary: Option<Summary>,
    taxis: Vec<TaxiOrderSummary>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/taxi_insight.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_insight.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let mut cache = match &config.cache_dir {
        Some(dir) => DatasetCache::persistent(dir),
        None => DatasetCache::in_memory(),
    };
    let mut session = Session::new();

    match cli.command {
        Commands::Summary {
            file,
            min_orders,
            max_orders,
            csv,
        } => {
            upload(&mut session, &mut cache, &file)?;
            let dataset = session.dataset()?;

            let taxis = order_counts(dataset);
            let order_summary = order_count_summary(&taxis);
            let observed = OutlierBound::observed(taxis.iter().map(|t| t.order_count));
            let bound = observed
                .map(|b| {
                    OutlierBound::new(min_orders.unwrap_or(b.low), max_orders.unwrap_or(b.high))
                })
                .transpose()?;
            let taxis = match bound {
                Some(b) if min_orders.is_some() || max_orders.is_some() => filter_orders(&taxis, b),
                _ => taxis,
            };

            if let Some(path) = csv {
                write_table(&path, &taxis)?;
            }

            println!(
                "{}",
                to_json(&SummaryReport {
                    overview: overview(dataset),
                    bound,
                    order_summary,
                    taxis,
                })?
            );
        }
        Commands::Query {
            file,
            id,
            above,
            below,
        } => {
            upload(&mut session, &mut cache, &file)?;
            let dataset = session.dataset()?;

            if let Some(id) = id {
                let records = records_for_taxi(dataset, id);
                info!(id, found = records.len(), "Taxi query");
                println!("{}", to_json(&records)?);
            }
            if let (Some(low), Some(high)) = (above, below) {
                let taxis = taxis_with_orders_between(&order_counts(dataset), low, high);
                info!(low, high, found = taxis.len(), "Order range query");
                println!("{}", to_json(&taxis)?);
            }
            if id.is_none() && above.is_none() {
                warn!("Nothing to query; pass --id or --above/--below");
            }
        }
        Commands::Temporal {
            file,
            min_minutes,
            max_minutes,
            csv,
        } => {
            upload(&mut session, &mut cache, &file)?;
            let observed = session.duration_bounds()?;
            let bound = OutlierBound::new(
                min_minutes.unwrap_or(observed.low),
                max_minutes.unwrap_or(observed.high),
            )?;
            let derived = session.derived()?;
            let trips = filter_by_duration(&derived, bound);
            let hourly = hourly_stats(trips.iter().copied());

            if let Some(path) = csv {
                write_table(&path, &hourly)?;
            }

            println!(
                "{}",
                to_json(&serde_json::json!({
                    "bound": bound,
                    "duration_summary": duration_summary(trips.iter().copied()),
                    "duration_frequency": duration_frequency(trips.iter().copied()),
                    "hourly": hourly,
                }))?
            );
        }
        Commands::Hotspots {
            file,
            k,
            seed,
            batch_size,
            csv,
        } => {
            upload(&mut session, &mut cache, &file)?;
            let dataset = session.dataset()?;

            let mut params = ClusterParams::new(k);
            params.seed = seed;
            params.batch_size = batch_size;

            let geocoder = build_geocoder(&config)?;
            let pickups = PickupView(dataset);
            let report = find_hot_spots(pickups, &params, &geocoder).await?;
            print_pretty(&report.hot_spots);

            if let Some(path) = csv {
                write_table(&path, &report.hot_spots)?;
            }

            println!(
                "{}",
                to_json(&serde_json::json!({
                    "centre": map_centre(&pickups.positions()),
                    "hot_spots": report.hot_spots,
                    "labels": report.labels,
                }))?
            );
        }
        Commands::Routes { file, ids } => {
            upload(&mut session, &mut cache, &file)?;
            let dataset = session.dataset()?;

            let ids = if ids.is_empty() {
                default_route_selection(dataset)
            } else {
                ids
            };

            let geocoder = build_geocoder(&config)?;
            let segments = taxi_routes(dataset, &ids, &geocoder).await?;
            let starts: Vec<_> = segments.iter().map(|s| s.start).collect();

            println!(
                "{}",
                to_json(&serde_json::json!({
                    "selected": ids,
                    "centre": map_centre(&starts),
                    "segments": segments,
                }))?
            );
        }
    }

    Ok(())
}

/// Reads `path` through the dataset cache into the session.
#[tracing::instrument(skip(session, cache), fields(path = %path.display()))]
fn upload(session: &mut Session, cache: &mut DatasetCache, path: &Path) -> Result<()> {
    let bytes = read_upload(path)?;
    let dataset = session.upload(cache, &bytes)?;
    info!(rows = dataset.len(), "Upload ready");
    Ok(())
}

fn build_geocoder(config: &Config) -> Result<MemoGeocoder<HttpGeocoder<UrlParam<BasicClient>>>> {
    if config.geocoder_ak.is_empty() {
        warn!("GEOCODER_AK is not set; the geocoding service will likely reject requests");
    }
    let client = UrlParam::ak(
        BasicClient::with_timeout(config.geocoder_timeout)?,
        config.geocoder_ak.clone(),
    );
    let geocoder = HttpGeocoder::new(client, config.geocoder_base_url.clone())
        .with_attempts(config.geocoder_attempts);
    Ok(MemoGeocoder::new(geocoder))
}
