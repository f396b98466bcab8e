use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use susume_core::collab::{MeanPredictor, RatingsHistory};
use susume_core::config::RecommendConfig;
use susume_core::engine::Recommender;
use susume_core::error::SusumeError;
use susume_core::filter::TypeFilter;
use susume_core::models::CatalogItem;
use susume_core::oracle::SimilarityMatrix;
use susume_core::storage::Storage;

#[derive(Parser)]
#[command(name = "susume", version, about = "Anime recommendation engine")]
struct Cli {
    /// Database file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Content-similarity recommendations for a title
    Content {
        #[arg(long)]
        title: String,
        /// How many recommendations to return
        #[arg(short, long)]
        n: Option<usize>,
        /// Media-kind filter, e.g. "tv" or "movie,ova"
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Collaborative recommendations for a user
    Collab {
        #[arg(long)]
        user: u64,
        #[arg(short, long)]
        n: Option<usize>,
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Blended recommendations for a title and user pair
    Hybrid {
        #[arg(long)]
        title: String,
        #[arg(long)]
        user: u64,
        #[arg(short, long)]
        n: Option<usize>,
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Load catalog and ratings JSON files into the database
    Import {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        ratings: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    popularity: u64,
    #[serde(default = "default_kind")]
    kind: String,
}

fn default_kind() -> String {
    "unknown".into()
}

#[derive(Deserialize)]
struct RatingRow {
    user_id: u64,
    item_id: i64,
    rating: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("susume=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SusumeError> {
    let db_path = cli.db.unwrap_or_else(RecommendConfig::db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let storage = Storage::open(&db_path)?;

    match cli.command {
        Command::Content { title, n, kind } => {
            let (engine, config) = build_engine(&storage)?;
            let n = n.unwrap_or(config.limits.default_n);
            let recs = engine.recommend_content(&title, n, &TypeFilter::parse(&kind))?;
            print_json(&recs)
        }
        Command::Collab { user, n, kind } => {
            let (engine, config) = build_engine(&storage)?;
            let n = n.unwrap_or(config.limits.default_n);
            let recs = engine.recommend_collab(user, n, &TypeFilter::parse(&kind))?;
            print_json(&recs)
        }
        Command::Hybrid {
            title,
            user,
            n,
            kind,
        } => {
            let (engine, config) = build_engine(&storage)?;
            let n = n.unwrap_or(config.limits.default_n);
            let resp = engine.recommend_hybrid(&title, user, n, &TypeFilter::parse(&kind))?;
            print_json(&resp)
        }
        Command::Import { catalog, ratings } => import(&storage, catalog, ratings),
    }
}

/// Load everything from storage and assemble a ready-to-serve engine.
fn build_engine(storage: &Storage) -> Result<(Recommender, RecommendConfig), SusumeError> {
    let config = RecommendConfig::load()?;
    let catalog = storage.load_catalog()?;
    if catalog.is_empty() {
        return Err(SusumeError::Validation(
            "catalog is empty, run `susume import` first".into(),
        ));
    }
    let history = RatingsHistory::from_rows(storage.load_ratings()?);
    tracing::info!(
        items = catalog.len(),
        users = history.users(),
        "Catalog loaded"
    );
    let oracle = SimilarityMatrix::from_catalog(&catalog);
    let predictor = MeanPredictor::from_history(&history);
    let engine = Recommender::new(
        catalog,
        Box::new(oracle),
        Box::new(predictor),
        history,
        config.clone(),
    );
    Ok((engine, config))
}

fn import(
    storage: &Storage,
    catalog: Option<PathBuf>,
    ratings: Option<PathBuf>,
) -> Result<(), SusumeError> {
    if catalog.is_none() && ratings.is_none() {
        return Err(SusumeError::Validation(
            "import needs --catalog and/or --ratings".into(),
        ));
    }

    if let Some(path) = catalog {
        let raw = std::fs::read_to_string(&path)?;
        let rows: Vec<CatalogRow> =
            serde_json::from_str(&raw).map_err(|e| SusumeError::Validation(e.to_string()))?;
        let count = rows.len();
        for row in rows {
            storage.insert_item(&CatalogItem {
                id: 0,
                name: row.name,
                genres: row.genres,
                rating: row.rating,
                popularity: row.popularity,
                kind: row.kind.to_lowercase(),
            })?;
        }
        tracing::info!(count, path = %path.display(), "Catalog imported");
    }

    if let Some(path) = ratings {
        let raw = std::fs::read_to_string(&path)?;
        let rows: Vec<RatingRow> =
            serde_json::from_str(&raw).map_err(|e| SusumeError::Validation(e.to_string()))?;
        let count = rows.len();
        for row in rows {
            storage.insert_rating(row.user_id, row.item_id, row.rating)?;
        }
        tracing::info!(count, path = %path.display(), "Ratings imported");
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), SusumeError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| SusumeError::Internal(e.to_string()))?;
    println!("{out}");
    Ok(())
}
