use anyhow::{anyhow, Context, Result};
use clap::Parser;
use latentrec::{init_tracing, AppState, Config, NewUserRating, RecommendationRequest};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommend unseen items for a new user from a trained model", long_about = None)]
struct Args {
    /// JSON array of {"item": index, "rating": value} on the raw rating scale
    #[arg(short, long)]
    ratings: PathBuf,

    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides the configured model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Number of items to return
    #[arg(short, long)]
    top: Option<usize>,

    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };
    if let Some(model_dir) = args.model_dir {
        config.storage.model_dir = model_dir;
    }
    let top_n = args.top.unwrap_or(config.serving.top_n);

    let file = std::fs::File::open(&args.ratings)
        .with_context(|| format!("opening ratings {}", args.ratings.display()))?;
    let ratings: Vec<NewUserRating> = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing ratings {}", args.ratings.display()))?;

    let state = AppState::new(config)?;
    let persisted = state
        .restore_model()?
        .ok_or_else(|| anyhow!("no model found in {}", state.model_store.dir().display()))?;
    info!("Using model {} trained for {} epochs", persisted.model_id, persisted.epochs_trained);

    let request = RecommendationRequest::new(ratings);
    let response = state.serving_service.serve(&request, top_n)?;

    println!("{}", serde_json::to_string_pretty(&ApiResponse::success(response))?);
    Ok(())
}
