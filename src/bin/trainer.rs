use anyhow::{anyhow, Context, Result};
use clap::Parser;
use latentrec::{init_tracing, AppState, Config};
use ndarray::Array2;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Factorize a rating matrix and persist the model", long_about = None)]
struct Args {
    /// JSON file holding the dense rating matrix as an array of rows; 0 marks a missing rating
    #[arg(short, long)]
    matrix: PathBuf,

    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides the configured model directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn load_matrix(path: &PathBuf) -> Result<Array2<f64>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening rating matrix {}", path.display()))?;
    let rows: Vec<Vec<f64>> = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing rating matrix {}", path.display()))?;

    let num_users = rows.len();
    let num_items = rows.first().map_or(0, |row| row.len());
    if let Some(idx) = rows.iter().position(|row| row.len() != num_items) {
        return Err(anyhow!(
            "row {} has {} columns, expected {}",
            idx,
            rows[idx].len(),
            num_items
        ));
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((num_users, num_items), flat)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    if let Some(output) = args.output {
        config.storage.model_dir = output;
    }
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if args.seed.is_some() {
        config.training.seed = args.seed;
    }
    config.validate()?;

    info!("Training configuration: {:?} {:?}", config.model, config.training);

    let matrix = load_matrix(&args.matrix)?;
    let state = AppState::new(config)?;

    let report = state
        .training_service
        .fit_and_publish(&matrix, &state.model_handle)
        .context("training failed")?;
    state
        .model_store
        .save(&report.model, &report.history)
        .context("saving model failed")?;

    info!(
        "Model trained in {:?} with final rmse {:.4} and saved to {}",
        report.elapsed,
        report.metrics.rmse,
        state.model_store.dir().display()
    );
    Ok(())
}
