//! PlantVillage Inference CLI
//!
//! Runs crop-scoped classification on local image files and inspects the
//! label catalog, using the same pipeline as the HTTP server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use plantvillage_infer::backend::backend_name;
use plantvillage_infer::catalog::{filter, CropQuery, LabelCatalog};
use plantvillage_infer::utils::format_millis;
use plantvillage_infer::utils::logging::{init_logging, LogConfig};
use plantvillage_infer::{build_handler, ModelSettings, PredictionResult, DEFAULT_IMAGE_SIZE};

/// Crop-scoped plant disease classification with Burn
#[derive(Parser, Debug)]
#[command(name = "plantvillage_infer")]
#[command(version)]
#[command(about = "Crop-scoped plant disease classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one image, or every image in a directory, for a crop
    Predict {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Crop to restrict the prediction to (e.g. "tomato")
        #[arg(short, long)]
        crop: String,

        /// Path to trained model weights
        #[arg(short, long)]
        model: PathBuf,

        /// Model config JSON (defaults to model.json next to the weights)
        #[arg(long)]
        model_config: Option<PathBuf>,

        /// Label file, one class name per line
        #[arg(short, long, default_value = "labels.txt")]
        labels: PathBuf,

        /// Square size images are resized to
        #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
        image_size: u32,

        /// Print the JSON response instead of a summary
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the label catalog, optionally only the labels of one crop
    Labels {
        /// Label file, one class name per line
        #[arg(short, long, default_value = "labels.txt")]
        labels: PathBuf,

        /// Only show labels matching this crop
        #[arg(short, long)]
        crop: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Predict {
            input,
            crop,
            model,
            model_config,
            labels,
            image_size,
            json,
        } => {
            let settings = ModelSettings {
                weights: model,
                model_config,
                labels,
                image_size,
            };
            cmd_predict(&input, &crop, &settings, json)?;
        }

        Commands::Labels { labels, crop } => {
            cmd_labels(&labels, crop.as_deref())?;
        }
    }

    Ok(())
}

fn cmd_predict(input: &Path, crop: &str, settings: &ModelSettings, json: bool) -> Result<()> {
    info!("Running inference");
    info!("  Input: {:?}", input);
    info!("  Model: {:?}", settings.weights);

    if !json {
        println!("{}", "Inference Configuration:".cyan().bold());
        println!("  Input:   {}", input.display());
        println!("  Crop:    {}", crop);
        println!("  Model:   {}", settings.weights.display());
        println!("  Backend: {}", backend_name());
        println!();
    }

    if !input.exists() {
        anyhow::bail!("Input path not found: {}", input.display());
    }

    let handler = build_handler(settings).context("Failed to initialize the model")?;

    let files: Vec<PathBuf> = if input.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_image_file(p))
            .collect();
        files.sort();
        files
    } else {
        vec![input.to_path_buf()]
    };

    for path in files {
        let start = std::time::Instant::now();
        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let result = handler.handle(&bytes, crop);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if json {
            println!("{}", serde_json::to_string(&result)?);
            continue;
        }

        println!("{}", path.display().to_string().bold());
        match &result {
            PredictionResult::Success(p) => {
                println!("  Prediction: {} (class {})", p.predicted_class.green(), p.class_index);
                println!("  Confidence: {:.2}%", p.confidence);
            }
            PredictionResult::Failure { error } => {
                println!("  {} {}", "Error:".red(), error);
            }
        }
        println!("  Time:       {}", format_millis(elapsed_ms));
    }

    Ok(())
}

fn cmd_labels(labels: &Path, crop: Option<&str>) -> Result<()> {
    let catalog = LabelCatalog::load(labels)?;

    let indices: Vec<usize> = match crop {
        Some(crop) => filter(&CropQuery::new(crop), &catalog),
        None => (0..catalog.len()).collect(),
    };

    println!(
        "{} {} of {} labels",
        "Catalog:".cyan().bold(),
        indices.len(),
        catalog.len()
    );
    for index in indices {
        println!("  {:>3}  {}", index, catalog.get(index).unwrap_or_default());
    }

    if crop.is_none() {
        println!();
        println!("{} {}", "Crops:".cyan().bold(), catalog.crops().join(", "));
    }

    Ok(())
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ["jpg", "jpeg", "png", "bmp", "webp"].contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
