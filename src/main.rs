use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, cast::ToElement, Distribution, Tensor},
};
use clap::{Parser, Subcommand};
use quality_unet::ModelConfig;

#[cfg(not(feature = "wgpu"))]
type CliBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
type CliBackend = burn::backend::Wgpu<f32>;

#[derive(Parser, Debug)]
#[command(
    name = "quality-unet",
    version,
    about = "Inspect the quality-conditioned U-Net / PatchGAN pair."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build both networks and report their parameter counts.
    Summary {
        /// JSON model config; defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write the default model config as JSON.
    DumpConfig {
        #[arg(long)]
        out: PathBuf,
    },
    /// Run one forward pass of both networks on random input.
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Square image side; must be a multiple of 256.
        #[arg(long, default_value_t = 256)]
        size: usize,
        #[arg(long, default_value_t = 1)]
        batch: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quality_unet=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Summary { config } => summary(config.as_deref()),
        Command::DumpConfig { out } => ModelConfig::new()
            .save(&out)
            .with_context(|| format!("writing config to {}", out.display())),
        Command::Check {
            config,
            size,
            batch,
        } => check(config.as_deref(), size, batch),
    }
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    let config = match path {
        Some(path) => ModelConfig::load(path)
            .map_err(|e| anyhow!("loading config from {}: {e}", path.display()))?,
        None => ModelConfig::new(),
    };
    Ok(config)
}

fn summary(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let device = <CliBackend as Backend>::Device::default();
    let model = config.try_init::<CliBackend>(&device)?;

    tracing::info!(
        generator = model.generator.num_params(),
        discriminator = model.discriminator.num_params(),
        total = model.num_params(),
        "parameter counts"
    );
    Ok(())
}

fn check(path: Option<&Path>, size: usize, batch: usize) -> Result<()> {
    let config = load_config(path)?;
    let device = <CliBackend as Backend>::Device::default();
    let model = config.try_init::<CliBackend>(&device)?;

    let in_channels = config.generator_config.in_channels;
    let quality_dim = config.generator_config.quality_dim;

    let condition = Tensor::<CliBackend, 4>::random(
        [batch, in_channels, size, size],
        Distribution::Uniform(0.0, 1.0),
        &device,
    );
    let quality = Tensor::<CliBackend, 3>::random(
        [batch, 1, quality_dim],
        Distribution::Uniform(0.0, 1.0),
        &device,
    );

    let (generated, patches) = model
        .translate_and_score(condition, quality)
        .context("forward pass")?;
    tracing::info!(
        shape = ?generated.dims(),
        min = generated.clone().min().into_scalar().to_f32(),
        max = generated.max().into_scalar().to_f32(),
        "generator output"
    );
    tracing::info!(shape = ?patches.dims(), "discriminator output");

    Ok(())
}
