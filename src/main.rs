use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rust_photo_lab::config::{Configuration, FilterUpdate, PostKernel, PreviewOptions};
use rust_photo_lab::events::{DisplayFrame, EditorCommand, RenderRequest, RenderedFrame};
use rust_photo_lab::pipeline::FilterPipeline;
use rust_photo_lab::session::{self, Session};
use rust_photo_lab::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "photo-lab",
    version,
    about = "Apply photo filters to an image and export the result as PNG"
)]
struct Args {
    /// Image to edit (PNG, JPEG, GIF or WebP)
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Where to write the filtered PNG
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,
    /// Path to YAML config
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Apply a named preset from the config before the flags below
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,
    /// Percent, 100 is neutral
    #[arg(long, value_name = "N")]
    brightness: Option<f32>,
    /// Percent, 100 is neutral
    #[arg(long, value_name = "N")]
    contrast: Option<f32>,
    /// Percent, 100 is neutral
    #[arg(long, value_name = "N")]
    saturation: Option<f32>,
    /// Degrees, -180..=180
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    hue: Option<f32>,
    #[arg(long, value_name = "N")]
    grayscale: Option<f32>,
    #[arg(long, value_name = "N")]
    sepia: Option<f32>,
    #[arg(long, value_name = "N")]
    invert: Option<f32>,
    /// Gaussian sigma in pixels
    #[arg(long, value_name = "SIGMA")]
    blur: Option<f32>,
    /// Block size in pixels
    #[arg(long, value_name = "N")]
    pixelate: Option<f32>,
    #[arg(long = "edge-detect")]
    edge_detect: bool,
    #[arg(long, value_enum, value_name = "KERNEL")]
    kernel: Option<KernelArg>,
    /// Export the source unchanged
    #[arg(long = "show-original")]
    show_original: bool,
    /// Also write the display-scaled preview as PNG
    #[arg(long = "preview-out", value_name = "FILE")]
    preview_out: Option<PathBuf>,
    #[arg(long, value_name = "Z")]
    zoom: Option<f32>,
    /// Device pixel ratio used for the preview backing store
    #[arg(long, value_name = "R")]
    dpr: Option<f32>,
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KernelArg {
    None,
    Sharpen,
    Blur,
    Emboss,
}

impl From<KernelArg> for PostKernel {
    fn from(value: KernelArg) -> Self {
        match value {
            KernelArg::None => PostKernel::None,
            KernelArg::Sharpen => PostKernel::Sharpen,
            KernelArg::Blur => PostKernel::Blur,
            KernelArg::Emboss => PostKernel::Emboss,
        }
    }
}

impl Args {
    fn filter_update(&self) -> FilterUpdate {
        FilterUpdate {
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            hue: self.hue,
            grayscale: self.grayscale,
            sepia: self.sepia,
            invert: self.invert,
            blur: self.blur,
            pixelate: self.pixelate,
            edge_detect: self.edge_detect.then_some(true),
            post_kernel: self.kernel.map(PostKernel::from),
            show_original: self.show_original.then_some(true),
        }
    }

    fn preview_options(&self, base: PreviewOptions) -> PreviewOptions {
        PreviewOptions {
            zoom: self.zoom.unwrap_or(base.zoom),
            device_pixel_ratio: self.dpr.unwrap_or(base.device_pixel_ratio),
            ..base
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise -v picks the level (default = info)
    let fallback = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .compact()
        .init();

    let cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
            .validated()
            .context("invalid configuration values")?,
        None => Configuration::default(),
    };
    tracing::debug!("configuration: {:#?}", cfg);

    let mut update = FilterUpdate::default();
    if let Some(name) = &args.preset {
        update = update.merged(cfg.preset(name)?);
    }
    update = update.merged(&args.filter_update());
    let preview = args.preview_options(cfg.preview);

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    // Channels (small/bounded)
    let depth = cfg.render_queue_depth;
    let (command_tx, command_rx) = mpsc::channel::<EditorCommand>(depth); // CLI -> Editor
    let (request_tx, request_rx) = mpsc::channel::<RenderRequest>(depth); // Editor -> Render
    let (rendered_tx, rendered_rx) = mpsc::channel::<RenderedFrame>(depth); // Render -> Editor
    let (display_tx, display_rx) = watch::channel::<Option<DisplayFrame>>(None); // Editor -> display

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Render worker
    tasks.spawn({
        let cancel = cancel.clone();
        let pipeline = FilterPipeline::new(cfg.edge_policy);
        async move {
            tasks::render::run(request_rx, rendered_tx, cancel, pipeline)
                .await
                .context("render task failed")
        }
    });

    // Editor
    tasks.spawn({
        let cancel = cancel.clone();
        let session = Session::from_config(&cfg);
        async move {
            tasks::editor::run(
                command_rx,
                request_tx,
                rendered_rx,
                display_tx,
                cancel,
                session,
                preview,
            )
            .await
            .context("editor task failed")
        }
    });

    let outcome = edit(command_tx, bytes, update, &args).await;
    if outcome.is_err() {
        cancel.cancel();
    }

    // Drain JoinSet (wait for other tasks to complete)
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    let exported = outcome?;
    write_file(&args.output, &exported)?;
    tracing::info!("wrote {}", args.output.display());

    if let Some(path) = &args.preview_out {
        let frame = display_rx
            .borrow()
            .clone()
            .context("no preview frame was produced")?;
        let png = session::encode_png(&frame.frame).context("failed to encode preview")?;
        write_file(path, &png)?;
        tracing::info!(
            "wrote {}x{} preview to {}",
            frame.frame.width(),
            frame.frame.height(),
            path.display()
        );
    }

    Ok(())
}

/// Loads `bytes`, applies `update` and returns the exported PNG. Dropping
/// `commands` on return lets the editor wind down.
async fn edit(
    commands: mpsc::Sender<EditorCommand>,
    bytes: Vec<u8>,
    update: FilterUpdate,
    args: &Args,
) -> Result<Vec<u8>> {
    if !update.is_empty() {
        commands
            .send(EditorCommand::SetParameters(update))
            .await
            .context("editor stopped")?;
    }

    let (reply, loaded) = oneshot::channel();
    commands
        .send(EditorCommand::LoadEncoded { bytes, reply })
        .await
        .context("editor stopped")?;
    loaded
        .await
        .context("editor stopped before the image was loaded")?
        .with_context(|| format!("failed to decode {}", args.input.display()))?;

    let (reply, exported) = oneshot::channel();
    commands
        .send(EditorCommand::Export { reply })
        .await
        .context("editor stopped")?;
    let png = exported
        .await
        .context("editor stopped before export finished")?
        .context("failed to export image")?;
    Ok(png)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
