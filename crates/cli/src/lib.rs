use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comicflip_core::{open_comic, PageKind, PageSource, SourceKind};
use comicflip_render::{FitMode, Quality, ResizeBackend};
use comicflip_viewer::{
    default_backend, DisplaySurface, Frame, NavTarget, PipelineConfig, PreviewPolicy,
    SharedViewport, UiLoop, Viewer,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "comicflip")]
#[command(about = "Comic book archive viewer")]
pub struct Cli {
    /// Pipeline config file (TOML).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of render worker threads.
    #[arg(long, global = true, value_name = "N")]
    workers: Option<usize>,

    /// Write logs to FILE instead of stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the pages of a comic in display order.
    Pages {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Render one page to a PNG file.
    Render {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 1200)]
        height: u32,
        /// contain or width; defaults to the configured fit.
        #[arg(long)]
        fit: Option<FitMode>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive a headless viewer and print every frame it shows as a JSON line.
    Browse {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 1200)]
        height: u32,
        /// Comma-separated: first, prev, next, last, wait, resize=WxH.
        #[arg(long, value_delimiter = ',')]
        steps: Vec<Step>,
        /// never, after-first-render or always; defaults to the configured policy.
        #[arg(long)]
        preview: Option<PreviewPolicy>,
    },
    /// Print CLI version.
    Version,
}

/// One scripted action for `browse`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Debounced navigation request
    Nav(NavTarget),
    /// Let the debouncer fire and the workers drain
    Wait,
    Resize(u32, u32),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("wait") {
            return Ok(Self::Wait);
        }
        if let Some(size) = s.strip_prefix("resize=") {
            let (width, height) =
                size.split_once('x').ok_or_else(|| format!("expected resize=WxH, got '{s}'"))?;
            let width = width.parse().map_err(|_| format!("bad width in '{s}'"))?;
            let height = height.parse().map_err(|_| format!("bad height in '{s}'"))?;
            return Ok(Self::Resize(width, height));
        }
        s.parse().map(Self::Nav)
    }
}

#[derive(Debug, Serialize)]
struct PagesOutput {
    path: String,
    container: &'static str,
    page_count: usize,
    pages: Vec<PageEntry>,
}

#[derive(Debug, Serialize)]
struct PageEntry {
    number: usize,
    kind: &'static str,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum BrowseEvent<'a> {
    Frame { page_index: usize, width: u32, height: u32, quality: Quality },
    Info { name: &'a str },
    Done { page_index: usize, generation: u64, cached: usize, title: String },
}

fn emit(event: &BrowseEvent<'_>) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => log::warn!("Could not serialize browse event: {e}"),
    }
}

/// Prints what the viewer draws, one JSON object per line.
struct JsonLinesSurface;

impl DisplaySurface for JsonLinesSurface {
    fn show_page(&mut self, frame: &Frame) {
        emit(&BrowseEvent::Frame {
            page_index: frame.page_index,
            width: frame.image.width(),
            height: frame.image.height(),
            quality: frame.quality,
        });
    }

    fn show_info(&mut self, name: &str, _text: &str) {
        emit(&BrowseEvent::Info { name });
    }

    fn hide_info(&mut self) {}

    fn clear(&mut self) {}

    fn set_title(&mut self, title: &str) {
        log::debug!("Title: {title}");
    }
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.log.as_deref())?;

    match &cli.command {
        Commands::Pages { path, json } => run_pages(path, *json),
        Commands::Render { path, page, width, height, fit, output } => {
            let config = load_config(&cli)?;
            run_render(&config, path, *page, (*width, *height), *fit, output.as_deref())
        }
        Commands::Browse { path, width, height, steps, preview } => {
            let mut config = load_config(&cli)?;
            if let Some(preview) = preview {
                config = config.with_preview(*preview);
            }
            run_browse(config, path, (*width, *height), steps)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(log: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log {
        let file = fs::File::create(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    // Only the first logger of the process wins
    let _ = builder.try_init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    Ok(config.validate()?)
}

fn open_source(path: &Path) -> Result<Box<dyn PageSource>> {
    open_comic(path).with_context(|| format!("failed to open {}", path.display()))
}

fn run_pages(path: &Path, json: bool) -> Result<()> {
    let source = open_source(path)?;
    let pages: Vec<PageEntry> = source
        .pages()
        .iter()
        .enumerate()
        .map(|(i, name)| PageEntry { number: i + 1, kind: page_kind_label(name), name: name.clone() })
        .collect();

    if json {
        let payload = PagesOutput {
            path: path.display().to_string(),
            container: source_kind_label(source.kind()),
            page_count: pages.len(),
            pages,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for page in &pages {
            println!("{:>4}  {:<5}  {}", page.number, page.kind, page.name);
        }
    }

    source.cleanup();
    Ok(())
}

fn run_render(
    config: &PipelineConfig,
    path: &Path,
    page: usize,
    (width, height): (u32, u32),
    fit: Option<FitMode>,
    output: Option<&Path>,
) -> Result<()> {
    if page == 0 {
        bail!("--page is 1-based and must be >= 1");
    }
    if width == 0 || height == 0 {
        bail!("--width and --height must be >= 1");
    }

    let source = open_source(path)?;
    let name = source
        .page_name(page - 1)
        .with_context(|| format!("page {page} is out of range (1..={})", source.len()))?
        .to_string();
    if PageKind::of(&name) != Some(PageKind::Image) {
        bail!("page {page} ({name}) is not an image");
    }

    let bytes = source.get_bytes(&name).with_context(|| format!("failed to read page {name}"))?;
    let rendered = default_backend(config)
        .render(&bytes, width, height, fit.unwrap_or(config.fit))
        .with_context(|| format!("failed to render page {name}"))?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(path, page));
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    rendered
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image to {}", output.display()))?;
    log::info!(
        "Rendered page {page} at {}x{} to {}",
        rendered.width(),
        rendered.height(),
        output.display()
    );
    println!("{}", output.display());

    source.cleanup();
    Ok(())
}

fn run_browse(
    config: PipelineConfig,
    path: &Path,
    (width, height): (u32, u32),
    steps: &[Step],
) -> Result<()> {
    let ui = UiLoop::new();
    let viewport = SharedViewport::new(width, height);
    let mut viewer = Viewer::new(config, ui.dispatcher(), viewport.clone(), JsonLinesSurface);

    viewer.open(path).with_context(|| format!("failed to open {}", path.display()))?;
    settle(&ui, &mut viewer)?;

    for step in steps {
        match *step {
            Step::Nav(target) => viewer.request_nav(target),
            Step::Wait => settle(&ui, &mut viewer)?,
            Step::Resize(width, height) => {
                viewport.set(width, height);
                viewer.on_viewport_resized();
            }
        }
        ui.pump(&mut viewer);
    }
    settle(&ui, &mut viewer)?;

    emit(&BrowseEvent::Done {
        page_index: viewer.current_index(),
        generation: viewer.generation(),
        cached: viewer.cache_len(),
        title: viewer.title(),
    });
    viewer.close();
    Ok(())
}

fn settle(ui: &UiLoop, viewer: &mut Viewer) -> Result<()> {
    if !ui.run_until_idle(viewer, SETTLE_TIMEOUT) {
        bail!("viewer did not settle within {}s", SETTLE_TIMEOUT.as_secs());
    }
    Ok(())
}

fn page_kind_label(name: &str) -> &'static str {
    match PageKind::of(name) {
        Some(PageKind::Image) => "image",
        Some(PageKind::Text) => "info",
        None => "other",
    }
}

fn source_kind_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Zip => "zip",
        SourceKind::Tar => "tar",
        SourceKind::Extracted => "extracted",
        SourceKind::Directory => "directory",
        SourceKind::SingleImage => "image",
    }
}

fn default_render_output(path: &Path, page: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|name| name.to_str()).unwrap_or("comic");

    path.with_file_name(format!("{stem}-page-{page}.png"))
}
