use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sha2::Digest as _;

use affirmer::{
    BasePolicy, BatchSummary, BatchThreading, FaceCache, FontSource, OutputNaming, RenderOptions,
    Rgba8, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "affirmer", version, about = "Render affirmations onto images")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one affirmation onto one base image.
    Render(RenderArgs),
    /// Render many affirmations onto base images from a file or directory.
    Batch(BatchArgs),
    /// List the base images found at a path.
    Discover(DiscoverArgs),
    /// Print the family name and SHA-256 of a font.
    FontInfo(FontInfoArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// TrueType/OpenType font file; the embedded font is used when omitted.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Point size.
    #[arg(long)]
    size: Option<f32>,

    /// Fill color (`#RRGGBB` or `#RRGGBBAA`).
    #[arg(long)]
    color: Option<Rgba8>,

    /// Outline color (`#RRGGBB` or `#RRGGBBAA`).
    #[arg(long)]
    outline_color: Option<Rgba8>,

    /// Horizontal inset of the text rect.
    #[arg(long)]
    margin_x: Option<i32>,

    /// Vertical inset of the text rect.
    #[arg(long)]
    margin_y: Option<i32>,

    /// Explicit text rect width.
    #[arg(long)]
    width: Option<u32>,

    /// Explicit text rect height.
    #[arg(long)]
    height: Option<u32>,
}

impl StyleArgs {
    fn apply(&self, mut opts: RenderOptions) -> RenderOptions {
        if let Some(font) = &self.font {
            opts.font = FontSource::from_optional_path(Some(font.as_path()));
        }
        if let Some(size) = self.size {
            opts.point_size = size;
        }
        if let Some(color) = self.color {
            opts.fill = color;
        }
        if let Some(color) = self.outline_color {
            opts.outline = color;
        }
        if let Some(x) = self.margin_x {
            opts.origin.0 = x;
        }
        if let Some(y) = self.margin_y {
            opts.origin.1 = y;
        }
        opts.width = self.width.or(opts.width);
        opts.height = self.height.or(opts.height);
        opts
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Base image (PNG or JPEG).
    #[arg(long)]
    base: PathBuf,

    /// Affirmation text.
    #[arg(long)]
    text: String,

    /// Output path; `.png`, `.jpg` or `.jpeg`.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Base image file or directory of base images.
    #[arg(long)]
    bases: PathBuf,

    /// Output directory; falls back to `outputFolder` from the settings file.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Settings JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Affirmation list file, one per line.
    #[arg(long)]
    affirmations: Option<PathBuf>,

    /// Affirmation text; repeatable. Takes precedence over list files and settings.
    #[arg(long = "text")]
    texts: Vec<String>,

    /// Render every affirmation onto every base image.
    #[arg(long, conflicts_with = "random")]
    all: bool,

    /// Pick a random base image per affirmation.
    #[arg(long)]
    random: bool,

    /// Seed for random base selection.
    #[arg(long)]
    seed: Option<u64>,

    /// Output file name prefix.
    #[arg(long, default_value = "affirmation_")]
    prefix: String,

    /// Output image format.
    #[arg(long, value_enum, default_value_t = FormatChoice::Png)]
    format: FormatChoice,

    /// Render on a worker pool.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count (implies --parallel).
    #[arg(long)]
    threads: Option<usize>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct DiscoverArgs {
    /// Base image file or directory.
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct FontInfoArgs {
    /// Font file; the embedded font is described when omitted.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpg,
}

impl FormatChoice {
    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Batch(args) => cmd_batch(args),
        Command::Discover(args) => cmd_discover(args),
        Command::FontInfo(args) => cmd_font_info(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = args.style.apply(RenderOptions::default());
    let cache = FaceCache::new();

    create_parent_dir(&args.out)?;
    affirmer::render_to_file(&args.base, &args.text, &opts, &args.out, &cache)
        .with_context(|| format!("render '{}'", args.base.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let affirmations = if !args.texts.is_empty() {
        args.texts.clone()
    } else if let Some(path) = &args.affirmations {
        affirmer::load_affirmations(path)?
    } else {
        settings.affirmations.clone()
    };

    let out_dir = args
        .out_dir
        .clone()
        .or_else(|| settings.output_dir())
        .context("no output directory: pass --out-dir or set outputFolder in settings")?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir '{}'", out_dir.display()))?;

    let seed = args.seed.unwrap_or_else(clock_seed);
    let policy = if args.all {
        BasePolicy::EachBase
    } else if args.random {
        BasePolicy::Random { seed }
    } else {
        settings.base_policy(seed)
    };

    let naming = OutputNaming {
        prefix: args.prefix.clone(),
        extension: args.format.extension().to_string(),
    };
    let jobs = affirmer::discover_and_plan(&args.bases, &affirmations, policy, &naming, &out_dir)?;
    tracing::debug!(jobs = jobs.len(), ?policy, "planned batch");

    let opts = args.style.apply(settings.render_options());
    let threading = BatchThreading {
        parallel: args.parallel || args.threads.is_some(),
        threads: args.threads,
    };
    let cache = FaceCache::new();
    let items = affirmer::batch_render(&jobs, &opts, &cache, &threading)?;

    for item in &items {
        if let Err(e) = &item.result {
            eprintln!("failed {}: {e}", item.job.out.display());
        }
    }
    let summary = BatchSummary::of(&items);
    eprintln!(
        "generated {}/{} images in {}",
        summary.succeeded,
        summary.total,
        out_dir.display()
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} images failed", summary.failed, summary.total);
    }
    Ok(())
}

fn cmd_discover(args: DiscoverArgs) -> anyhow::Result<()> {
    let found = affirmer::discover_base_images(&args.path);
    if found.is_empty() {
        anyhow::bail!(affirmer::AffirmError::discovery_empty(format!(
            "'{}'",
            args.path.display()
        )));
    }
    for path in found {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_font_info(args: FontInfoArgs) -> anyhow::Result<()> {
    let source = FontSource::from_optional_path(args.font.as_deref());
    let program = source.load()?;

    let label = match &source {
        FontSource::Embedded => "<embedded>".to_string(),
        FontSource::Path(p) => p.display().to_string(),
    };
    println!("source: {label}");
    println!("family: {}", program.family());
    println!("sha256: {}", sha256_hex(program.bytes()));
    Ok(())
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
