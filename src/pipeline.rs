use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    assets::{
        decode::{DecodedImage, load_image},
        discover::discover_base_images,
        encode::{OutputFormat, save_canvas},
        font::{Face, FaceCache, FontSource, TextShaper},
    },
    foundation::{
        color::Rgba8,
        error::{AffirmError, AffirmResult},
        math::Rng64,
    },
    layout::{FaceMeasure, TextRect, layout_block},
    render::{
        canvas::Canvas,
        compositor::{TextPaint, composite_block},
    },
};

/// Everything one render needs besides the base image and the text.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub font: FontSource,
    /// Point size at 72 DPI; must be finite and > 0.
    pub point_size: f32,
    pub fill: Rgba8,
    pub outline: Rgba8,
    /// Content-origin offset; the text rect is inset by this much on every side.
    pub origin: (i32, i32),
    /// Explicit text rect width, replacing `image_width - 2 * origin.0`.
    pub width: Option<u32>,
    /// Explicit text rect height, replacing `image_height - 2 * origin.1`.
    pub height: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font: FontSource::Embedded,
            point_size: 48.0,
            fill: Rgba8::WHITE,
            outline: Rgba8::BLACK,
            origin: (20, 20),
            width: None,
            height: None,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> AffirmResult<()> {
        if !self.point_size.is_finite() || self.point_size <= 0.0 {
            return Err(AffirmError::validation(
                "point size must be finite and > 0",
            ));
        }
        Ok(())
    }

    pub fn paint(&self) -> TextPaint {
        TextPaint {
            fill: self.fill,
            outline: self.outline,
        }
    }

    /// Text rect for an image of the given size.
    pub fn text_rect(&self, image_width: u32, image_height: u32) -> TextRect {
        TextRect::inset(
            image_width,
            image_height,
            self.origin,
            (self.width, self.height),
        )
    }
}

/// Lay out `text` and composite it onto a fresh canvas copy of `base`.
pub fn render_image(
    base: &DecodedImage,
    text: &str,
    options: &RenderOptions,
    face: &Face,
    shaper: &mut TextShaper,
) -> AffirmResult<Canvas> {
    options.validate()?;
    let mut canvas = Canvas::from_image(base)?;

    let rect = options.text_rect(canvas.width(), canvas.height());
    let block = layout_block(
        text,
        rect,
        face.point_size(),
        &mut FaceMeasure { shaper, face },
    )?;

    composite_block(&mut canvas, &block, face, shaper, options.paint())?;
    Ok(canvas)
}

/// Decode the base image at `base_path`, resolve the font, and render `text` onto it.
#[tracing::instrument(skip(text, options, cache), fields(chars = text.chars().count()))]
pub fn render(
    base_path: &Path,
    text: &str,
    options: &RenderOptions,
    cache: &FaceCache,
) -> AffirmResult<Canvas> {
    let mut shaper = TextShaper::new();
    render_with_shaper(base_path, text, options, cache, &mut shaper)
}

/// [`render`], then encode to `out_path` in the format named by its extension.
///
/// The extension is checked before any decoding or drawing happens.
pub fn render_to_file(
    base_path: &Path,
    text: &str,
    options: &RenderOptions,
    out_path: &Path,
    cache: &FaceCache,
) -> AffirmResult<()> {
    let mut shaper = TextShaper::new();
    render_to_file_with_shaper(base_path, text, options, out_path, cache, &mut shaper)
}

fn render_with_shaper(
    base_path: &Path,
    text: &str,
    options: &RenderOptions,
    cache: &FaceCache,
    shaper: &mut TextShaper,
) -> AffirmResult<Canvas> {
    options.validate()?;
    let base = load_image(base_path)?;
    let face = cache.face(&options.font, options.point_size)?;
    render_image(&base, text, options, &face, shaper)
}

fn render_to_file_with_shaper(
    base_path: &Path,
    text: &str,
    options: &RenderOptions,
    out_path: &Path,
    cache: &FaceCache,
    shaper: &mut TextShaper,
) -> AffirmResult<()> {
    OutputFormat::from_path(out_path)?;
    let canvas = render_with_shaper(base_path, text, options, cache, shaper)?;
    save_canvas(&canvas, out_path)
}

/// How base images are assigned to affirmations in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasePolicy {
    /// Every affirmation against every base image.
    EachBase,
    /// Every affirmation against the first base image.
    First,
    /// Every affirmation against the base image at this index.
    Fixed(usize),
    /// Each affirmation against a uniformly chosen base image.
    Random { seed: u64 },
}

/// Index-based output file naming: `{prefix}{n:03}.{extension}`, `n` starting at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            prefix: "affirmation_".to_string(),
            extension: "png".to_string(),
        }
    }
}

impl OutputNaming {
    pub fn file_name(&self, index: usize) -> String {
        format!("{}{:03}.{}", self.prefix, index + 1, self.extension)
    }
}

/// One independent (base, text) render unit and the path it writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchJob {
    pub base: PathBuf,
    pub text: String,
    pub out: PathBuf,
}

/// Expand base images and affirmations into render jobs with collision-free output paths.
pub fn plan_batch(
    bases: &[PathBuf],
    affirmations: &[String],
    policy: BasePolicy,
    naming: &OutputNaming,
    out_dir: &Path,
) -> AffirmResult<Vec<BatchJob>> {
    if bases.is_empty() {
        return Err(AffirmError::discovery_empty("an empty base image list"));
    }
    if affirmations.is_empty() {
        return Err(AffirmError::validation("no affirmations to generate"));
    }
    OutputFormat::from_path(Path::new(&naming.file_name(0)))?;

    let mut pairs: Vec<(&PathBuf, &String)> = Vec::new();
    match policy {
        BasePolicy::EachBase => {
            for text in affirmations {
                for base in bases {
                    pairs.push((base, text));
                }
            }
        }
        BasePolicy::First => pairs.extend(affirmations.iter().map(|t| (&bases[0], t))),
        BasePolicy::Fixed(i) => {
            let base = bases.get(i).ok_or_else(|| {
                AffirmError::validation(format!(
                    "base image index {i} out of range ({} available)",
                    bases.len()
                ))
            })?;
            pairs.extend(affirmations.iter().map(|t| (base, t)));
        }
        BasePolicy::Random { seed } => {
            let mut rng = Rng64::new(seed);
            for text in affirmations {
                pairs.push((&bases[rng.next_index(bases.len())], text));
            }
        }
    }

    Ok(pairs
        .into_iter()
        .enumerate()
        .map(|(i, (base, text))| BatchJob {
            base: base.clone(),
            text: text.clone(),
            out: out_dir.join(naming.file_name(i)),
        })
        .collect())
}

/// Discover base images under `base_input` and plan the batch over them.
pub fn discover_and_plan(
    base_input: &Path,
    affirmations: &[String],
    policy: BasePolicy,
    naming: &OutputNaming,
    out_dir: &Path,
) -> AffirmResult<Vec<BatchJob>> {
    let bases = discover_base_images(base_input);
    if bases.is_empty() {
        return Err(AffirmError::discovery_empty(format!(
            "'{}'",
            base_input.display()
        )));
    }
    plan_batch(&bases, affirmations, policy, naming, out_dir)
}

/// Threading controls for batch rendering.
#[derive(Clone, Debug, Default)]
pub struct BatchThreading {
    /// Render jobs on a worker pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

/// Outcome of one batch job.
#[derive(Debug)]
pub struct BatchItem {
    pub job: BatchJob,
    pub result: AffirmResult<()>,
}

/// Render every job, collecting per-job results in job order. A failing job is logged and
/// does not stop the others.
pub fn batch_render(
    jobs: &[BatchJob],
    options: &RenderOptions,
    cache: &FaceCache,
    threading: &BatchThreading,
) -> AffirmResult<Vec<BatchItem>> {
    let run = |job: &BatchJob, shaper: &mut TextShaper| -> BatchItem {
        let result =
            render_to_file_with_shaper(&job.base, &job.text, options, &job.out, cache, shaper);
        match &result {
            Ok(()) => tracing::debug!(out = %job.out.display(), "rendered"),
            Err(e) => tracing::warn!(
                base = %job.base.display(),
                out = %job.out.display(),
                error = %e,
                "render failed"
            ),
        }
        BatchItem {
            job: job.clone(),
            result,
        }
    };

    if !threading.parallel || jobs.len() < 2 {
        let mut shaper = TextShaper::new();
        return Ok(jobs.iter().map(|job| run(job, &mut shaper)).collect());
    }

    let pool = build_thread_pool(threading.threads)?;
    Ok(pool.install(|| {
        jobs.par_iter()
            .map_init(TextShaper::new, |shaper, job| run(job, shaper))
            .collect()
    }))
}

/// Counts over a finished batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn of(items: &[BatchItem]) -> Self {
        let succeeded = items.iter().filter(|i| i.result.is_ok()).count();
        Self {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> AffirmResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(AffirmError::validation(
            "batch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| AffirmError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}
