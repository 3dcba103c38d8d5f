#![forbid(unsafe_code)]
//! Affirmation card renderer.
//!
//! Takes a base image and a short text, word-wraps the text to fit inside the image, centers
//! the block, draws it with a dark outline halo and writes the result as PNG or JPEG. A batch
//! layer pairs many affirmations with many base images and renders them in parallel.

pub mod assets;
pub mod foundation;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod settings;

pub use assets::{
    decode::{DecodedImage, decode_image, load_image},
    discover::{BASE_IMAGE_EXTENSIONS, discover_base_images},
    encode::{JPEG_QUALITY, OutputFormat, encode_canvas, save_canvas},
    font::{
        EMBEDDED_FONT, Face, FaceCache, FontProgram, FontSource, PositionedGlyph, ShapedLine,
        TextShaper,
    },
};
pub use foundation::{
    color::Rgba8,
    error::{AffirmError, AffirmResult},
    math::Rng64,
};
pub use layout::{
    FaceMeasure, LINE_HEIGHT_FACTOR, LayoutBlock, Line, Measure, PlacedLine, TextRect,
    ascender_offset, layout_block, line_height, place_lines, wrap_words,
};
pub use pipeline::{
    BasePolicy, BatchItem, BatchJob, BatchSummary, BatchThreading, OutputNaming, RenderOptions,
    batch_render, discover_and_plan, plan_batch, render, render_image,
    render_to_file,
};
pub use render::{
    canvas::Canvas,
    compositor::{OUTLINE_RADIUS, TextPaint, composite_block, outline_offsets},
};
pub use settings::{Settings, load_affirmations, parse_affirmations, save_affirmations};
