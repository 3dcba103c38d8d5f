use std::{
    borrow::Cow,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use crate::foundation::{
    error::{AffirmError, AffirmResult},
    math::Fnv1a64,
};

/// Font program compiled into the binary and used when no font path is configured.
pub static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Where a render takes its font program from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontSource {
    /// The font shipped inside the binary.
    #[default]
    Embedded,
    /// A TrueType/OpenType file on disk. Failing to read or parse it is an error; there is no
    /// fallback to the embedded font.
    Path(PathBuf),
}

impl FontSource {
    /// `None` or an empty/blank path selects the embedded font.
    pub fn from_optional_path(path: Option<&Path>) -> Self {
        match path {
            Some(p) if !p.as_os_str().to_string_lossy().trim().is_empty() => {
                Self::Path(p.to_path_buf())
            }
            _ => Self::Embedded,
        }
    }

    pub fn load(&self) -> AffirmResult<FontProgram> {
        match self {
            Self::Embedded => FontProgram::embedded(),
            Self::Path(p) => {
                let bytes = std::fs::read(p).map_err(|e| {
                    AffirmError::font_parse(format!("read font file '{}': {e}", p.display()))
                })?;
                FontProgram::parse(bytes).map_err(|e| match e {
                    AffirmError::FontParse(msg) => {
                        AffirmError::font_parse(format!("'{}': {msg}", p.display()))
                    }
                    other => other,
                })
            }
        }
    }
}

/// Parsed font program: raw bytes, resolved family name and the drawable font handle.
pub struct FontProgram {
    id: u64,
    family: String,
    bytes: Arc<Vec<u8>>,
    font: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for FontProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontProgram")
            .field("id", &format_args!("{:016x}", self.id))
            .field("family", &self.family)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FontProgram {
    /// Parse font bytes. At least one font family must be registered from them.
    pub fn parse(bytes: Vec<u8>) -> AffirmResult<Self> {
        let mut h = Fnv1a64::new_default();
        h.write_bytes(&bytes);
        let id = h.finish();

        let mut font_ctx = isolated_font_context();
        let family = register_family(&mut font_ctx, &bytes)?;

        let bytes = Arc::new(bytes);
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        Ok(Self {
            id,
            family,
            bytes,
            font,
        })
    }

    /// The font compiled into the binary.
    pub fn embedded() -> AffirmResult<Self> {
        Self::parse(EMBEDDED_FONT.to_vec())
            .map_err(|e| AffirmError::font_parse(format!("embedded font: {e}")))
    }

    /// Stable content identity (FNV-1a 64 of the bytes).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub(crate) fn cpu_font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }
}

/// A font program paired with a point size. Sizes are in points at 72 DPI, so one point is one
/// pixel.
#[derive(Clone, Debug)]
pub struct Face {
    program: Arc<FontProgram>,
    point_size: f32,
}

impl Face {
    pub fn new(program: Arc<FontProgram>, point_size: f32) -> AffirmResult<Self> {
        if !point_size.is_finite() || point_size <= 0.0 {
            return Err(AffirmError::validation(
                "font point size must be finite and > 0",
            ));
        }
        Ok(Self {
            program,
            point_size,
        })
    }

    pub fn program(&self) -> &FontProgram {
        &self.program
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }
}

/// One glyph of a shaped line, positioned relative to the pen origin on the baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// A shaped single line, ready to be stamped at any origin.
#[derive(Clone, Debug, Default)]
pub struct ShapedLine {
    pub glyphs: Vec<PositionedGlyph>,
    /// Advance width in pixels, unrounded.
    pub advance: f32,
}

/// Stateful shaping helper. Not shareable between threads; batch workers each own one.
pub struct TextShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    families: HashMap<u64, String>,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextShaper {
    pub fn new() -> Self {
        Self {
            font_ctx: isolated_font_context(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
        }
    }

    /// Pixel width of `text` set in `face`: the shaped advance width, rounded up.
    pub fn measure(&mut self, face: &Face, text: &str) -> AffirmResult<u32> {
        if text.is_empty() {
            return Ok(0);
        }
        let layout = self.build_layout(face, text)?;
        Ok(layout.width().max(0.0).ceil() as u32)
    }

    /// Shape `text` into positioned glyphs relative to the baseline origin.
    pub fn shape_line(&mut self, face: &Face, text: &str) -> AffirmResult<ShapedLine> {
        if text.is_empty() {
            return Ok(ShapedLine::default());
        }
        let layout = self.build_layout(face, text)?;

        let mut glyphs = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                // Positioned glyphs carry absolute pen coordinates within the layout.
                let baseline = run.baseline();
                glyphs.extend(run.positioned_glyphs().map(|g| PositionedGlyph {
                    id: g.id,
                    x: g.x,
                    y: g.y - baseline,
                }));
            }
        }
        if glyphs.is_empty() {
            return Err(AffirmError::draw(format!(
                "font '{}' produced no glyphs for {text:?}",
                face.program().family()
            )));
        }

        Ok(ShapedLine {
            glyphs,
            advance: layout.width(),
        })
    }

    fn family_for(&mut self, program: &FontProgram) -> AffirmResult<String> {
        if let Some(name) = self.families.get(&program.id()) {
            return Ok(name.clone());
        }
        let name = register_family(&mut self.font_ctx, program.bytes())?;
        self.families.insert(program.id(), name.clone());
        Ok(name)
    }

    fn build_layout(&mut self, face: &Face, text: &str) -> AffirmResult<parley::Layout<()>> {
        let family_name = self.family_for(face.program())?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(face.point_size()));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Explicit face cache keyed by (font source, point size). Safe for concurrent readers.
#[derive(Debug, Default)]
pub struct FaceCache {
    programs: RwLock<HashMap<FontSource, Arc<FontProgram>>>,
    faces: RwLock<HashMap<(FontSource, u32), Face>>,
}

impl FaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached face for `(source, point_size)`, loading it on first use. Load
    /// failures are returned and not cached.
    pub fn face(&self, source: &FontSource, point_size: f32) -> AffirmResult<Face> {
        let key = (source.clone(), point_size.to_bits());
        {
            let faces = self.faces.read().unwrap_or_else(|e| e.into_inner());
            if let Some(face) = faces.get(&key) {
                return Ok(face.clone());
            }
        }

        let program = self.program(source)?;
        let face = Face::new(program, point_size)?;
        self.faces
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert_with(|| face.clone());
        Ok(face)
    }

    pub fn len(&self) -> usize {
        self.faces.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn program(&self, source: &FontSource) -> AffirmResult<Arc<FontProgram>> {
        {
            let programs = self.programs.read().unwrap_or_else(|e| e.into_inner());
            if let Some(p) = programs.get(source) {
                return Ok(Arc::clone(p));
            }
        }

        let program = Arc::new(source.load()?);
        tracing::debug!(?source, family = program.family(), "loaded font program");
        let mut programs = self.programs.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(
            programs.entry(source.clone()).or_insert(program),
        ))
    }
}

/// Font context that only sees explicitly registered fonts, so shaping never falls back to a
/// system face whose glyph ids differ from the drawn font.
fn isolated_font_context() -> parley::FontContext {
    parley::FontContext {
        collection: parley::fontique::Collection::new(parley::fontique::CollectionOptions {
            shared: false,
            system_fonts: false,
        }),
        source_cache: parley::fontique::SourceCache::default(),
    }
}

fn register_family(font_ctx: &mut parley::FontContext, bytes: &[u8]) -> AffirmResult<String> {
    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| AffirmError::font_parse("no font families registered from font bytes"))?;

    font_ctx
        .collection
        .family_name(family_id)
        .map(str::to_string)
        .ok_or_else(|| AffirmError::font_parse("registered font family has no name"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_face(size: f32) -> Face {
        let program = Arc::new(FontSource::Embedded.load().unwrap());
        Face::new(program, size).unwrap()
    }

    #[test]
    fn embedded_font_parses_with_family_name() {
        let program = FontSource::Embedded.load().unwrap();
        assert!(!program.family().trim().is_empty());
        assert_eq!(program.bytes().len(), EMBEDDED_FONT.len());
    }

    #[test]
    fn garbage_bytes_are_a_font_parse_error() {
        let err = FontProgram::parse(b"not a font at all".to_vec()).unwrap_err();
        assert!(matches!(err, AffirmError::FontParse(_)), "{err}");
    }

    #[test]
    fn explicit_missing_path_does_not_fall_back() {
        let src = FontSource::Path(PathBuf::from("no/such/font.ttf"));
        let err = src.load().unwrap_err();
        assert!(matches!(err, AffirmError::FontParse(_)));
        assert!(err.to_string().contains("font.ttf"));
    }

    #[test]
    fn blank_path_selects_embedded() {
        assert_eq!(FontSource::from_optional_path(None), FontSource::Embedded);
        assert_eq!(
            FontSource::from_optional_path(Some(Path::new("  "))),
            FontSource::Embedded
        );
        assert_eq!(
            FontSource::from_optional_path(Some(Path::new("a.ttf"))),
            FontSource::Path(PathBuf::from("a.ttf"))
        );
    }

    #[test]
    fn face_rejects_non_positive_sizes() {
        let program = Arc::new(FontSource::Embedded.load().unwrap());
        assert!(Face::new(Arc::clone(&program), 0.0).is_err());
        assert!(Face::new(Arc::clone(&program), -3.0).is_err());
        assert!(Face::new(program, f32::NAN).is_err());
    }

    #[test]
    fn measure_is_deterministic_and_grows_with_text_and_size() {
        let mut shaper = TextShaper::new();
        let small = embedded_face(24.0);
        let large = embedded_face(48.0);

        let a = shaper.measure(&small, "I am worthy.").unwrap();
        let b = shaper.measure(&small, "I am worthy.").unwrap();
        assert_eq!(a, b);
        assert!(a > 0);

        let longer = shaper.measure(&small, "I am worthy. Always.").unwrap();
        assert!(longer > a);

        let bigger = shaper.measure(&large, "I am worthy.").unwrap();
        assert!(bigger > a);

        assert_eq!(shaper.measure(&small, "").unwrap(), 0);
    }

    #[test]
    fn shape_line_glyphs_sit_on_the_baseline_origin() {
        let mut shaper = TextShaper::new();
        let face = embedded_face(32.0);
        let shaped = shaper.shape_line(&face, "Hello world").unwrap();

        assert!(!shaped.glyphs.is_empty());
        assert!(shaped.glyphs[0].x.abs() < 1.0);
        for g in &shaped.glyphs {
            assert!(g.y.abs() < 0.5, "glyph y offset {} should be ~0", g.y);
        }
        let width = shaper.measure(&face, "Hello world").unwrap();
        assert_eq!(shaped.advance.ceil() as u32, width);
    }

    #[test]
    fn shaped_glyphs_advance_along_the_line() {
        let mut shaper = TextShaper::new();
        let face = embedded_face(32.0);
        let shaped = shaper.shape_line(&face, "Hello").unwrap();

        assert_eq!(shaped.glyphs.len(), 5);
        for pair in shaped.glyphs.windows(2) {
            assert!(pair[1].x > pair[0].x, "{:?}", shaped.glyphs);
        }
        let last = shaped.glyphs[4].x;
        assert!(last > shaped.advance / 2.0 && last < shaped.advance, "{last}");
    }

    #[test]
    fn embedded_program_matches_embedded_source() {
        let a = FontProgram::embedded().unwrap();
        let b = FontSource::Embedded.load().unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.family(), b.family());
    }

    #[test]
    fn cache_reuses_faces_per_source_and_size() {
        let cache = FaceCache::new();
        assert!(cache.is_empty());

        let a = cache.face(&FontSource::Embedded, 48.0).unwrap();
        let b = cache.face(&FontSource::Embedded, 48.0).unwrap();
        assert!(std::ptr::eq(a.program(), b.program()));
        assert_eq!(cache.len(), 1);

        let c = cache.face(&FontSource::Embedded, 24.0).unwrap();
        assert!(std::ptr::eq(a.program(), c.program()));
        assert_eq!(cache.len(), 2);

        let missing = FontSource::Path(PathBuf::from("no/such/font.ttf"));
        assert!(cache.face(&missing, 48.0).is_err());
        assert_eq!(cache.len(), 2);
    }
}
