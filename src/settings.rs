//! Persisted user preferences and affirmation list files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    assets::font::FontSource,
    foundation::{
        color::Rgba8,
        error::{AffirmError, AffirmResult},
    },
    pipeline::{BasePolicy, RenderOptions},
};

/// Flat settings record, stored as camelCase JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub output_folder: String,
    /// Empty selects the embedded font.
    pub font_path: String,
    pub font_size: f32,
    pub text_color: Rgba8,
    pub random_base: bool,
    pub process_all_images: bool,
    pub affirmations: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            font_path: String::new(),
            font_size: 48.0,
            text_color: Rgba8::WHITE,
            random_base: false,
            process_all_images: false,
            affirmations: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> AffirmResult<Self> {
        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file missing; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AffirmError::settings(format!(
                    "read '{}': {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice(&data)
            .map_err(|e| AffirmError::settings(format!("parse '{}': {e}", path.display())))
    }

    /// Write settings to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> AffirmResult<()> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| AffirmError::settings(format!("serialize settings: {e}")))?;
        std::fs::write(path, data)
            .map_err(|e| AffirmError::settings(format!("write '{}': {e}", path.display())))
    }

    pub fn font_source(&self) -> FontSource {
        FontSource::from_optional_path(Some(Path::new(&self.font_path)))
    }

    /// Render options with these settings applied on top of the defaults.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            font: self.font_source(),
            point_size: self.font_size,
            fill: self.text_color,
            ..RenderOptions::default()
        }
    }

    /// `processAllImages` wins over `randomBase`; with neither set the first base is used.
    pub fn base_policy(&self, seed: u64) -> BasePolicy {
        if self.process_all_images {
            BasePolicy::EachBase
        } else if self.random_base {
            BasePolicy::Random { seed }
        } else {
            BasePolicy::First
        }
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let trimmed = self.output_folder.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

/// One affirmation per line; lines are trimmed and blank lines dropped.
pub fn load_affirmations(path: &Path) -> AffirmResult<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AffirmError::settings(format!("read '{}': {e}", path.display())))?;
    Ok(parse_affirmations(&text))
}

pub fn parse_affirmations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn save_affirmations(path: &Path, items: &[String]) -> AffirmResult<()> {
    std::fs::write(path, items.join("\n"))
        .map_err(|e| AffirmError::settings(format!("write '{}': {e}", path.display())))
}
