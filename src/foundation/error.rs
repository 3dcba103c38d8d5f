/// Result alias used across the crate.
pub type AffirmResult<T> = Result<T, AffirmError>;

/// Every failure a render unit can surface to its caller.
#[derive(thiserror::Error, Debug)]
pub enum AffirmError {
    /// No candidate base images were available to render onto.
    #[error("no base images found in {0}")]
    DiscoveryEmpty(String),

    /// The base image could not be read, is corrupt, or uses an unsupported codec.
    #[error("decode error: {0}")]
    Decode(String),

    /// The font program could not be read or parsed.
    #[error("font parse error: {0}")]
    FontParse(String),

    /// The destination extension is not one of `png`, `jpg`, `jpeg`.
    #[error("unsupported output format: '{0}'")]
    UnsupportedOutputFormat(String),

    /// Encoding or writing the output failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Glyph rendering failed.
    #[error("draw error: {0}")]
    Draw(String),

    /// Caller-supplied options are out of range.
    #[error("validation error: {0}")]
    Validation(String),

    /// Settings or affirmation list I/O failed.
    #[error("settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AffirmError {
    pub fn discovery_empty(source: impl Into<String>) -> Self {
        Self::DiscoveryEmpty(source.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn font_parse(msg: impl Into<String>) -> Self {
        Self::FontParse(msg.into())
    }

    pub fn unsupported_output_format(ext: impl Into<String>) -> Self {
        Self::UnsupportedOutputFormat(ext.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn draw(msg: impl Into<String>) -> Self {
        Self::Draw(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            AffirmError::decode("x")
                .to_string()
                .contains("decode error:")
        );
        assert!(
            AffirmError::font_parse("x")
                .to_string()
                .contains("font parse error:")
        );
        assert!(
            AffirmError::encode("x")
                .to_string()
                .contains("encode error:")
        );
        assert!(AffirmError::draw("x").to_string().contains("draw error:"));
        assert!(
            AffirmError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            AffirmError::settings("x")
                .to_string()
                .contains("settings error:")
        );
    }

    #[test]
    fn unsupported_format_and_discovery_name_their_input() {
        let err = AffirmError::unsupported_output_format(".txt");
        assert_eq!(err.to_string(), "unsupported output format: '.txt'");

        let err = AffirmError::discovery_empty("'bases'");
        assert_eq!(err.to_string(), "no base images found in 'bases'");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = AffirmError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
