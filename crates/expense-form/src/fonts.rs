//! Font loading with fallback

use printpdf::ParsedFont;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Candidate font files, tried in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontSource {
    pub candidates: Vec<PathBuf>,
}

impl Default for FontSource {
    fn default() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("fonts/NotoSansSC.otf"),
                PathBuf::from("fonts/NotoSansSC-Regular.ttf"),
                PathBuf::from("fonts/SourceHanSansCN-Normal.otf"),
            ],
        }
    }
}

impl FontSource {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// The first candidate that can be read and parsed.
    ///
    /// Returns `None` when nothing usable is found; callers then draw with a
    /// built-in font, which cannot show CJK text.
    pub fn load(&self) -> Option<ParsedFont> {
        for path in &self.candidates {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::debug!("Font {} unavailable: {}", path.display(), e);
                    continue;
                }
            };

            let mut warnings = Vec::new();
            match ParsedFont::from_bytes(&bytes, 0, &mut warnings) {
                Some(font) => {
                    log::info!("Using font {}", path.display());
                    return Some(font);
                }
                None => log::warn!("Failed to parse font {}", path.display()),
            }
        }

        log::warn!("No usable font found, falling back to built-in Helvetica");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fonts_fall_back() {
        let source = FontSource::new(["/no/such/font.ttf"]);
        assert!(source.load().is_none());
    }

    #[test]
    fn test_unparseable_font_is_skipped() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();

        let source = FontSource::new([file.path()]);
        assert!(source.load().is_none());
    }
}
