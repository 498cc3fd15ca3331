//! Font resolution for the chart renderer and the PDF document.
//!
//! The two renderers use unrelated font systems: charts ask the host's font
//! configuration for a family by name (see [`chart`]), while the document
//! embeds a TrueType file found on disk, or the DejaVu Sans face compiled
//! into the binary when the search comes up empty.

pub mod chart;

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, info, warn};

/// Alias under which the resolved document font is registered.
pub const DOCUMENT_FONT_ALIAS: &str = "ReportFont";

/// Environment variable pointing at a directory with a preferred document font.
pub const FONTS_DIR_ENV: &str = "TREND_REPORT_FONTS_DIR";

/// File names looked up inside font directories, in order of preference.
const FONT_FILE_NAMES: &[&str] = &[
    "NanumGothic.ttf",
    "NotoSansKR-Regular.ttf",
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
];

/// Last-resort face compiled into the binary. Covers Latin text only.
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fallback/DejaVuSans.ttf");

/// Well-known system locations for the same faces.
const SYSTEM_FONT_FILES: &[&str] = &[
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/nanum/NanumGothic.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansKR-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/AppleGothic.ttf",
    "C:\\Windows\\Fonts\\malgun.ttf",
];

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

/// Returns every file the document font search would try, in order.
pub fn document_font_candidates() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = font_directory_candidates()
        .iter()
        .flat_map(|dir| FONT_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .collect();
    files.extend(SYSTEM_FONT_FILES.iter().map(PathBuf::from));
    files
}

/// Returns the first existing document font file, if any.
pub fn locate_document_font() -> Option<PathBuf> {
    document_font_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn load_font_file(path: &Path) -> Result<FontData, Error> {
    FontData::load(path, None).map_err(|err| {
        let io_kind = if path.is_file() {
            io::ErrorKind::InvalidData
        } else {
            io::ErrorKind::NotFound
        };
        Error::new(
            format!("Failed to load document font {}: {}", path.display(), err),
            io::Error::new(io_kind, err.to_string()),
        )
    })
}

/// Loads the built-in DejaVu Sans face.
pub fn embedded_font() -> Result<FontData, Error> {
    FontData::new(EMBEDDED_FONT.to_vec(), None)
}

fn located_font() -> Option<(PathBuf, FontData)> {
    let path = locate_document_font()?;
    match load_font_file(&path) {
        Ok(data) => Some((path, data)),
        Err(err) => {
            warn!("{}", err);
            None
        }
    }
}

/// Loads the document font family, using a single face for every style.
///
/// The first loadable file from [`document_font_candidates`] wins; without
/// one the embedded face is used, so only a broken build can fail here.
pub fn document_font_family() -> Result<FontFamily<FontData>, Error> {
    let regular = match located_font() {
        Some((path, data)) => {
            info!(
                "Document font '{}' registered from {}",
                DOCUMENT_FONT_ALIAS,
                path.display()
            );
            data
        }
        None => {
            warn!(
                "No document font found (set {} to a directory containing one of: {}); \
                 using built-in DejaVu Sans, which has no Hangul glyphs",
                FONTS_DIR_ENV,
                FONT_FILE_NAMES.join(", ")
            );
            embedded_font()?
        }
    };

    debug!("Reusing the regular face for bold and italic styles");
    Ok(FontFamily {
        bold: regular.clone(),
        italic: regular.clone(),
        bold_italic: regular.clone(),
        regular,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_start_with_font_directories() {
        let candidates = document_font_candidates();
        let manifest_fonts = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
        assert!(candidates
            .iter()
            .any(|path| path == &manifest_fonts.join(FONT_FILE_NAMES[0])));
        assert_eq!(
            candidates.last().map(PathBuf::as_path),
            Some(Path::new(SYSTEM_FONT_FILES[SYSTEM_FONT_FILES.len() - 1]))
        );
    }

    #[test]
    fn embedded_face_loads() {
        let face = embedded_font().expect("embedded font parses");
        let family = FontFamily {
            bold: face.clone(),
            italic: face.clone(),
            bold_italic: face.clone(),
            regular: face,
        };
        let document = genpdf::Document::new(family);
        let mut bytes = Vec::new();
        document.render(&mut bytes).expect("render with embedded font");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn broken_font_file_is_reported_not_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("DejaVuSans.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let err = match load_font_file(&path) {
            Ok(_) => panic!("garbage must not load as a font"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("DejaVuSans.ttf"));
    }
}
