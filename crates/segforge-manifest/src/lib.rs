//! # segforge-manifest
//!
//! Turns playlist manifest text into an ordered list of
//! [`SegmentReference`]s.
//!
//! Parsing never fails on an individual line. Blank lines and `#` lines never
//! produce a segment; relative lines without a base location are dropped and
//! reported as a [`ManifestWarning`]. Directive lines are inspected for
//! encryption and playlist-shape information (see [`directive`]).
//!
//! ## Quick Start
//!
//! ```
//! use segforge_manifest::parse;
//!
//! let text = "seg0.jpeg\nhttps://cdn.example/seg1.jpeg\n# comment\n\n";
//! let manifest = parse(text, Some("https://cdn.example/clips"));
//!
//! assert_eq!(manifest.references.len(), 2);
//! assert_eq!(manifest.references[0].location, "https://cdn.example/clips/seg0.jpeg");
//! assert_eq!(manifest.references[1].location, "https://cdn.example/seg1.jpeg");
//! ```

pub mod directive;
mod error;

use std::path::Path;

use segforge_common::SegmentReference;
use serde::Serialize;

pub use directive::Encryption;
pub use error::{Error, Result};

/// The result of parsing a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Segment references in manifest line order.
    pub references: Vec<SegmentReference>,
    /// Non-fatal problems found while parsing.
    pub warnings: Vec<ManifestWarning>,
    /// Encryption declared by an `#EXT-X-KEY` directive, if any.
    pub encryption: Option<Encryption>,
    /// Whether the playlist carried `#EXT-X-ENDLIST`.
    pub is_endlist: bool,
}

impl Manifest {
    /// Locations of all references, in order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.references.iter().map(|r| r.location.as_str())
    }
}

/// A non-fatal problem found on a manifest line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestWarning {
    /// A relative segment line appeared but no base location was given.
    MissingBase {
        /// 1-based line number.
        line: usize,
        /// The relative location that was dropped.
        location: String,
    },
    /// The segments are encrypted; assembly will almost certainly fail.
    Encrypted {
        /// 1-based line number of the key directive.
        line: usize,
        /// Declared encryption method.
        method: String,
    },
    /// The playlist lists variant streams rather than media segments.
    VariantPlaylist {
        /// 1-based line number of the stream-info directive.
        line: usize,
    },
}

impl std::fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBase { line, location } => write!(
                f,
                "line {line}: skipping relative segment path without base URL: {location}"
            ),
            Self::Encrypted { line, method } => write!(
                f,
                "line {line}: playlist declares {method} encryption; segments cannot be decrypted"
            ),
            Self::VariantPlaylist { line } => write!(
                f,
                "line {line}: playlist lists variant streams, not media segments"
            ),
        }
    }
}

/// Parse manifest text, resolving relative lines against `base`.
pub fn parse(text: &str, base: Option<&str>) -> Manifest {
    let base = base.map(str::trim).filter(|b| !b.is_empty());
    let mut manifest = Manifest::default();

    for (line_no, raw) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(tag) = line.strip_prefix('#') {
            apply_directive(&mut manifest, line_no, tag);
            continue;
        }

        let is_absolute = is_absolute_url(line);
        let location = if is_absolute {
            line.to_string()
        } else if let Some(base) = base {
            join_base(base, line)
        } else {
            manifest.warnings.push(ManifestWarning::MissingBase {
                line: line_no,
                location: line.to_string(),
            });
            continue;
        };

        manifest.references.push(SegmentReference {
            index: manifest.references.len(),
            location,
            is_absolute,
        });
    }

    manifest
}

/// Read and parse a manifest file.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file is missing or unreadable. Individual
/// lines never cause an error.
pub fn parse_file(path: &Path, base: Option<&str>) -> Result<Manifest> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&text, base))
}

fn apply_directive(manifest: &mut Manifest, line_no: usize, tag: &str) {
    match directive::Directive::parse(tag) {
        Some(directive::Directive::Key(Some(encryption))) => {
            manifest.warnings.push(ManifestWarning::Encrypted {
                line: line_no,
                method: encryption.method.clone(),
            });
            if manifest.encryption.is_none() {
                manifest.encryption = Some(encryption);
            }
        }
        Some(directive::Directive::StreamInf) => {
            manifest
                .warnings
                .push(ManifestWarning::VariantPlaylist { line: line_no });
        }
        Some(directive::Directive::EndList) => manifest.is_endlist = true,
        Some(directive::Directive::Key(None)) | None => {}
    }
}

/// Whether `location` is an `http://` or `https://` URL.
///
/// Any other line, including other schemes, is a path relative to the base.
///
/// ```
/// use segforge_manifest::is_absolute_url;
///
/// assert!(is_absolute_url("https://cdn.example/a.ts"));
/// assert!(is_absolute_url("HTTP://cdn.example/a.ts"));
/// assert!(!is_absolute_url("clips/a.ts"));
/// assert!(!is_absolute_url("/clips/a.ts"));
/// assert!(!is_absolute_url("ftp://cdn.example/a.ts"));
/// ```
pub fn is_absolute_url(location: &str) -> bool {
    let Some((scheme, _)) = location.split_once("://") else {
        return false;
    };
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// Join a relative location onto a base with exactly one separating slash.
///
/// ```
/// use segforge_manifest::join_base;
///
/// assert_eq!(join_base("https://x/clips/", "/a.ts"), "https://x/clips/a.ts");
/// assert_eq!(join_base("https://x/clips", "a.ts"), "https://x/clips/a.ts");
/// ```
pub fn join_base(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
