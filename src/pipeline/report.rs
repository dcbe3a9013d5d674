use segforge_av::assembly::AssemblyReport;
use segforge_common::SegmentKind;
use segforge_manifest::{Encryption, Manifest};
use serde::Serialize;

use crate::fetch::FetchReport;
use crate::validate::ValidationReport;

/// What the manifest contained, minus the references themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestSummary {
    pub segments: usize,
    pub warnings: Vec<String>,
    pub encryption: Option<Encryption>,
    pub is_endlist: bool,
}

impl From<&Manifest> for ManifestSummary {
    fn from(manifest: &Manifest) -> Self {
        Self {
            segments: manifest.references.len(),
            warnings: manifest.warnings.iter().map(ToString::to_string).collect(),
            encryption: manifest.encryption.clone(),
            is_endlist: manifest.is_endlist,
        }
    }
}

/// Everything a `run` learned, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub kind: SegmentKind,
    pub manifest: Option<ManifestSummary>,
    pub fetch: Option<FetchReport>,
    pub validation: Option<ValidationReport>,
    pub assembly: Option<AssemblyReport>,
}

impl RunReport {
    pub(crate) fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            manifest: None,
            fetch: None,
            validation: None,
            assembly: None,
        }
    }

    /// False only when an assembly was requested and exhausted its ladder.
    pub fn succeeded(&self) -> bool {
        self.assembly.as_ref().map_or(true, AssemblyReport::succeeded)
    }

    /// Whether any stage stopped early because of cancellation.
    pub fn cancelled(&self) -> bool {
        self.fetch.as_ref().is_some_and(|f| f.cancelled)
            || self.validation.as_ref().is_some_and(|v| v.cancelled)
            || self.assembly.as_ref().is_some_and(|a| a.cancelled)
    }
}
