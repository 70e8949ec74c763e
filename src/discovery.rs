//! Job source: one unit of work per project directory with an input spec

use crate::error::SweepError;
use crate::progress::ProgressStore;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-unit directory holding inputs and outputs.
pub const OUTPUT_DIR: &str = "ai-generated";
/// Required input artifact inside [`OUTPUT_DIR`].
pub const SPEC_FILE: &str = "specification.yaml";
/// Expected output artifact inside [`OUTPUT_DIR`].
pub const REQUIREMENTS_FILE: &str = "requirements.md";
/// Optional secondary input inside [`OUTPUT_DIR`].
pub const MARKET_SPEC_FILE: &str = "market-enhanced-spec.yaml";

/// Label used by [`platform_distribution`] for specs without `project.type`.
pub const UNDECLARED: &str = "undeclared";

/// One project directory awaiting generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    /// Directory name; stable across runs
    pub id: String,
    pub dir: Utf8PathBuf,
    pub spec_path: Utf8PathBuf,
    pub output_path: Utf8PathBuf,
}

impl UnitOfWork {
    #[must_use]
    pub fn new(root: &Utf8Path, id: &str) -> Self {
        let dir = root.join(id);
        let outputs = dir.join(OUTPUT_DIR);
        Self {
            id: id.to_string(),
            spec_path: outputs.join(SPEC_FILE),
            output_path: outputs.join(REQUIREMENTS_FILE),
            dir,
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.dir.join(OUTPUT_DIR)
    }

    #[must_use]
    pub fn market_spec_path(&self) -> Utf8PathBuf {
        self.output_dir().join(MARKET_SPEC_FILE)
    }
}

/// Snapshot the units that still need work.
///
/// Yields every immediate subdirectory of `root` that has an input spec and
/// no outcome record. Order follows the filesystem's enumeration order.
///
/// # Errors
///
/// [`SweepError::Discovery`] when `root` cannot be listed.
pub fn discover(root: &Utf8Path, store: &ProgressStore) -> Result<Vec<UnitOfWork>, SweepError> {
    let entries = root.read_dir_utf8().map_err(|e| SweepError::Discovery {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut units = Vec::new();
    let mut already_recorded = 0usize;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root, error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.path().is_dir() {
            continue;
        }

        let id = entry.file_name();
        if store.is_complete(id) {
            already_recorded += 1;
            continue;
        }

        let unit = UnitOfWork::new(root, id);
        if unit.spec_path.is_file() {
            units.push(unit);
        } else {
            debug!(unit = id, "no {SPEC_FILE}, not eligible");
        }
    }

    debug!(
        root = %root,
        queued = units.len(),
        already_recorded,
        "discovery finished"
    );
    Ok(units)
}

#[derive(Debug, Deserialize)]
struct SpecHeader {
    project: Option<ProjectHeader>,
}

#[derive(Debug, Deserialize)]
struct ProjectHeader {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// `project.type` as declared in the unit's input spec, if readable.
///
/// The declaration is only used for previews; the tool decides the real
/// platform.
#[must_use]
pub fn declared_platform(unit: &UnitOfWork) -> Option<String> {
    let content = std::fs::read_to_string(&unit.spec_path).ok()?;
    match serde_yaml::from_str::<SpecHeader>(&content) {
        Ok(header) => header
            .project
            .and_then(|p| p.kind)
            .map(|kind| kind.trim().to_string())
            .filter(|kind| !kind.is_empty()),
        Err(e) => {
            debug!(unit = %unit.id, error = %e, "cannot parse {SPEC_FILE}");
            None
        }
    }
}

/// Count of queued units per declared platform.
#[must_use]
pub fn platform_distribution(units: &[UnitOfWork]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for unit in units {
        let platform = declared_platform(unit).unwrap_or_else(|| UNDECLARED.to_string());
        *distribution.entry(platform).or_insert(0) += 1;
    }
    distribution
}
