//! File-backed cache of the pivot view
//!
//! Two files make up the cache:
//! - the structure file, the snapshot the view was computed from
//! - the view file, the flattened pivot result
//!
//! Each run infers the current structure and compares it to the stored one.
//! The pivot query only runs again when the structure changed, when nothing
//! was stored yet, or when the view file went missing.

mod files;

pub use files::{read_structure, read_view, write_structure, write_view};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::database::{DbError, SurveyDatabase};
use crate::core::pivot::PivotPlan;
use crate::core::structure::{self, StructureSnapshot, StructureSource};
use crate::core::table::PivotTable;

/// Default structure file name
pub const STRUCTURE_FILE: &str = "struct_view.csv";

/// Default view file name
pub const VIEW_FILE: &str = "saved_view.csv";

/// Where the cache files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    structure_path: PathBuf,
    view_path: PathBuf,
}

impl CacheLocation {
    pub fn new(structure_path: impl Into<PathBuf>, view_path: impl Into<PathBuf>) -> Self {
        Self {
            structure_path: structure_path.into(),
            view_path: view_path.into(),
        }
    }

    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STRUCTURE_FILE), dir.join(VIEW_FILE))
    }

    pub fn structure_path(&self) -> &Path {
        &self.structure_path
    }

    pub fn view_path(&self) -> &Path {
        &self.view_path
    }
}

/// Errors raised while reading or writing cache files
#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("Cannot access cache file {path:?}: {source}")]
    #[diagnostic(code(survey_pivot::cache::io))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid cache file {path:?}: {source}")]
    #[diagnostic(code(survey_pivot::cache::csv))]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Invalid cache file {path:?} line {line}: {message}")]
    #[diagnostic(code(survey_pivot::cache::malformed))]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        CacheError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of a cache refresh
#[derive(Debug, Error, Diagnostic)]
pub enum RefreshError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),
}

/// What a run did with the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Nothing usable was stored: compute and store
    Create,
    /// Stored structure matches: load the stored view
    Reuse,
    /// Stored structure differs: compute and store again
    Update,
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheDecision::Create => "create",
            CacheDecision::Reuse => "reuse",
            CacheDecision::Update => "update",
        };
        write!(f, "{}", s)
    }
}

/// State of the stored structure file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredStructure {
    Missing,
    Stored(StructureSnapshot),
    /// Present but not parseable; treated as a changed structure
    Unreadable(String),
}

/// Decide what to do with the cache for the current structure
pub fn decide(
    current: &StructureSnapshot,
    stored: &StoredStructure,
    view_exists: bool,
) -> CacheDecision {
    match stored {
        StoredStructure::Missing => CacheDecision::Create,
        StoredStructure::Stored(previous) if previous.same_structure(current) => {
            if view_exists {
                CacheDecision::Reuse
            } else {
                CacheDecision::Create
            }
        }
        StoredStructure::Stored(_) | StoredStructure::Unreadable(_) => CacheDecision::Update,
    }
}

/// The database side of a refresh
pub trait ViewSource: StructureSource {
    fn execute_pivot(&self, plan: &PivotPlan) -> Result<PivotTable, DbError>;
}

impl ViewSource for SurveyDatabase {
    fn execute_pivot(&self, plan: &PivotPlan) -> Result<PivotTable, DbError> {
        SurveyDatabase::execute_pivot(self, plan)
    }
}

/// Result of a refresh
#[derive(Debug, Clone)]
pub struct Refresh {
    pub decision: CacheDecision,
    pub structure: StructureSnapshot,
    pub view: PivotTable,
}

/// The pivot view cache at a given location
#[derive(Debug, Clone)]
pub struct ViewCache {
    location: CacheLocation,
}

impl ViewCache {
    pub fn new(location: CacheLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &CacheLocation {
        &self.location
    }

    /// Load the stored structure, if any
    pub fn stored_structure(&self) -> StoredStructure {
        let path = self.location.structure_path();
        if !path.exists() {
            return StoredStructure::Missing;
        }
        match read_structure(path) {
            Ok(snapshot) => StoredStructure::Stored(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "stored structure unreadable, recomputing");
                StoredStructure::Unreadable(e.to_string())
            }
        }
    }

    pub fn has_view(&self) -> bool {
        self.location.view_path().is_file()
    }

    /// Infer the current structure and bring the cache up to date.
    ///
    /// On `Create` and `Update` the pivot query is synthesized and executed
    /// before anything is written, so a failed query leaves the previous
    /// cache files untouched.
    pub fn refresh<S: ViewSource + ?Sized>(&self, source: &S) -> Result<Refresh, RefreshError> {
        let current = structure::infer_structure(source)?;
        let decision = decide(&current, &self.stored_structure(), self.has_view());
        tracing::debug!(%decision, records = current.len(), "cache decision");

        let view = match decision {
            CacheDecision::Reuse => read_view(self.location.view_path())?,
            CacheDecision::Create | CacheDecision::Update => self.rebuild(source, &current)?,
        };

        Ok(Refresh {
            decision,
            structure: current,
            view,
        })
    }

    /// Execute the pivot query for `current` and store both files.
    ///
    /// The stored structure is removed before the view is written and written
    /// back last. A structure file on disk always describes the view beside it.
    pub fn rebuild<S: ViewSource + ?Sized>(
        &self,
        source: &S,
        current: &StructureSnapshot,
    ) -> Result<PivotTable, RefreshError> {
        let plan = PivotPlan::from_snapshot(current);
        let view = source.execute_pivot(&plan)?;

        let structure_path = self.location.structure_path();
        if structure_path.exists() {
            fs::remove_file(structure_path).map_err(|e| CacheError::io(structure_path, e))?;
        }
        write_view(self.location.view_path(), &view)?;
        write_structure(structure_path, current)?;
        Ok(view)
    }
}
