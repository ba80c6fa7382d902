//! Diagnostic shapes produced by a build: the stable `code`s a host can match
//! on, the `Loc`/`frame` a human reads, and the `MultiErr`-friendly aggregate
//! a build collects them into.

mod frame;

use serde::Serialize;
use std::fmt;

pub use frame::render_frame;

/// Stable, matchable error/warning identifiers. Names match the wire contract
/// a plugin host is expected to switch on; never renamed once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    UnresolvedImport,
    MissingExport,
    ParseError,
    CircularDependency,
    UnresolvableCycle,
    MixedExports,
    NamespaceConflict,
    DuplicateImportOptions,
    PluginError,
    FileNotFound,
    InvalidOption,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedImport => "UNRESOLVED_IMPORT",
            DiagnosticCode::MissingExport => "MISSING_EXPORT",
            DiagnosticCode::ParseError => "PARSE_ERROR",
            DiagnosticCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            DiagnosticCode::UnresolvableCycle => "UNRESOLVABLE_CYCLE",
            DiagnosticCode::MixedExports => "MIXED_EXPORTS",
            DiagnosticCode::NamespaceConflict => "NAMESPACE_CONFLICT",
            DiagnosticCode::DuplicateImportOptions => "DUPLICATE_IMPORT_OPTIONS",
            DiagnosticCode::PluginError => "PLUGIN_ERROR",
            DiagnosticCode::FileNotFound => "FILE_NOT_FOUND",
            DiagnosticCode::InvalidOption => "INVALID_OPTION",
        }
    }

    /// `CIRCULAR_DEPENDENCY` (ESM) and `MIXED_EXPORTS` never fail a build on
    /// their own; everything else is fatal unless explicitly downgraded.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::CircularDependency | DiagnosticCode::MixedExports => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loc {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// One diagnostic, shaped to match the host-facing contract: stable `code`,
/// human `message`, the offending module `id`, byte `pos`, source `loc`, a
/// rendered `frame`, the set of files whose change should re-run the build,
/// and a docs `url`.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub id: Option<String>,
    pub pos: Option<u32>,
    pub loc: Option<Loc>,
    pub frame: Option<String>,
    pub watch_files: Vec<String>,
    pub url: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            id: None,
            pos: None,
            loc: None,
            frame: None,
            watch_files: Vec::new(),
            url: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_pos(mut self, pos: u32) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    pub fn with_watch_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.watch_files = files.into_iter().collect();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Sort key per the ordering guarantee: diagnostics are surfaced sorted
    /// by `(module_id, pos)`.
    pub fn sort_key(&self) -> (&str, u32) {
        (self.id.as_deref().unwrap_or(""), self.pos.unwrap_or(0))
    }
}

pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
