use crate::ModuleId;
use diagnostic::Diagnostic;

/// Result of resolving one `(specifier, importer)` pair.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Resolved(ModuleId),
    /// Not to be included in the bundle (bare specifier with no on-disk
    /// match, or explicitly marked external by a plugin/option).
    External(String),
    Failed(Diagnostic),
}

impl ResolveOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved(_))
    }
}
