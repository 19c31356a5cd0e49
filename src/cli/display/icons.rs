//! Status icons for CLI output

/// Status icons for backup results
pub struct StatusIcon;

impl StatusIcon {
    /// Manifests written to disk
    pub const SUCCESS: &'static str = "✓";

    /// Dry run, nothing written
    pub const DRY_RUN: &'static str = "○";

    /// Namespace excluded from the backup
    pub const SKIPPED: &'static str = "⊘";

    pub fn get_mode_icon(dry_run: bool) -> &'static str {
        if dry_run {
            Self::DRY_RUN
        } else {
            Self::SUCCESS
        }
    }

    pub fn get_mode_text(dry_run: bool) -> &'static str {
        if dry_run {
            "Dry run"
        } else {
            "Written"
        }
    }
}
