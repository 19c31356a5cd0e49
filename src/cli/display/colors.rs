//! Color theme for CLI output

use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Dry runs are highlighted so nobody mistakes them for a real backup
    pub fn get_mode_color(&self, dry_run: bool) -> TableColor {
        if dry_run {
            self.warning
        } else {
            self.success
        }
    }

    /// Get color for a resource count
    pub fn get_count_color(&self, count: usize) -> TableColor {
        if count == 0 {
            self.muted
        } else {
            self.info
        }
    }
}
