//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::backup::BackupReport;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render per-kind counts of a finished backup followed by a footer
    pub fn render_backup_summary(&self, report: &BackupReport) -> String {
        let mode_icon = StatusIcon::get_mode_icon(report.dry_run);
        let mode_text = StatusIcon::get_mode_text(report.dry_run);
        let mode_color = self.theme.get_mode_color(report.dry_run);

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Backup of {} {} ─╮\n",
            report.context,
            format!("[{} resources]", report.total())
                .bright_black()
                .to_string()
        ));

        if report.total() == 0 {
            output.push_str("No resources found\n");
        } else {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("KIND").set_alignment(CellAlignment::Left),
                    Cell::new("COUNT").set_alignment(CellAlignment::Right),
                    Cell::new("STATUS").set_alignment(CellAlignment::Center),
                ]);

            for (kind, count) in &report.by_kind {
                table.add_row(vec![
                    Cell::new(kind),
                    Cell::new(count)
                        .fg(self.theme.get_count_color(*count))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{} {}", mode_icon, mode_text)).fg(mode_color),
                ]);
            }

            output.push_str(&table.to_string());
            output.push('\n');
        }

        let namespaces = report
            .by_namespace
            .iter()
            .map(|(ns, count)| format!("{} ({})", ns, count))
            .collect::<Vec<_>>();
        if !namespaces.is_empty() {
            output.push_str(&format!("Namespaces: {}\n", namespaces.join(", ")));
        }

        if !report.excluded_namespaces.is_empty() {
            output.push_str(&format!(
                "{} Excluded: {}\n",
                StatusIcon::SKIPPED.yellow(),
                report.excluded_namespaces.join(", ")
            ));
        }

        if report.filter != "." {
            output.push_str(&format!("Filter: {}\n", report.filter.cyan()));
        }

        let location = if report.dry_run {
            format!("{} (dry run, nothing written)", report.output_dir.display())
        } else {
            report.output_dir.display().to_string()
        };
        output.push_str(&format!("Output: {}\n", location));
        output.push_str(&format!(
            "Duration: {:.2}s\n",
            report.duration().num_milliseconds() as f64 / 1000.0
        ));

        output
    }
}
