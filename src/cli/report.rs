use super::ui;
use crate::scrape::ScrapeReport;
use comfy_table::Cell;

impl ScrapeReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Stage"),
            ui::header_cell("Requested"),
            ui::header_cell("Fetched"),
            ui::header_cell("Fetch failed"),
            ui::header_cell("Stored"),
            ui::header_cell("Skipped"),
            ui::header_cell("Warnings"),
        ]);

        for (stage, stats) in self.stages() {
            table.add_row(vec![
                Cell::new(stage),
                ui::count_cell(stats.requested),
                ui::count_cell(stats.fetched),
                ui::failure_cell(stats.fetch_failed),
                ui::count_cell(stats.persisted),
                ui::failure_cell(stats.skipped),
                ui::count_cell(stats.warnings),
            ]);
        }

        let failures = self.total_failures();
        let status = if failures == 0 {
            ui::style_text("all records stored", ui::StyleType::Good)
        } else {
            ui::style_text(&format!("{failures} failures"), ui::StyleType::Error)
        };

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Scrape summary", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}: {} {}",
            ui::style_text("Result", ui::StyleType::TotalLabel),
            status,
            ui::style_text(
                &format!("({:.1}s)", self.elapsed.as_secs_f64()),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}
