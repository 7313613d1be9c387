//! Batch conversion summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::ConversionReport;

/// Per-file outcomes of one run
#[derive(Debug, Default)]
pub struct ConversionSummary {
    pub target_version: u32,
    pub converted: Vec<ConversionReport>,
    /// (file, error message)
    pub failed: Vec<(String, String)>,
}

impl ConversionSummary {
    pub fn new(target_version: u32) -> Self {
        Self {
            target_version,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, report: ConversionReport) {
        self.converted.push(report);
    }

    pub fn record_failure(&mut self, file: &str, message: String) {
        self.failed.push((file.to_string(), message));
    }

    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }

    pub fn repaired_count(&self) -> usize {
        self.converted.iter().filter(|r| r.repaired).count()
    }

    /// Builds the per-file table shown after verbose batch runs
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Output").add_attribute(Attribute::Bold),
            Cell::new("Release").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for report in &self.converted {
            let status = if report.repaired {
                Cell::new("converted (ASCII)").fg(Color::Yellow)
            } else {
                Cell::new("converted").fg(Color::Green)
            };
            table.add_row(vec![
                Cell::new(report.input.display()),
                Cell::new(report.output.display()),
                Cell::new(report.release),
                status,
            ]);
        }

        for (file, message) in &self.failed {
            table.add_row(vec![
                Cell::new(file),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new(message).fg(Color::Red),
            ]);
        }

        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "{} {}",
            style("CONVERSION SUMMARY").white().bold(),
            style(format!("(Stata {})", self.target_version)).dim()
        );

        for line in self.table().to_string().lines() {
            println!("  {}", line);
        }

        println!(
            "  {} converted, {} failed",
            style(self.converted.len()).green().bold(),
            style(self.failed.len()).red().bold()
        );
        if self.repaired_count() > 0 {
            println!(
                "  {} transliterated to ASCII",
                style(self.repaired_count()).yellow().bold()
            );
        }
        println!();
    }
}
