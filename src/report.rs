use std::fs;
use std::io::Write;

use crate::error::NoticeError;
use crate::package::{ LicenseBody, ResolvedEntry };

fn heading(entry: &ResolvedEntry) -> String {
    if entry.display_url.is_empty() {
        format!("## {}\n\n", entry.display_id)
    } else {
        format!("## [{}]({})\n\n", entry.display_id, entry.display_url)
    }
}

/// Markdown section for one entry, ending in a blank line.
pub fn render_entry(entry: &ResolvedEntry) -> String {
    let mut section = heading(entry);
    match &entry.license {
        LicenseBody::FullText(text) => {
            section.push_str(&format!("```\n{}\n```\n\n", text));
        }
        LicenseBody::Declaration(license) if !license.is_empty() => {
            section.push_str(&format!("{}\n\n", license));
        }
        LicenseBody::Declaration(_) => {}
    }
    section
}

/// All entries in order, no header or footer.
pub fn render(entries: &[ResolvedEntry]) -> String {
    entries.iter().map(render_entry).collect()
}

/// Write the report to a file, or to stdout when no path is given.
pub fn write_report(report: &str, output_file: Option<&str>) -> Result<(), NoticeError> {
    match output_file {
        Some(path) => {
            fs::write(path, report)?;
            log::info!("Notices written to {}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(report.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
