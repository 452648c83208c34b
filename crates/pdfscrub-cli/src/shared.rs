use std::path::{Path, PathBuf};

use lopdf::Document;
use pdfscrub::{Context, ContextOptions, FilterPageOptions, FilterReport, filter_pages};

use crate::cli::{CommonArgs, ReportFormat};
use crate::page_range::parse_page_range;

/// Open a PDF file with user-friendly error messages.
///
/// Returns `Err(1)` with a message printed to stderr if the file is not found
/// or cannot be parsed as a valid PDF.
pub fn open_document(file: &Path) -> Result<Document, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }

    let doc = Document::load(file).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })?;
    if doc.is_encrypted() {
        eprintln!("Error: encrypted PDFs are not supported");
        return Err(1);
    }
    Ok(doc)
}

/// Resolve an optional page range string into 1-based page numbers.
///
/// If `pages` is `None`, returns every page of the document.
pub fn resolve_pages(pages: Option<&str>, doc: &Document) -> Result<Vec<u32>, i32> {
    let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    match pages {
        Some(range) => {
            let count = u32::try_from(numbers.len()).unwrap_or(u32::MAX);
            parse_page_range(range, count).map_err(|e| {
                eprintln!("Error: {e}");
                1
            })
        }
        None => Ok(numbers),
    }
}

/// Where the rewritten document goes: `--output`, or the input path with a
/// `-scrubbed` suffix before the extension.
pub fn output_path(file: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(output) = output {
        return output.to_path_buf();
    }
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    file.with_file_name(format!("{stem}-scrubbed.pdf"))
}

/// Open, filter the selected pages, save and report. Shared by every
/// subcommand; they differ only in the filter options.
pub fn scrub(common: &CommonArgs, options: &mut FilterPageOptions<'_>) -> Result<(), i32> {
    let mut doc = open_document(&common.file)?;
    let pages = resolve_pages(common.pages.as_deref(), &doc)?;

    // Errors are printed below; warnings still go to stderr.
    let mut ctx = Context::with_options(ContextOptions::quiet());
    let report = filter_pages(&mut ctx, &mut doc, &pages, options).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    ctx.flush_warnings();

    doc.prune_objects();
    if common.compress {
        doc.compress();
    }
    let output = output_path(&common.file, common.output.as_deref());
    doc.save(&output).map_err(|e| {
        eprintln!("Error: failed to write {}: {e}", output.display());
        1
    })?;

    print_report(&report, common.format);
    Ok(())
}

fn print_report(report: &FilterReport, format: ReportFormat) {
    for page in &report.pages {
        match format {
            ReportFormat::Text => println!(
                "page {}: {} -> {} bytes, {} warnings",
                page.page_number, page.bytes_in, page.bytes_out, page.warnings
            ),
            ReportFormat::Json => match serde_json::to_string(page) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: failed to serialize report: {e}"),
            },
        }
    }
}
