/// Parse a page range string like "1,3-5" into a sorted list of page numbers.
///
/// Page numbers are 1-based on both sides, matching `Document::get_pages`.
/// Returns an error for page 0, pages past the end, reversed or malformed
/// ranges, and a selection with no pages at all.
pub fn parse_page_range(input: &str, page_count: u32) -> Result<Vec<u32>, String> {
    let mut pages = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (page_number(start)?, page_number(end)?),
            None => {
                let page = page_number(part)?;
                (page, page)
            }
        };
        if start > end {
            return Err(format!("reversed page range: '{part}'"));
        }
        if end > page_count {
            return Err(format!(
                "page {end} exceeds document page count ({page_count})"
            ));
        }
        pages.extend(start..=end);
    }

    if pages.is_empty() {
        return Err("no pages selected".to_string());
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn page_number(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let page: u32 = text
        .parse()
        .map_err(|_| format!("invalid page number: '{text}'"))?;
    if page == 0 {
        return Err("page 0 is invalid (pages start at 1)".to_string());
    }
    Ok(page)
}
