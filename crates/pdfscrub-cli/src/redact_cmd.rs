use pdfscrub::{FilterPageOptions, GlyphInfo};

use crate::cli::CommonArgs;
use crate::shared::scrub;

pub fn run(common: &CommonArgs, remove: &str) -> Result<(), i32> {
    if remove.is_empty() {
        eprintln!("Error: --remove needs at least one character");
        return Err(1);
    }
    let remove: Vec<char> = remove.chars().collect();

    let mut options =
        FilterPageOptions::new().with_text_filter(|g: &GlyphInfo<'_>| matches(g.unicode, &remove));
    if common.keep_resources {
        options = options.keep_resources();
    }
    scrub(common, &mut options)
}

/// A glyph goes when all of its text is in the removal set.
fn matches(text: &[char], remove: &[char]) -> bool {
    !text.is_empty() && text.iter().all(|c| remove.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ligature_needs_every_char() {
        assert!(matches(&['f', 'i'], &['f', 'i', 'x']));
        assert!(!matches(&['f', 'i'], &['f']));
    }

    #[test]
    fn empty_text_never_matches() {
        assert!(!matches(&[], &['a']));
    }
}
