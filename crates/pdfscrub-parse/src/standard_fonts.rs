//! Built-in metrics for the standard fonts most often left unembedded.
//!
//! Widths cover the printable ASCII range (codes 32..=126) in glyph units
//! (1/1000 of text space). Codes outside that range fall back to the
//! font's average width.

use pdfscrub_core::Rect;

/// Metrics for one standard font.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    pub name: &'static str,
    /// Widths for codes 32..=126.
    widths: &'static [u16; 95],
    pub font_bbox: [i16; 4],
    pub fixed_pitch: bool,
}

impl StandardFontMetrics {
    /// Advance width for a single-byte character code.
    pub fn width(&self, code: u32) -> f64 {
        match code {
            32..=126 => f64::from(self.widths[(code - 32) as usize]),
            _ => self.average_width(),
        }
    }

    fn average_width(&self) -> f64 {
        if self.fixed_pitch {
            return f64::from(self.widths[0]);
        }
        let total: u32 = self.widths.iter().map(|w| u32::from(*w)).sum();
        f64::from(total) / self.widths.len() as f64
    }

    pub fn bbox(&self) -> Rect {
        let [x0, y0, x1, y1] = self.font_bbox;
        Rect::new(f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1))
    }
}

const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, //
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, //
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, //
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, //
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, //
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, //
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, //
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, //
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500, //
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, //
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const COURIER_WIDTHS: [u16; 95] = [600; 95];

static STANDARD_FONTS: &[StandardFontMetrics] = &[
    StandardFontMetrics {
        name: "Helvetica",
        widths: &HELVETICA_WIDTHS,
        font_bbox: [-166, -225, 1000, 931],
        fixed_pitch: false,
    },
    StandardFontMetrics {
        name: "Helvetica-Bold",
        widths: &HELVETICA_BOLD_WIDTHS,
        font_bbox: [-170, -228, 1003, 962],
        fixed_pitch: false,
    },
    StandardFontMetrics {
        name: "Times-Roman",
        widths: &TIMES_ROMAN_WIDTHS,
        font_bbox: [-168, -218, 1000, 898],
        fixed_pitch: false,
    },
    StandardFontMetrics {
        name: "Times-Bold",
        widths: &TIMES_BOLD_WIDTHS,
        font_bbox: [-168, -218, 1000, 935],
        fixed_pitch: false,
    },
    StandardFontMetrics {
        name: "Courier",
        widths: &COURIER_WIDTHS,
        font_bbox: [-23, -250, 715, 805],
        fixed_pitch: true,
    },
];

/// Look up metrics by base font name.
///
/// Subset prefixes (`ABCDEF+Helvetica`) are stripped, and the oblique,
/// italic and bold-italic variants share their upright metrics.
pub fn lookup(base_font: &str) -> Option<&'static StandardFontMetrics> {
    let name = strip_subset_prefix(base_font);
    let canonical = match name {
        "Helvetica" | "Helvetica-Oblique" | "Arial" | "ArialMT" => "Helvetica",
        "Helvetica-Bold" | "Helvetica-BoldOblique" | "Arial-BoldMT" | "Arial,Bold" => {
            "Helvetica-Bold"
        }
        "Times-Roman" | "Times-Italic" | "TimesNewRoman" | "TimesNewRomanPSMT" => "Times-Roman",
        "Times-Bold" | "Times-BoldItalic" | "TimesNewRoman,Bold" | "TimesNewRomanPS-BoldMT" => {
            "Times-Bold"
        }
        "Courier" | "Courier-Bold" | "Courier-Oblique" | "Courier-BoldOblique" | "CourierNew" => {
            "Courier"
        }
        _ => return None,
    };
    STANDARD_FONTS.iter().find(|m| m.name == canonical)
}

/// Metrics used when a font has no usable widths at all.
pub fn fallback() -> &'static StandardFontMetrics {
    &STANDARD_FONTS[0]
}

fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_space_and_letters() {
        let m = lookup("Helvetica").unwrap();
        assert_eq!(m.width(32), 278.0);
        assert_eq!(m.width(b'A' as u32), 667.0);
        assert_eq!(m.width(b'i' as u32), 222.0);
    }

    #[test]
    fn variants_share_metrics() {
        assert_eq!(lookup("Helvetica-Oblique").unwrap().name, "Helvetica");
        assert_eq!(lookup("Times-BoldItalic").unwrap().name, "Times-Bold");
        assert_eq!(lookup("Courier-Bold").unwrap().name, "Courier");
    }

    #[test]
    fn subset_prefix_is_ignored() {
        assert_eq!(lookup("ABCDEF+Times-Roman").unwrap().name, "Times-Roman");
        assert!(lookup("abcdef+Times-Roman").is_none());
    }

    #[test]
    fn unknown_font() {
        assert!(lookup("Garamond").is_none());
    }

    #[test]
    fn courier_is_fixed_pitch() {
        let m = lookup("Courier").unwrap();
        assert_eq!(m.width(b'W' as u32), 600.0);
        assert_eq!(m.width(200), 600.0);
    }

    #[test]
    fn out_of_range_uses_average() {
        let m = lookup("Times-Bold").unwrap();
        let w = m.width(10);
        assert!(w > 250.0 && w < 1000.0);
    }

    #[test]
    fn bbox_conversion() {
        let b = fallback().bbox();
        assert_eq!(b, Rect::new(-166.0, -225.0, 1000.0, 931.0));
    }
}
