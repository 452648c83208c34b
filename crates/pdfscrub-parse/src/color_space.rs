//! Color space, pattern and shading resolution.
//!
//! The filter never converts colors. It only needs to know which family a
//! color space belongs to (so device colors can be re-emitted with the
//! `g`/`rg`/`k` shorthands) and how many components it takes.

use std::rc::Rc;

use lopdf::{Dictionary, Document, Object};

/// A resolved color space family.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    /// ICCBased with its `/N`.
    IccBased { components: u8 },
    Indexed,
    /// Single-component spot color.
    Separation,
    DeviceN { components: u8 },
    /// CalGray, CalRGB and Lab.
    Cie { components: u8 },
    /// Pattern space, with the underlying space for uncolored patterns.
    Pattern { underlying: Option<Box<ColorSpace>> },
    /// A resource name with no usable definition. A numeric color set in it
    /// falls back to the device space with as many components.
    Unknown,
}

impl ColorSpace {
    /// Number of color operands `sc`/`scn` take in this space.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray
            | ColorSpace::Indexed
            | ColorSpace::Separation
            | ColorSpace::Unknown => 1,
            ColorSpace::DeviceRgb => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased { components }
            | ColorSpace::DeviceN { components }
            | ColorSpace::Cie { components } => usize::from(*components),
            ColorSpace::Pattern { underlying } => {
                underlying.as_ref().map_or(0, |cs| cs.components())
            }
        }
    }

    /// The device family name, for the three device spaces only.
    pub fn device_name(&self) -> Option<&'static str> {
        match self {
            ColorSpace::DeviceGray => Some("DeviceGray"),
            ColorSpace::DeviceRgb => Some("DeviceRGB"),
            ColorSpace::DeviceCmyk => Some("DeviceCMYK"),
            _ => None,
        }
    }

    /// Parse one of the names usable directly as a color space operand.
    pub fn from_family_name(name: &str) -> Option<ColorSpace> {
        match name {
            "DeviceGray" | "G" => Some(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" => Some(ColorSpace::DeviceRgb),
            "DeviceCMYK" | "CMYK" => Some(ColorSpace::DeviceCmyk),
            "Pattern" => Some(ColorSpace::Pattern { underlying: None }),
            _ => None,
        }
    }
}

/// Space assumed when a color space cannot be resolved, by operand count.
pub fn default_for_components(n: usize) -> ColorSpace {
    match n {
        3 => ColorSpace::DeviceRgb,
        4 => ColorSpace::DeviceCmyk,
        _ => ColorSpace::DeviceGray,
    }
}

/// Resolve a `cs`/`CS` operand: a family name, or a key into the
/// resource dictionary's `/ColorSpace` category.
pub fn resolve_color_space_name(
    name: &str,
    doc: Option<&Document>,
    resources: &Dictionary,
) -> Option<ColorSpace> {
    if let Some(cs) = ColorSpace::from_family_name(name) {
        return Some(cs);
    }
    let category = resources.get(b"ColorSpace").ok()?;
    let category = resolve(category, doc).as_dict().ok()?;
    let obj = category.get(name.as_bytes()).ok()?;
    resolve_color_space_object(obj, doc)
}

/// Resolve a color space from a lopdf object (name or array).
pub fn resolve_color_space_object(obj: &Object, doc: Option<&Document>) -> Option<ColorSpace> {
    match resolve(obj, doc) {
        Object::Name(name) => ColorSpace::from_family_name(&String::from_utf8_lossy(name)),
        Object::Array(arr) => resolve_color_space_array(arr, doc),
        _ => None,
    }
}

fn resolve_color_space_array(arr: &[Object], doc: Option<&Document>) -> Option<ColorSpace> {
    let family = arr.first()?.as_name().ok()?;
    match family {
        b"ICCBased" => {
            let stream = resolve(arr.get(1)?, doc).as_stream().ok()?;
            let n = stream.dict.get(b"N").and_then(Object::as_i64).unwrap_or(3);
            Some(ColorSpace::IccBased {
                components: component_count(n),
            })
        }
        b"Indexed" | b"I" => Some(ColorSpace::Indexed),
        b"Separation" => Some(ColorSpace::Separation),
        b"DeviceN" => {
            let names = resolve(arr.get(1)?, doc).as_array().ok()?;
            Some(ColorSpace::DeviceN {
                components: component_count(names.len() as i64),
            })
        }
        b"CalGray" => Some(ColorSpace::Cie { components: 1 }),
        b"CalRGB" | b"Lab" => Some(ColorSpace::Cie { components: 3 }),
        b"Pattern" => Some(ColorSpace::Pattern {
            underlying: arr
                .get(1)
                .and_then(|o| resolve_color_space_object(o, doc))
                .map(Box::new),
        }),
        other => ColorSpace::from_family_name(&String::from_utf8_lossy(other)),
    }
}

fn component_count(n: i64) -> u8 {
    n.clamp(1, 32) as u8
}

fn resolve<'a>(obj: &'a Object, doc: Option<&'a Document>) -> &'a Object {
    match (obj, doc) {
        (Object::Reference(id), Some(doc)) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Kind of a `/Pattern` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// PatternType 1.
    Tiling,
    /// PatternType 2.
    Shading,
}

/// A named `/Pattern` resource.
///
/// Shared as `Rc<Pattern>`; two pattern references denote the same
/// pattern only when they point at the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub kind: PatternKind,
}

/// A named `/Shading` resource, painted with `sh`.
#[derive(Debug, Clone, PartialEq)]
pub struct Shading {
    pub name: String,
    /// `/ShadingType`, 1..=7.
    pub shading_type: i64,
}

/// Look up a pattern in the `/Pattern` category.
pub fn resolve_pattern(
    name: &str,
    doc: Option<&Document>,
    resources: &Dictionary,
) -> Option<Rc<Pattern>> {
    let dict = resource_entry(resources, b"Pattern", name, doc)?;
    let kind = match dict.get(b"PatternType").and_then(Object::as_i64) {
        Ok(2) => PatternKind::Shading,
        _ => PatternKind::Tiling,
    };
    Some(Rc::new(Pattern {
        name: name.to_string(),
        kind,
    }))
}

/// Look up a shading in the `/Shading` category.
pub fn resolve_shading(
    name: &str,
    doc: Option<&Document>,
    resources: &Dictionary,
) -> Option<Rc<Shading>> {
    let dict = resource_entry(resources, b"Shading", name, doc)?;
    let shading_type = dict.get(b"ShadingType").and_then(Object::as_i64).ok()?;
    Some(Rc::new(Shading {
        name: name.to_string(),
        shading_type,
    }))
}

/// Dictionary of a resource entry, looking through streams.
fn resource_entry<'a>(
    resources: &'a Dictionary,
    category: &[u8],
    name: &str,
    doc: Option<&'a Document>,
) -> Option<&'a Dictionary> {
    let category = resolve(resources.get(category).ok()?, doc).as_dict().ok()?;
    match resolve(category.get(name.as_bytes()).ok()?, doc) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    #[test]
    fn device_family_names() {
        assert_eq!(ColorSpace::from_family_name("DeviceRGB"), Some(ColorSpace::DeviceRgb));
        assert_eq!(ColorSpace::from_family_name("G"), Some(ColorSpace::DeviceGray));
        assert_eq!(ColorSpace::from_family_name("CS0"), None);
    }

    #[test]
    fn component_counts() {
        assert_eq!(ColorSpace::DeviceGray.components(), 1);
        assert_eq!(ColorSpace::DeviceRgb.components(), 3);
        assert_eq!(ColorSpace::DeviceCmyk.components(), 4);
        assert_eq!(ColorSpace::DeviceN { components: 2 }.components(), 2);
        assert_eq!(ColorSpace::Pattern { underlying: None }.components(), 0);
        let uncolored = ColorSpace::Pattern {
            underlying: Some(Box::new(ColorSpace::DeviceRgb)),
        };
        assert_eq!(uncolored.components(), 3);
    }

    #[test]
    fn only_device_spaces_have_device_names() {
        assert_eq!(ColorSpace::DeviceCmyk.device_name(), Some("DeviceCMYK"));
        assert_eq!(ColorSpace::IccBased { components: 3 }.device_name(), None);
    }

    #[test]
    fn named_resource_aliasing_a_device_space() {
        let resources = dictionary! {
            "ColorSpace" => dictionary! { "CS0" => "DeviceRGB" },
        };
        let cs = resolve_color_space_name("CS0", None, &resources).unwrap();
        assert_eq!(cs, ColorSpace::DeviceRgb);
    }

    #[test]
    fn icc_based_through_reference() {
        let mut doc = Document::with_version("1.5");
        let icc = doc.add_object(Stream::new(dictionary! { "N" => Object::Integer(4) }, vec![0u8; 8]));
        let resources = dictionary! {
            "ColorSpace" => dictionary! {
                "CS1" => vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(icc)],
            },
        };
        let cs = resolve_color_space_name("CS1", Some(&doc), &resources).unwrap();
        assert_eq!(cs, ColorSpace::IccBased { components: 4 });
        assert_eq!(cs.components(), 4);
    }

    #[test]
    fn device_n_counts_colorants() {
        let arr = vec![
            Object::Name(b"DeviceN".to_vec()),
            Object::Array(vec![
                Object::Name(b"Cyan".to_vec()),
                Object::Name(b"Spot".to_vec()),
            ]),
            Object::Name(b"DeviceCMYK".to_vec()),
            Object::Null,
        ];
        let cs = resolve_color_space_object(&Object::Array(arr), None).unwrap();
        assert_eq!(cs.components(), 2);
    }

    #[test]
    fn uncolored_pattern_space() {
        let arr = Object::Array(vec![
            Object::Name(b"Pattern".to_vec()),
            Object::Name(b"DeviceGray".to_vec()),
        ]);
        let cs = resolve_color_space_object(&arr, None).unwrap();
        assert_eq!(cs.components(), 1);
    }

    #[test]
    fn missing_color_space() {
        let resources = Dictionary::new();
        assert!(resolve_color_space_name("CS9", None, &resources).is_none());
    }

    #[test]
    fn pattern_kinds() {
        let resources = dictionary! {
            "Pattern" => dictionary! {
                "P0" => dictionary! { "PatternType" => Object::Integer(1) },
                "P1" => dictionary! { "PatternType" => Object::Integer(2) },
            },
        };
        let p0 = resolve_pattern("P0", None, &resources).unwrap();
        let p1 = resolve_pattern("P1", None, &resources).unwrap();
        assert_eq!(p0.kind, PatternKind::Tiling);
        assert_eq!(p1.kind, PatternKind::Shading);
        assert!(resolve_pattern("P2", None, &resources).is_none());
    }

    #[test]
    fn shading_requires_type() {
        let resources = dictionary! {
            "Shading" => dictionary! {
                "Sh0" => dictionary! { "ShadingType" => Object::Integer(2) },
                "Bad" => dictionary! {},
            },
        };
        assert_eq!(resolve_shading("Sh0", None, &resources).unwrap().shading_type, 2);
        assert!(resolve_shading("Bad", None, &resources).is_none());
    }

    #[test]
    fn default_space_by_count() {
        assert_eq!(default_for_components(1), ColorSpace::DeviceGray);
        assert_eq!(default_for_components(3), ColorSpace::DeviceRgb);
        assert_eq!(default_for_components(4), ColorSpace::DeviceCmyk);
    }
}
