//! Copy-through of named resources from a page's old `/Resources` into a
//! new, minimal dictionary.

use std::fmt;

use lopdf::{Dictionary, Document, Object};
use pdfscrub_core::Error;

use crate::error::BackendError;

/// A resource dictionary category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Font,
    ColorSpace,
    Pattern,
    Shading,
    ExtGState,
    XObject,
    Properties,
}

impl ResourceCategory {
    pub fn key(self) -> &'static str {
        match self {
            ResourceCategory::Font => "Font",
            ResourceCategory::ColorSpace => "ColorSpace",
            ResourceCategory::Pattern => "Pattern",
            ResourceCategory::Shading => "Shading",
            ResourceCategory::ExtGState => "ExtGState",
            ResourceCategory::XObject => "XObject",
            ResourceCategory::Properties => "Properties",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Old resources (read-only) paired with the new dictionary being built.
///
/// Entries are only ever added during one filtering pass.
#[derive(Debug, Clone)]
pub struct ResourceRemap<'a> {
    doc: Option<&'a Document>,
    old: &'a Dictionary,
    new: Dictionary,
}

impl<'a> ResourceRemap<'a> {
    pub fn new(doc: Option<&'a Document>, old: &'a Dictionary) -> Self {
        Self::with_target(doc, old, Dictionary::new())
    }

    /// Copy into an existing dictionary instead of an empty one.
    pub fn with_target(doc: Option<&'a Document>, old: &'a Dictionary, new: Dictionary) -> Self {
        Self { doc, old, new }
    }

    pub fn document(&self) -> Option<&'a Document> {
        self.doc
    }

    pub fn old(&self) -> &'a Dictionary {
        self.old
    }

    pub fn new_resources(&self) -> &Dictionary {
        &self.new
    }

    pub fn into_new_resources(self) -> Dictionary {
        self.new
    }

    /// The old dictionary's entry for `name` in `category`, references
    /// left unresolved.
    pub fn lookup(&self, category: ResourceCategory, name: &str) -> Option<&'a Object> {
        let cat = self.old.get(category.key().as_bytes()).ok()?;
        let cat = match (cat, self.doc) {
            (Object::Reference(id), Some(doc)) => doc.get_object(*id).ok()?,
            _ => cat,
        };
        cat.as_dict().ok()?.get(name.as_bytes()).ok()
    }

    /// Copy one entry across.
    ///
    /// Returns `Ok(true)` when an entry was added, `Ok(false)` when the old
    /// dictionary has no such entry or the new one already has it.
    ///
    /// # Errors
    ///
    /// Fails with a `Format` error when the new dictionary's category entry
    /// exists but is not a dictionary.
    pub fn copy(&mut self, category: ResourceCategory, name: &str) -> Result<bool, BackendError> {
        let Some(value) = self.lookup(category, name) else {
            return Ok(false);
        };
        let key = category.key().as_bytes();
        if !self.new.has(key) {
            self.new.set(key, Dictionary::new());
        }
        let target = self
            .new
            .get_mut(key)
            .and_then(Object::as_dict_mut)
            .map_err(|_| {
                Error::format(format!("/{category} in the new resources is not a dictionary"))
            })?;
        if target.has(name.as_bytes()) {
            return Ok(false);
        }
        target.set(name.as_bytes(), value.clone());
        Ok(true)
    }

    /// Number of entries copied into `category` so far.
    pub fn count(&self, category: ResourceCategory) -> usize {
        self.new
            .get(category.key().as_bytes())
            .and_then(Object::as_dict)
            .map_or(0, Dictionary::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn old_resources() -> Dictionary {
        dictionary! {
            "Font" => dictionary! {
                "F1" => Object::Reference((4, 0)),
                "F2" => Object::Reference((5, 0)),
            },
            "XObject" => dictionary! { "Im0" => Object::Reference((9, 0)) },
        }
    }

    #[test]
    fn copies_exactly_one_entry() {
        let old = old_resources();
        let mut remap = ResourceRemap::new(None, &old);
        assert!(remap.copy(ResourceCategory::Font, "F1").unwrap());
        assert_eq!(remap.count(ResourceCategory::Font), 1);
        let fonts = remap.new_resources().get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"F1").unwrap(), &Object::Reference((4, 0)));
        assert!(!fonts.has(b"F2"));
    }

    #[test]
    fn second_copy_is_a_no_op() {
        let old = old_resources();
        let mut remap = ResourceRemap::new(None, &old);
        remap.copy(ResourceCategory::Font, "F1").unwrap();
        assert!(!remap.copy(ResourceCategory::Font, "F1").unwrap());
        assert_eq!(remap.count(ResourceCategory::Font), 1);
    }

    #[test]
    fn missing_entry_creates_nothing() {
        let old = old_resources();
        let mut remap = ResourceRemap::new(None, &old);
        assert!(!remap.copy(ResourceCategory::Shading, "Sh0").unwrap());
        assert!(!remap.copy(ResourceCategory::Font, "F9").unwrap());
        assert!(remap.new_resources().is_empty());
    }

    #[test]
    fn category_behind_a_reference() {
        let mut doc = Document::with_version("1.5");
        let fonts = doc.add_object(dictionary! { "F1" => Object::Reference((4, 0)) });
        let old = dictionary! { "Font" => Object::Reference(fonts) };
        let mut remap = ResourceRemap::new(Some(&doc), &old);
        assert!(remap.copy(ResourceCategory::Font, "F1").unwrap());
    }

    #[test]
    fn non_dictionary_target_category_fails() {
        let old = old_resources();
        let target = dictionary! { "Font" => Object::Integer(3) };
        let mut remap = ResourceRemap::with_target(None, &old, target);
        let err: Error = remap.copy(ResourceCategory::Font, "F1").unwrap_err().into();
        assert_eq!(err.code(), pdfscrub_core::ErrorCode::Format);
    }

    #[test]
    fn existing_target_entries_are_kept() {
        let old = old_resources();
        let target = dictionary! { "Font" => dictionary! { "F1" => Object::Null } };
        let mut remap = ResourceRemap::with_target(None, &old, target);
        assert!(!remap.copy(ResourceCategory::Font, "F1").unwrap());
        let fonts = remap.new_resources().get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"F1").unwrap(), &Object::Null);
    }
}
