//! Page-tree access: inherited attributes, content bytes and resources.

use std::sync::LazyLock;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfscrub_parse::BackendError;

static EMPTY_RESOURCES: LazyLock<Dictionary> = LazyLock::new(Dictionary::new);

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
///
/// Returns `None` if the key is not found anywhere in the tree.
pub fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut current_id = page_id;
    // A malformed tree can loop through /Parent; the depth bounds the walk.
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(BackendError::Parse("page tree /Parent chain too deep".to_string()))
}

/// The resources dictionary for a page, handling inheritance. A page with
/// no resources anywhere in its tree gets an empty dictionary.
pub fn resources(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, BackendError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(obj) => {
            let obj = match obj {
                Object::Reference(id) => doc.get_object(*id).map_err(|e| {
                    BackendError::Parse(format!("failed to resolve /Resources reference: {e}"))
                })?,
                other => other,
            };
            obj.as_dict()
                .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string()))
        }
        None => Ok(&EMPTY_RESOURCES),
    }
}

/// The page's content stream bytes, decoded.
///
/// Handles both a single stream reference and an array of them; array
/// parts are joined with a space so tokens never run together.
pub fn content_bytes(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, BackendError> {
    let page = doc.get_object(page_id).and_then(Object::as_dict)?;
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => decode_stream(doc.get_object(*id)?),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let id = part.as_reference().map_err(|e| {
                    BackendError::Parse(format!("/Contents array item is not a reference: {e}"))
                })?;
                let bytes = decode_stream(doc.get_object(id)?)?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        Object::Stream(_) => decode_stream(contents),
        _ => Err(BackendError::Parse(
            "/Contents is not a reference or array".to_string(),
        )),
    }
}

fn decode_stream(obj: &Object) -> Result<Vec<u8>, BackendError> {
    let stream = obj
        .as_stream()
        .map_err(|e| BackendError::Parse(format!("/Contents is not a stream: {e}")))?;
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Replace the page's /Contents with one new stream holding `content`.
///
/// The old streams stay in the document until it is pruned.
pub fn replace_contents(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<ObjectId, BackendError> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Contents", Object::Reference(stream_id));
    Ok(stream_id)
}

/// Set the page's own /Resources, overriding anything inherited.
pub fn replace_resources(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
) -> Result<(), BackendError> {
    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with_inherited_resources() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let first = doc.add_object(Stream::new(Dictionary::new(), b"0 g".to_vec()));
        let second = doc.add_object(Stream::new(Dictionary::new(), b"0 0 1 1 re f".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Array(vec![Object::Reference(first), Object::Reference(second)]),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(vec![Object::Reference(page_id)]),
                "Count" => Object::Integer(1),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
            }),
        );
        (doc, page_id)
    }

    #[test]
    fn resources_inherited_from_parent() {
        let (doc, page_id) = doc_with_inherited_resources();
        let res = resources(&doc, page_id).unwrap();
        assert!(res.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
    }

    #[test]
    fn missing_key_is_none() {
        let (doc, page_id) = doc_with_inherited_resources();
        assert!(resolve_inherited(&doc, page_id, b"Rotate").unwrap().is_none());
    }

    #[test]
    fn content_array_joined_with_space() {
        let (doc, page_id) = doc_with_inherited_resources();
        assert_eq!(content_bytes(&doc, page_id).unwrap(), b"0 g 0 0 1 1 re f");
    }

    #[test]
    fn replaced_contents_read_back() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        replace_contents(&mut doc, page_id, b"q Q".to_vec()).unwrap();
        assert_eq!(content_bytes(&doc, page_id).unwrap(), b"q Q");
    }

    #[test]
    fn page_resources_override_parent() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        replace_resources(&mut doc, page_id, Dictionary::new()).unwrap();
        assert_eq!(resources(&doc, page_id).unwrap().len(), 0);
    }
}
