//! Shared fixture builders for the facade integration tests.

#![allow(dead_code)]

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// A document with one page per entry of `contents`. Every page shares
/// resources inherited from the page tree: Helvetica as /F1, Courier as
/// /F2 and an ExtGState /GS0.
pub fn pdf_with_pages(contents: &[&[u8]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let courier = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let gs = doc.add_object(dictionary! { "Type" => "ExtGState", "LW" => Object::Integer(2) });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(count),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => Object::Reference(helvetica),
                    "F2" => Object::Reference(courier),
                },
                "ExtGState" => dictionary! { "GS0" => Object::Reference(gs) },
            },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// The page's object id for a 1-based page number.
pub fn page_id(doc: &Document, number: u32) -> ObjectId {
    doc.get_pages()[&number]
}

/// The page's content stream as text.
pub fn page_text(doc: &Document, number: u32) -> String {
    let bytes = pdfscrub::page::content_bytes(doc, page_id(doc, number)).unwrap();
    String::from_utf8(bytes).unwrap()
}

/// Save and reload, as a file round trip would.
pub fn reload(doc: &mut Document) -> Document {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    Document::load_mem(&buf).unwrap()
}
