// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small in-memory documents for tests. Pages are told apart by the width of
// their MediaBox.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::pdf::pages::{blank_document, number, ordered_page_ids};

/// A PDF with one page per entry in `widths`, each page `width x 842` points.
/// All pages share one font resource.
pub fn pdf_with_widths(widths: &[u32]) -> Vec<u8> {
    let (mut doc, pages_id) = blank_document();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(widths.len());
    for (index, width) in widths.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![20.into(), 400.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("page {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), i64::from(*width).into(), 842.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    set_kids(&mut doc, pages_id, kids);
    save(&mut doc)
}

/// A PDF whose pages take their MediaBox (and Resources) from the /Pages node.
pub fn pdf_with_inherited_media_box(width: u32, pages: usize) -> Vec<u8> {
    let (mut doc, pages_id) = blank_document();
    let mut kids = Vec::with_capacity(pages);
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    set_kids(&mut doc, pages_id, kids);
    if let Ok(Object::Dictionary(node)) = doc.get_object_mut(pages_id) {
        node.set(
            "MediaBox",
            vec![0.into(), 0.into(), i64::from(width).into(), 842.into()],
        );
        node.set("Resources", dictionary! {});
    }
    save(&mut doc)
}

/// A [`pdf_with_widths`] PDF with one top-level bookmark per title. Bookmark
/// `i` points at page `i` (wrapping around).
pub fn pdf_with_outline(widths: &[u32], titles: &[&str]) -> Vec<u8> {
    let mut doc = Document::load_mem(&pdf_with_widths(widths)).expect("reload fixture PDF");
    let page_ids = ordered_page_ids(&doc);
    let root_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = titles.iter().map(|_| doc.new_object_id()).collect();

    for (index, (title, item_id)) in titles.iter().zip(&item_ids).enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => root_id,
            "Dest" => vec![Object::Reference(page_ids[index % page_ids.len()]), "Fit".into()],
        };
        if index > 0 {
            item.set("Prev", item_ids[index - 1]);
        }
        if let Some(next) = item_ids.get(index + 1) {
            item.set("Next", *next);
        }
        doc.objects.insert(*item_id, Object::Dictionary(item));
    }

    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_ids[0],
            "Last" => item_ids[item_ids.len() - 1],
            "Count" => item_ids.len() as i64,
        }),
    );
    doc.catalog_mut()
        .expect("fixture catalog")
        .set("Outlines", root_id);
    save(&mut doc)
}

/// Top-level bookmarks as `(title, zero-based page index of the destination)`.
pub fn outline_entries(doc: &Document) -> Vec<(String, Option<usize>)> {
    let page_ids = ordered_page_ids(doc);
    let mut entries = Vec::new();
    let mut next = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|root| root.as_reference().ok())
        .and_then(|root| doc.get_dictionary(root).ok())
        .and_then(|root| root.get(b"First").ok())
        .and_then(|first| first.as_reference().ok());

    while let Some(id) = next {
        let Ok(item) = doc.get_dictionary(id) else {
            break;
        };
        let title = item
            .get(b"Title")
            .and_then(|title| title.as_str())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        let page = item
            .get(b"Dest")
            .and_then(|dest| dest.as_array())
            .ok()
            .and_then(|dest| dest.first())
            .and_then(|target| target.as_reference().ok())
            .and_then(|target| page_ids.iter().position(|page| *page == target));
        entries.push((title, page));
        next = item.get(b"Next").and_then(|next| next.as_reference()).ok();
        if entries.len() > 1000 {
            break;
        }
    }
    entries
}

/// Bytes that are not a PDF at all.
pub fn corrupt_pdf() -> Vec<u8> {
    b"definitely not a pdf document".to_vec()
}

/// MediaBox widths of every page, in page order.
pub fn page_widths(doc: &Document) -> Vec<u32> {
    ordered_page_ids(doc)
        .into_iter()
        .map(|page_id| page_width(doc, page_id))
        .collect()
}

fn page_width(doc: &Document, page_id: ObjectId) -> u32 {
    doc.get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"MediaBox").ok())
        .and_then(|media_box| media_box.as_array().ok())
        .and_then(|values| values.get(2))
        .and_then(number)
        .map(|width| width.round() as u32)
        .unwrap_or(0)
}

/// Width and height of the first image XObject on a page.
pub fn page_image_size(doc: &Document, page_id: ObjectId) -> Option<(i64, i64)> {
    let page = doc.get_dictionary(page_id).ok()?;
    let resources = resolve_dict(doc, page.get(b"Resources").ok()?)?;
    let xobjects = resolve_dict(doc, resources.get(b"XObject").ok()?)?;
    for (_, value) in xobjects.iter() {
        let stream = doc.get_object(value.as_reference().ok()?).ok()?.as_stream().ok()?;
        if stream.dict.get(b"Subtype").ok()?.as_name().ok()? == b"Image" {
            let width = stream.dict.get(b"Width").ok()?.as_i64().ok()?;
            let height = stream.dict.get(b"Height").ok()?.as_i64().ok()?;
            return Some((width, height));
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a lopdf::Dictionary> {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// A PNG of the given size. With `alpha`, the left half is fully transparent.
pub fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let image = if alpha {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([200, 30, 30, 255])
            }
        }))
    } else {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 120, 200])))
    };
    encode(&image, ImageFormat::Png)
}

/// A JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 160, 60])));
    encode(&image, ImageFormat::Jpeg)
}

/// A flat four-component (CMYK) baseline JPEG.
///
/// The `image` encoder only writes greyscale and YCbCr, so the stream is
/// assembled by hand: one all-ones quantisation table and one-code Huffman
/// tables, so every block is a zero DC difference followed by end-of-block.
pub fn cmyk_jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
    fn segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
        out.extend_from_slice(&[0xFF, marker]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
    }

    let mut out = vec![0xFF, 0xD8];

    let mut quant = vec![0x00];
    quant.extend_from_slice(&[1; 64]);
    segment(&mut out, 0xDB, &quant);

    let mut frame = vec![8];
    frame.extend_from_slice(&height.to_be_bytes());
    frame.extend_from_slice(&width.to_be_bytes());
    frame.push(4);
    for id in 1..=4 {
        frame.extend_from_slice(&[id, 0x11, 0x00]);
    }
    segment(&mut out, 0xC0, &frame);

    // Class/id, sixteen code-length counts (one code of length 1), the symbol.
    for class in [0x00, 0x10] {
        let mut table = vec![class, 1];
        table.extend_from_slice(&[0; 15]);
        table.push(0x00);
        segment(&mut out, 0xC4, &table);
    }

    let mut scan = vec![4];
    for id in 1..=4 {
        scan.extend_from_slice(&[id, 0x00]);
    }
    scan.extend_from_slice(&[0, 63, 0]);
    segment(&mut out, 0xDA, &scan);

    // Two bits per block, four blocks per MCU: one zero byte per MCU.
    let mcus = usize::from(width.div_ceil(8)) * usize::from(height.div_ceil(8));
    out.extend(std::iter::repeat_n(0x00, mcus));
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("encode fixture image");
    buffer
}

fn set_kids(doc: &mut Document, pages_id: ObjectId, kids: Vec<Object>) {
    let count = kids.len() as i64;
    if let Ok(Object::Dictionary(node)) = doc.get_object_mut(pages_id) {
        node.set("Kids", Object::Array(kids));
        node.set("Count", count);
    }
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut output = Vec::new();
    doc.save_to(&mut output).expect("serialise fixture PDF");
    output
}
