// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded image discovery — walks a page's resources (and nested Form
// XObjects) to find every image XObject, and describes each image's pixel
// layout so the recompressor can decide what to do with it.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// How the samples of an image stream are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Baseline or progressive JPEG (`DCTDecode`).
    Jpeg,
    /// Samples that lopdf can inflate itself (unfiltered, Flate, LZW).
    Decodable,
    /// Anything else (JPX, JBIG2, CCITT, filter chains ending in DCT, ...).
    Unsupported(String),
}

/// A single image XObject, detached from its source document.
///
/// The stream is cloned out of the document so images can be recompressed
/// on other threads without borrowing the `lopdf::Document`.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Reference id in the source document.
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    /// Colour channels implied by `/ColorSpace`, excluding alpha. `None` when
    /// the colour space is absent or not a plain component space (Indexed,
    /// Separation, DeviceN, Pattern).
    pub channels: Option<u8>,
    pub bits_per_component: u32,
    /// Stencil masks (`/ImageMask true`) carry 1-bit coverage, not colour.
    pub is_mask: bool,
    pub encoding: SampleEncoding,
    pub stream: Stream,
}

impl EmbeddedImage {
    /// Describe the object at `id`. Returns `None` when it is not an image
    /// XObject.
    pub fn inspect(doc: &Document, id: ObjectId) -> Option<Self> {
        let stream = match doc.get_object(id) {
            Ok(Object::Stream(stream)) => stream,
            _ => return None,
        };
        if name_of(&stream.dict, b"Subtype").as_deref() != Some(b"Image".as_slice()) {
            return None;
        }

        let dict = &stream.dict;
        let width = integer_of(doc, dict, b"Width").unwrap_or(0).max(0) as u32;
        let height = integer_of(doc, dict, b"Height").unwrap_or(0).max(0) as u32;
        let bits_per_component = integer_of(doc, dict, b"BitsPerComponent").unwrap_or(8) as u32;
        let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
        let channels = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| color_channels(doc, cs));

        Some(Self {
            id,
            width,
            height,
            channels,
            bits_per_component,
            is_mask,
            encoding: sample_encoding(dict),
            stream: stream.clone(),
        })
    }

    /// The larger of the two pixel dimensions.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Size of the encoded stream as stored in the document.
    pub fn encoded_len(&self) -> usize {
        self.stream.content.len()
    }
}

/// Collect the reference ids of every image XObject drawn by a page, in
/// resource order, without duplicates. Form XObjects are descended into.
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return images;
    };
    if let Some(resources) = inherited(doc, page_dict, b"Resources") {
        collect_from_resources(doc, &resources, &mut images, &mut seen);
    }
    images
}

/// Distinct image ids across the whole document, first-use order.
pub fn document_image_ids(doc: &Document) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    doc.get_pages()
        .values()
        .flat_map(|page_id| page_image_ids(doc, *page_id))
        .filter(|id| seen.insert(*id))
        .collect()
}

fn collect_from_resources(
    doc: &Document,
    resources: &Object,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    let Some(res_dict) = resolve_dict(doc, resources) else {
        return;
    };
    let Some(xobjects) = res_dict
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(doc, x))
    else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        if !seen.insert(*id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        match name_of(&stream.dict, b"Subtype").as_deref() {
            Some(b"Image") => images.push(*id),
            Some(b"Form") => {
                if let Ok(form_resources) = stream.dict.get(b"Resources") {
                    collect_from_resources(doc, form_resources, images, seen);
                }
            }
            _ => {}
        }
    }
}

/// Look up a page attribute, walking `/Parent` links for inheritable keys
/// (`/Resources`, `/MediaBox`, `/CropBox`, `/Rotate`).
pub fn inherited(doc: &Document, page_dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page_dict;
    // Page trees deeper than this are malformed (or cyclic).
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent_id = match current.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Resolve an object to a dictionary, following one level of reference.
pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            Ok(Object::Stream(stream)) => Some(&stream.dict),
            _ => None,
        },
        _ => None,
    }
}

/// Read a number as `f32`, accepting integers and reals.
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn integer_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key).ok()? {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Integer(value) => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

fn name_of(dict: &Dictionary, key: &[u8]) -> Option<Vec<u8>> {
    match dict.get(key).ok()? {
        Object::Name(name) => Some(name.clone()),
        _ => None,
    }
}

/// Names of the filters applied to a stream, outermost first.
pub fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| match f {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn sample_encoding(dict: &Dictionary) -> SampleEncoding {
    let filters = filter_names(dict);
    match filters.as_slice() {
        [] => SampleEncoding::Decodable,
        [only] if only == b"DCTDecode" || only == b"DCT" => SampleEncoding::Jpeg,
        chain
            if chain.iter().all(|f| {
                matches!(
                    f.as_slice(),
                    b"FlateDecode" | b"Fl" | b"LZWDecode" | b"LZW"
                )
            }) =>
        {
            SampleEncoding::Decodable
        }
        chain => SampleEncoding::Unsupported(
            chain
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect::<Vec<_>>()
                .join("+"),
        ),
    }
}

/// Number of colour components in a colour space.
fn color_channels(doc: &Document, color_space: &Object) -> Option<u8> {
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(parts) => {
            let family = match parts.first() {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return None,
            };
            match family {
                b"CalGray" => Some(1),
                b"CalRGB" | b"Lab" => Some(3),
                b"ICCBased" => {
                    let profile = match parts.get(1)? {
                        Object::Reference(id) => match doc.get_object(*id).ok()? {
                            Object::Stream(stream) => &stream.dict,
                            _ => return None,
                        },
                        _ => return None,
                    };
                    integer_of(doc, profile, b"N").map(|n| n.clamp(0, u8::MAX as i64) as u8)
                }
                _ => None,
            }
        }
        Object::Reference(id) => color_channels(doc, doc.get_object(*id).ok()?),
        _ => None,
    }
}
