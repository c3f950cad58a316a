// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic PDF builders shared by the unit tests.

use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions,
    Stream, dictionary,
};

use crate::pdf::images::{self, EmbeddedImage, number};

const LETTER: [i64; 4] = [0, 0, 612, 792];

/// Colour layout of a fixture image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pixels {
    Rgb,
    Gray,
    Cmyk,
}

impl Pixels {
    fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn color_space(self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
            Self::Cmyk => "DeviceCMYK",
        }
    }
}

/// How the fixture samples are stored in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// No filter.
    Raw,
    Flate,
    /// DCTDecode at quality 92. CMYK fixtures fall back to Flate.
    Jpeg,
}

#[derive(Debug, Clone, Copy)]
pub struct FixtureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
    pub encoding: Encoding,
}

impl FixtureImage {
    pub fn rgb(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Pixels::Rgb,
            encoding: Encoding::Flate,
        }
    }

    pub fn gray(width: u32, height: u32) -> Self {
        Self {
            pixels: Pixels::Gray,
            ..Self::rgb(width, height)
        }
    }

    pub fn encoded(self, encoding: Encoding) -> Self {
        Self { encoding, ..self }
    }

    /// A gradient with deterministic noise on top, so that neither Flate nor
    /// JPEG compresses it to nothing.
    fn samples(&self) -> Vec<u8> {
        let channels = self.pixels.channels();
        let mut state: u32 = 0x2545_f491 ^ (self.width << 8) ^ self.height;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * channels);
        for y in 0..self.height {
            for x in 0..self.width {
                for c in 0..channels {
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    let noise = (state >> 24) as i32 / 4 - 32;
                    let base = ((x * 255 / self.width.max(1)) as i32
                        + (y * 255 / self.height.max(1)) as i32
                        + c as i32 * 40)
                        / 2;
                    out.push((base + noise).clamp(0, 255) as u8);
                }
            }
        }
        out
    }

    fn stream(&self) -> Stream {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.pixels.color_space(),
            "BitsPerComponent" => 8,
        };
        let samples = self.samples();

        match (self.encoding, self.pixels) {
            (Encoding::Raw, _) => Stream::new(dict, samples),
            (Encoding::Jpeg, Pixels::Rgb | Pixels::Gray) => {
                let mut jpeg = Vec::new();
                let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 92);
                let color = if self.pixels == Pixels::Gray {
                    image::ExtendedColorType::L8
                } else {
                    image::ExtendedColorType::Rgb8
                };
                encoder
                    .encode(&samples, self.width, self.height, color)
                    .unwrap();
                let mut dict = dict;
                dict.set("Filter", "DCTDecode");
                let mut stream = Stream::new(dict, jpeg);
                stream.allows_compression = false;
                stream
            }
            (Encoding::Flate | Encoding::Jpeg, _) => {
                let mut stream = Stream::new(dict, samples);
                stream.compress().unwrap();
                stream
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

struct Builder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl Builder {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    /// Add a page drawing the named XObjects below a few lines of text.
    fn page(&mut self, xobjects: &[(String, ObjectId)], mut extra: Dictionary) -> ObjectId {
        let page_number = self.kids.len() + 1;
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in 0..20 {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(format!(
                    "Page {page_number}, line {line}: the quick brown fox jumps over the lazy dog"
                ))],
            ));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        for (index, (name, _)) in xobjects.iter().enumerate() {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    200.into(),
                    0.into(),
                    0.into(),
                    150.into(),
                    72.into(),
                    (72 + 160 * index as i64).into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }
        let content = Content { operations }.encode().unwrap();
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut xobject_dict = Dictionary::new();
        for (name, id) in xobjects {
            xobject_dict.set(name.as_str(), Object::Reference(*id));
        }
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => xobject_dict,
        };

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Resources" => resources,
            "Contents" => content_id,
        };
        if !extra.has(b"MediaBox") && !extra.has(b"NoMediaBox") {
            page.set("MediaBox", LETTER.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>());
        }
        extra.remove(b"NoMediaBox");
        for (key, value) in extra.iter() {
            page.set(key.clone(), value.clone());
        }

        let page_id = self.doc.add_object(page);
        self.kids.push(page_id.into());
        page_id
    }

    fn image(&mut self, image: &FixtureImage) -> ObjectId {
        self.doc.add_object(image.stream())
    }

    fn finish(mut self, pages_extra: Dictionary) -> Document {
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => std::mem::take(&mut self.kids),
        };
        for (key, value) in pages_extra.iter() {
            pages.set(key.clone(), value.clone());
        }
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}

fn named(ids: &[ObjectId]) -> Vec<(String, ObjectId)> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (format!("Im{}", i + 1), *id))
        .collect()
}

/// One page per entry, each drawing its own images.
pub fn document(pages: &[Vec<FixtureImage>]) -> Document {
    let mut builder = Builder::new();
    for page_images in pages {
        let ids: Vec<ObjectId> = page_images.iter().map(|img| builder.image(img)).collect();
        builder.page(&named(&ids), Dictionary::new());
    }
    builder.finish(Dictionary::new())
}

/// Text-only pages with uncompressed content streams.
pub fn text_document(pages: usize) -> Document {
    document(&vec![Vec::new(); pages])
}

/// `pages` pages all drawing the same image object.
pub fn shared_image_document(pages: usize, image: FixtureImage) -> Document {
    let mut builder = Builder::new();
    let id = builder.image(&image);
    for _ in 0..pages {
        builder.page(&named(&[id]), Dictionary::new());
    }
    builder.finish(Dictionary::new())
}

/// A page whose only XObject is a Form that draws the image.
pub fn form_wrapped_image_document(image: FixtureImage) -> Document {
    let mut builder = Builder::new();
    let image_id = builder.image(&image);
    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        },
        b"q /Im1 Do Q".to_vec(),
    );
    let form_id = builder.doc.add_object(form);
    builder.page(&[("Fm1".to_string(), form_id)], Dictionary::new());
    builder.finish(Dictionary::new())
}

/// A page without its own `/MediaBox`; the page tree root supplies A5.
pub fn inherited_media_box_document() -> Document {
    let mut builder = Builder::new();
    builder.page(&[], dictionary! { "NoMediaBox" => true });
    builder.finish(dictionary! {
        "MediaBox" => vec![0.into(), 0.into(), 420.into(), 595.into()],
    })
}

/// Pages with differing boxes and rotations, one inheriting `/Rotate`.
pub fn mixed_geometry_document() -> Document {
    let mut builder = Builder::new();
    builder.page(&[], Dictionary::new());
    builder.page(
        &[],
        dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
            "Rotate" => 90,
        },
    );
    builder.page(
        &[],
        dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "CropBox" => vec![20.into(), 20.into(), 575.into(), 822.into()],
        },
    );
    builder.finish(dictionary! { "Rotate" => 180 })
}

// ---------------------------------------------------------------------------
// Inspection helpers
// ---------------------------------------------------------------------------

pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Encrypt with 128-bit RC4 under owner password "owner" and save. An empty
/// `user_password` gives owner-password-only protection.
pub fn encrypted_bytes(mut doc: Document, user_password: &str) -> Vec<u8> {
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(b"pdfwerk-fixture".to_vec()),
            Object::string_literal(b"pdfwerk-fixture".to_vec()),
        ]),
    );
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();
    to_bytes(doc)
}

/// Detach a single fixture image as the recompressor sees it.
pub fn embedded(image: FixtureImage) -> EmbeddedImage {
    let doc = document(&[vec![image]]);
    let ids = images::document_image_ids(&doc);
    EmbeddedImage::inspect(&doc, ids[0]).unwrap()
}

fn boxed(object: Option<Object>) -> Option<[f32; 4]> {
    let values: Vec<f32> = object?.as_array().ok()?.iter().filter_map(number).collect();
    values.try_into().ok()
}

/// Effective `/MediaBox` of every page, in page order.
pub fn geometries(doc: &Document) -> Vec<[f32; 4]> {
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).unwrap();
            boxed(images::inherited(doc, page, b"MediaBox")).unwrap()
        })
        .collect()
}

/// Effective `/CropBox` and `/Rotate` of every page, in page order.
pub fn crop_and_rotation(doc: &Document) -> Vec<(Option<[f32; 4]>, i64)> {
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).unwrap();
            let crop = boxed(images::inherited(doc, page, b"CropBox"));
            let rotate = images::inherited(doc, page, b"Rotate")
                .and_then(|r| r.as_i64().ok())
                .unwrap_or(0);
            (crop, rotate)
        })
        .collect()
}

/// Decoded content stream bytes of a page.
pub fn page_content(doc: &Document, page_number: u32) -> Vec<u8> {
    let page_id = doc.get_pages()[&page_number];
    doc.get_page_content(page_id).unwrap()
}

/// Image streams drawn by a page.
pub fn page_image_streams(doc: &Document, page_number: u32) -> Vec<Stream> {
    let page_id = doc.get_pages()[&page_number];
    images::page_image_ids(doc, page_id)
        .into_iter()
        .map(|id| doc.get_object(id).unwrap().as_stream().unwrap().clone())
        .collect()
}
