// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page recompositor — rebuilds each source page inside a fresh document.
//
// The page geometry and content streams are copied unchanged, so text and
// vector drawing stay exactly as they were. Every image XObject reachable
// from the page's resources is swapped for its recompressed version. Objects
// are copied through an id map, so an image (or font) shared between pages is
// copied and recompressed once and referenced from every page.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfwerk_core::error::{PdfwerkError, Result};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::image::recompressor::{ImageRecompressor, Recompressed};
use crate::pdf::images::{self, EmbeddedImage};

/// US Letter, used when a page tree carries no `/MediaBox` at all.
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Page attributes that are rebuilt explicitly rather than copied.
const REBUILT_PAGE_KEYS: [&[u8]; 7] = [
    b"Type",
    b"Parent",
    b"MediaBox",
    b"CropBox",
    b"Rotate",
    b"Resources",
    b"Contents",
];

/// Document-level catalog entries carried into the output. Their references
/// to pages and annotations resolve to the rebuilt objects.
const CARRIED_CATALOG_KEYS: [&[u8]; 9] = [
    b"Outlines",
    b"AcroForm",
    b"Names",
    b"Dests",
    b"PageLabels",
    b"StructTreeRoot",
    b"MarkInfo",
    b"Lang",
    b"ViewerPreferences",
];

// ---------------------------------------------------------------------------
// Image arena
// ---------------------------------------------------------------------------

/// Recompression results keyed by source reference id.
///
/// Each distinct image is recompressed at most once per document, no matter
/// how many pages draw it.
#[derive(Debug, Default)]
pub struct ImageArena {
    outcomes: HashMap<ObjectId, Recompressed>,
}

impl ImageArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompress every image in `ids` up front on the rayon pool.
    pub fn prewarm_parallel(
        &mut self,
        source: &Document,
        ids: &[ObjectId],
        recompressor: &ImageRecompressor,
    ) {
        let pending: Vec<EmbeddedImage> = ids
            .iter()
            .filter(|id| !self.outcomes.contains_key(id))
            .filter_map(|id| EmbeddedImage::inspect(source, *id))
            .collect();

        let results: Vec<(ObjectId, Recompressed)> = pending
            .into_par_iter()
            .map(|image| (image.id, recompressor.recompress_or_keep(&image)))
            .collect();

        debug!(images = results.len(), "image arena prewarmed");
        self.outcomes.extend(results);
    }

    /// Recompress `id` if it has not been seen yet.
    pub fn ensure(&mut self, source: &Document, id: ObjectId, recompressor: &ImageRecompressor) {
        if self.outcomes.contains_key(&id) {
            return;
        }
        if let Some(image) = EmbeddedImage::inspect(source, id) {
            let outcome = recompressor.recompress_or_keep(&image);
            self.outcomes.insert(id, outcome);
        }
    }

    /// Replacement stream for `id`, if recompression produced one.
    pub fn replacement(&self, id: ObjectId) -> Option<&Stream> {
        self.outcomes.get(&id).and_then(Recompressed::replacement)
    }

    /// Number of images that were actually replaced.
    pub fn replaced_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| o.replacement().is_some())
            .count()
    }

    /// Number of distinct images seen.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }
}

// ---------------------------------------------------------------------------
// Document assembler
// ---------------------------------------------------------------------------

/// Builds the output document page by page.
///
/// Every source page id is mapped to its output id up front, so links and
/// annotations that point at other pages resolve to the rebuilt pages rather
/// than pulling in copies of the originals.
pub struct DocumentAssembler<'a> {
    source: &'a Document,
    target: Document,
    /// Source object id -> output object id.
    copied: HashMap<ObjectId, ObjectId>,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl<'a> DocumentAssembler<'a> {
    /// Start an empty output document for `source`.
    pub fn new(source: &'a Document) -> Self {
        let version = if source.version.as_str() > "1.5" {
            source.version.clone()
        } else {
            "1.5".to_string()
        };
        let mut target = Document::with_version(version);
        let pages_id = target.new_object_id();

        let mut copied = HashMap::new();
        for page_id in source.get_pages().values() {
            copied.insert(*page_id, target.new_object_id());
        }
        if let Ok(source_pages) = source
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
        {
            copied.insert(source_pages, pages_id);
        }

        Self {
            source,
            target,
            copied,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Rebuild source page `page_number` (1-indexed) as the next output page,
    /// substituting recompressed images from `arena`.
    ///
    /// Images on the page that the arena has not seen are recompressed here.
    pub fn recompose(
        &mut self,
        page_number: u32,
        arena: &mut ImageArena,
        recompressor: &ImageRecompressor,
    ) -> Result<ObjectId> {
        let source = self.source;
        let page_id = *source
            .get_pages()
            .get(&page_number)
            .ok_or_else(|| page_error(page_number, "page not found in page tree"))?;
        let page_dict = source
            .get_dictionary(page_id)
            .map_err(|err| page_error(page_number, format!("cannot read page object: {err}")))?;

        for image_id in images::page_image_ids(source, page_id) {
            arena.ensure(source, image_id, recompressor);
        }

        let mut new_page = Dictionary::new();
        new_page.set("Type", Object::Name(b"Page".to_vec()));
        new_page.set("Parent", Object::Reference(self.pages_id));

        let media_box = images::inherited(source, page_dict, b"MediaBox").unwrap_or_else(|| {
            warn!(page_number, "no MediaBox in page tree, using US Letter");
            Object::Array(FALLBACK_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect())
        });
        new_page.set("MediaBox", self.copy_object(&media_box, arena));
        for key in [b"CropBox".as_slice(), b"Rotate".as_slice()] {
            if let Some(value) = images::inherited(source, page_dict, key) {
                new_page.set(key.to_vec(), self.copy_object(&value, arena));
            }
        }

        if let Some(resources) = images::inherited(source, page_dict, b"Resources") {
            new_page.set("Resources", self.copy_object(&resources, arena));
        }

        if let Ok(contents) = page_dict.get(b"Contents") {
            let contents = self.copy_contents(page_number, contents)?;
            new_page.set("Contents", contents);
        }

        for (key, value) in page_dict.iter() {
            if REBUILT_PAGE_KEYS.contains(&key.as_slice()) {
                continue;
            }
            let copied = self.copy_object(value, arena);
            new_page.set(key.clone(), copied);
        }

        let new_page_id = self.copied[&page_id];
        self.target
            .objects
            .insert(new_page_id, Object::Dictionary(new_page));
        self.kids.push(Object::Reference(new_page_id));

        debug!(page_number, ?new_page_id, "page recomposed");
        Ok(new_page_id)
    }

    /// Finish the page tree and catalog and hand back the output document.
    ///
    /// Outlines, forms, name trees and similar catalog entries are copied
    /// after the pages, so they point at the rebuilt pages and annotations.
    pub fn finish(mut self) -> Document {
        let source = self.source;
        let mut arena = ImageArena::new();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set("Kids", Object::Array(std::mem::take(&mut self.kids)));
        self.target
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        if let Ok(source_catalog) = source.catalog() {
            for key in CARRIED_CATALOG_KEYS {
                if let Ok(value) = source_catalog.get(key) {
                    let copied = self.copy_object(value, &mut arena);
                    catalog.set(key.to_vec(), copied);
                }
            }
        }
        let catalog_id = self.target.add_object(catalog);
        self.target.trailer.set("Root", catalog_id);

        if let Ok(info) = source.trailer.get(b"Info") {
            let copied = self.copy_object(info, &mut arena);
            self.target.trailer.set("Info", copied);
        }

        self.target
    }

    /// Copy `/Contents` (a stream reference or an array of them). Unlike the
    /// rest of the page, content that cannot be resolved is fatal.
    fn copy_contents(&mut self, page_number: u32, contents: &Object) -> Result<Object> {
        let source = self.source;
        let references: Vec<ObjectId> = match contents {
            Object::Reference(id) => match source.get_object(*id) {
                Ok(Object::Array(parts)) => parts
                    .iter()
                    .map(|p| p.as_reference())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|err| page_error(page_number, format!("bad content array: {err}")))?,
                _ => vec![*id],
            },
            Object::Array(parts) => parts
                .iter()
                .map(|p| p.as_reference())
                .collect::<std::result::Result<_, _>>()
                .map_err(|err| page_error(page_number, format!("bad content array: {err}")))?,
            other => {
                return Err(page_error(
                    page_number,
                    format!("unexpected /Contents object {other:?}"),
                ));
            }
        };

        let mut copied = Vec::with_capacity(references.len());
        for id in references {
            match source.get_object(id) {
                Ok(Object::Stream(_)) => {
                    copied.push(self.copy_reference(id, &mut ImageArena::new()));
                }
                Ok(other) => {
                    return Err(page_error(
                        page_number,
                        format!("content object {id:?} is not a stream: {other:?}"),
                    ));
                }
                Err(err) => {
                    return Err(page_error(
                        page_number,
                        format!("content stream {id:?} missing: {err}"),
                    ));
                }
            }
        }

        Ok(match copied.len() {
            1 => copied.remove(0),
            _ => Object::Array(copied),
        })
    }

    /// Deep-copy a value into the output document. Streams keep their bytes.
    fn copy_object(&mut self, object: &Object, arena: &mut ImageArena) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(*id, arena),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict, arena)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item, arena))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(&stream.dict, arena);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary, arena: &mut ImageArena) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.copy_object(value, arena);
            copy.set(key.clone(), value);
        }
        copy
    }

    /// Copy the object behind a reference once, substituting a recompressed
    /// image when the arena holds one.
    fn copy_reference(&mut self, id: ObjectId, arena: &mut ImageArena) -> Object {
        if let Some(existing) = self.copied.get(&id) {
            return Object::Reference(*existing);
        }

        let resolved = match arena.replacement(id) {
            Some(stream) => Object::Stream(stream.clone()),
            None => match self.source.get_object(id) {
                Ok(object) => object.clone(),
                Err(err) => {
                    warn!(?id, %err, "cannot resolve reference, using Null");
                    return Object::Null;
                }
            },
        };

        // Register before descending so cycles terminate.
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(&resolved, arena);
        self.target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

fn page_error(page: u32, reason: impl Into<String>) -> PdfwerkError {
    PdfwerkError::PageCopy {
        page,
        reason: reason.into(),
    }
}
