// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfwerk-document — Text-preserving PDF compression.
//
// Opens PDFs (optionally encrypted), finds the embedded raster images, and
// rebuilds every page with downscaled JPEG copies of those images while the
// text and vector content streams are carried over untouched. On top of that
// sit a single-profile compressor and a search that picks the gentlest
// profile meeting a byte budget.

pub mod compress;
pub mod image;
pub mod integrity;
pub mod pdf;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export the primary structs so callers can use `pdfwerk_document::SizeSearch` etc.
pub use compress::{Attempt, ProfileCompressor, SearchOutcome, SizeSearch};
pub use image::{ImageRecompressor, Recompressed, Skip};
pub use pdf::{DocumentAssembler, EmbeddedImage, ImageArena, PdfReader, StructuralOptimizer};
