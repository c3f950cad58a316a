// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality-profile compressor — recompose every page with one profile's image
// settings and save through the structural optimiser.

use std::path::Path;

use lopdf::Document;
use pdfwerk_core::error::Result;
use pdfwerk_core::{CompressionConfig, CompressionProfile};
use tracing::{debug, info, instrument};

use crate::image::recompressor::ImageRecompressor;
use crate::pdf::images;
use crate::pdf::optimizer::StructuralOptimizer;
use crate::pdf::recompose::{DocumentAssembler, ImageArena};

/// Applies a single compression profile to a document.
#[derive(Debug, Clone, Default)]
pub struct ProfileCompressor {
    config: CompressionConfig,
}

impl ProfileCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Compress `input` with the profile called `profile_name` and write the
    /// result to `output`. An unknown name fails before anything is written.
    pub fn compress(&self, input: &Document, output: &Path, profile_name: &str) -> Result<u64> {
        let profile = CompressionProfile::by_name(profile_name)?;
        self.compress_with(input, output, profile)
    }

    /// Compress with an already resolved profile.
    #[instrument(skip_all, fields(profile = %profile.name, path = %output.display()))]
    pub fn compress_with(
        &self,
        input: &Document,
        output: &Path,
        profile: &CompressionProfile,
    ) -> Result<u64> {
        let bytes = self.compress_to_bytes(input, profile)?;
        std::fs::write(output, &bytes)?;
        info!(bytes = bytes.len(), "profile output written");
        Ok(bytes.len() as u64)
    }

    /// Compress into memory.
    pub fn compress_to_bytes(&self, input: &Document, profile: &CompressionProfile) -> Result<Vec<u8>> {
        let (assembled, replaced) = self.assemble(input, profile)?;
        if replaced == 0 {
            // Nothing changed on any page; the source saves at least as small.
            debug!(profile = %profile.name, "no images replaced, optimising source");
            return StructuralOptimizer::save_to_bytes(input.clone());
        }
        StructuralOptimizer::save_to_bytes(assembled)
    }

    /// Rebuild every page of `input` in order with `profile`'s image settings.
    ///
    /// Returns the new document and the number of images that were replaced.
    pub fn assemble(&self, input: &Document, profile: &CompressionProfile) -> Result<(Document, usize)> {
        let recompressor =
            ImageRecompressor::new(profile).with_min_dimension(self.config.min_dimension_px);
        let mut arena = ImageArena::new();
        if self.config.parallel_images {
            arena.prewarm_parallel(input, &images::document_image_ids(input), &recompressor);
        }

        let mut assembler = DocumentAssembler::new(input);
        for page_number in input.get_pages().keys() {
            assembler.recompose(*page_number, &mut arena, &recompressor)?;
        }

        let replaced = arena.replaced_count();
        debug!(
            profile = %profile.name,
            images = arena.len(),
            replaced,
            "document recomposed"
        );
        Ok((assembler.finish(), replaced))
    }
}
