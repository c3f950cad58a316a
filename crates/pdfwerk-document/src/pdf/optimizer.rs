// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural optimiser — lossless container cleanup applied on every save:
// unreferenced and empty objects are dropped, unfiltered streams are deflated,
// and the file is written with object streams and a cross-reference stream.

use std::io::Write;
use std::path::Path;

use lopdf::{Document, SaveOptions};
use pdfwerk_core::error::{PdfwerkError, Result};
use tracing::{debug, info, instrument};

/// Objects packed into each object stream.
const MAX_OBJECTS_PER_STREAM: usize = 200;

/// zlib level used for object streams.
const COMPRESSION_LEVEL: u32 = 9;

/// Stateless save-time optimiser.
pub struct StructuralOptimizer;

impl StructuralOptimizer {
    /// Clean up a document in place.
    pub fn optimize(doc: &mut Document) {
        let pruned = doc.prune_objects();
        let empty = doc.delete_zero_length_streams();
        doc.renumber_objects();
        doc.compress();
        debug!(
            pruned = pruned.len(),
            empty_streams = empty.len(),
            objects = doc.objects.len(),
            "structure optimised"
        );
    }

    /// Optimise and serialise to bytes.
    pub fn save_to_bytes(mut doc: Document) -> Result<Vec<u8>> {
        Self::optimize(&mut doc);
        let mut output = Vec::new();
        doc.save_with_options(&mut output, save_options())
            .map_err(|err| PdfwerkError::PdfError(format!("failed to serialise PDF: {err}")))?;
        Ok(output)
    }

    /// Optimise and write to `path`, returning the number of bytes written.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn save(doc: Document, path: &Path) -> Result<u64> {
        let bytes = Self::save_to_bytes(doc)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(&bytes)?;
        file.flush()?;
        info!(bytes = bytes.len(), "optimised PDF written");
        Ok(bytes.len() as u64)
    }
}

fn save_options() -> SaveOptions {
    SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .max_objects_per_stream(MAX_OBJECTS_PER_STREAM)
        .compression_level(COMPRESSION_LEVEL)
        .build()
}
