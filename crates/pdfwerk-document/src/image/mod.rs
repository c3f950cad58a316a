// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — lossy recompression of embedded raster images.

pub mod recompressor;

pub use recompressor::{ImageRecompressor, Recompressed, Skip};
