// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, image discovery, page recomposition, and structural
// optimisation of PDF documents.

pub mod images;
pub mod optimizer;
pub mod reader;
pub mod recompose;

pub use images::EmbeddedImage;
pub use optimizer::StructuralOptimizer;
pub use reader::PdfReader;
pub use recompose::{DocumentAssembler, ImageArena};
