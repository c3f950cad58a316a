// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfwerk-server — HTTP upload endpoint in front of the compression pipeline.

pub mod api;
pub mod http;
pub mod multipart;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use server::{CompressServer, ServerStatus};
