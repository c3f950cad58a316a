// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pdfwerk.

use thiserror::Error;

/// Top-level error type for all pdfwerk operations.
#[derive(Debug, Error)]
pub enum PdfwerkError {
    // -- Request errors --
    #[error("unknown compression profile: {0}")]
    InvalidProfile(String),

    #[error("invalid target size: {0}")]
    InvalidTarget(String),

    // -- Compression errors --
    /// Per-image failure. Always absorbed by the page recompositor.
    #[error("image recompression failed: {0}")]
    ImageRecompress(String),

    #[error("failed to copy page {page}: {reason}")]
    PageCopy { page: u32, reason: String },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("invalid password")]
    InvalidPassword,

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- HTTP surface --
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("server error: {0}")]
    Server(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PdfwerkError>;
