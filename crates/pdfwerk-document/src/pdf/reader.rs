// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing PDF documents (optionally password protected)
// using the `lopdf` crate.

use std::path::Path;

use lopdf::{Document, Object};
use pdfwerk_core::error::{PdfwerkError, Result};
use tracing::{debug, info, instrument};

/// Reads an existing PDF file for compression.
///
/// Wraps `lopdf::Document` together with the size of the encoded input, which
/// the size search compares against its target.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Size of the encoded input in bytes.
    input_len: u64,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_password(path, None)
    }

    /// Open a PDF from the filesystem, decrypting it with `password` when the
    /// document is encrypted.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with_password(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let input_len = std::fs::metadata(path_ref)?.len();
        let document = Document::load(path_ref).map_err(|err| {
            PdfwerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        let document = unlock(document, password)?;

        debug!(pages = document.get_pages().len(), input_len, "PDF loaded");

        Ok(Self { document, input_len })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8], password: Option<&str>) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PdfwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        let document = unlock(document, password)?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            input_len: data.len() as u64,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Size of the encoded input in bytes.
    pub fn input_len(&self) -> u64 {
        self.input_len
    }

    /// Borrow the loaded document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// Make an encrypted document usable, or reject it.
///
/// `Document::load` already decrypts files whose user password is empty
/// (owner-password-only protection) and records an encryption state, but it
/// leaves `/Encrypt` in the trailer. Files that need a user password are
/// loaded without their objects, so decrypting them afterwards yields an
/// empty document; those are rejected rather than compressed to nothing.
fn unlock(mut document: Document, password: Option<&str>) -> Result<Document> {
    if !document.is_encrypted() {
        return require_pages(document);
    }

    if document.encryption_state.is_some() {
        debug!("owner-password-only document, decrypted on load");
        strip_encryption(&mut document);
        return require_pages(document);
    }

    let password = password.ok_or(PdfwerkError::Encrypted)?;
    document.decrypt(password).map_err(|err| {
        debug!(%err, "decryption rejected");
        PdfwerkError::InvalidPassword
    })?;
    if document.get_pages().is_empty() {
        return Err(PdfwerkError::UnsupportedEncryption(
            "documents that need a password to open cannot be decrypted".into(),
        ));
    }
    Ok(document)
}

/// Drop the `/Encrypt` entry of a document whose objects are already plain
/// text, so that saving it does not produce a file claiming to be encrypted.
fn strip_encryption(document: &mut Document) {
    if let Some(Object::Reference(id)) = document.trailer.remove(b"Encrypt") {
        document.objects.remove(&id);
    }
}

fn require_pages(document: Document) -> Result<Document> {
    if document.get_pages().is_empty() {
        return Err(PdfwerkError::PdfError("document has no pages".into()));
    }
    Ok(document)
}
