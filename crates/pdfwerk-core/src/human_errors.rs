// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the HTTP surface.
//
// Every technical error is mapped to a plain English message, a suggestion,
// and the HTTP status the server answers with.

use crate::error::PdfwerkError;

/// Who has to act for the request to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The request itself is wrong; the client must change it.
    ClientError,
    /// The document could not be processed; retrying will not help.
    Permanent,
    /// Something on our side broke; retrying may help.
    Transient,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// HTTP status code for the response.
    pub status: u16,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    /// Single-line form used for the JSON `error` field.
    pub fn to_line(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `PdfwerkError` into a `HumanError`.
pub fn humanize_error(err: &PdfwerkError) -> HumanError {
    match err {
        // -- Request errors --
        PdfwerkError::InvalidProfile(name) => HumanError {
            message: format!("'{name}' is not a compression level we know."),
            suggestion: "Choose one of: low, medium, high, extreme.".into(),
            status: 400,
            severity: Severity::ClientError,
        },

        PdfwerkError::InvalidTarget(detail) => HumanError {
            message: "The target size isn't valid.".into(),
            suggestion: format!("Enter a size in MB greater than zero, for example 2.0. ({detail})"),
            status: 400,
            severity: Severity::ClientError,
        },

        PdfwerkError::BadRequest(detail) => HumanError {
            message: "The upload couldn't be read.".into(),
            suggestion: format!("Check that you attached a PDF file and try again. ({detail})"),
            status: 400,
            severity: Severity::ClientError,
        },

        PdfwerkError::PayloadTooLarge { limit } => HumanError {
            message: "This file is too big.".into(),
            suggestion: format!(
                "Files up to {} MB are accepted. Try splitting the PDF first.",
                limit / (1024 * 1024)
            ),
            status: 413,
            severity: Severity::ClientError,
        },

        PdfwerkError::Encrypted => HumanError {
            message: "This PDF is password protected.".into(),
            suggestion: "Enter the document password and try again.".into(),
            status: 400,
            severity: Severity::ClientError,
        },

        PdfwerkError::InvalidPassword => HumanError {
            message: "That password didn't open the PDF.".into(),
            suggestion: "Check the password and try again.".into(),
            status: 400,
            severity: Severity::ClientError,
        },

        PdfwerkError::UnsupportedEncryption(_) => HumanError {
            message: "This PDF's password protection isn't supported.".into(),
            suggestion: "Remove the password in a PDF viewer and upload the unprotected copy.".into(),
            status: 400,
            severity: Severity::ClientError,
        },

        // -- Document and compression errors --
        PdfwerkError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try opening it on a computer first to check it works, or try a different file.".into(),
            status: 500,
            severity: Severity::Permanent,
        },

        PdfwerkError::PageCopy { page, .. } => HumanError {
            message: format!("Page {page} of this PDF couldn't be copied."),
            suggestion: "The page may be damaged. Try re-saving the PDF from another program first.".into(),
            status: 500,
            severity: Severity::Permanent,
        },

        PdfwerkError::CompressionFailed(detail) => HumanError {
            message: "Compression failed.".into(),
            suggestion: format!("None of the compression levels could process this file. ({detail})"),
            status: 500,
            severity: Severity::Permanent,
        },

        PdfwerkError::ImageRecompress(detail) => HumanError {
            message: "An image in this PDF couldn't be compressed.".into(),
            suggestion: format!("Try a different compression level. ({detail})"),
            status: 500,
            severity: Severity::Permanent,
        },

        // -- Storage / server --
        // OS error text can name server paths; callers log the detail.
        PdfwerkError::Io(_) => HumanError {
            message: "The file couldn't be saved or read.".into(),
            suggestion: "Try again in a moment.".into(),
            status: 500,
            severity: Severity::Transient,
        },

        PdfwerkError::Serialization(_) | PdfwerkError::Server(_) => HumanError {
            message: "Something went wrong on our side.".into(),
            suggestion: "Try again in a moment.".into(),
            status: 500,
            severity: Severity::Transient,
        },
    }
}
