// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The compress endpoint: form validation and the blocking compression job.

use std::path::Path;

use tracing::{info, instrument};
use uuid::Uuid;

use pdfwerk_core::error::{PdfwerkError, Result};
use pdfwerk_core::{AppConfig, CompressionConfig, CompressionRequest, ProfileName};
use pdfwerk_document::integrity::hash_bytes;
use pdfwerk_document::{PdfReader, ProfileCompressor, SizeSearch};

use crate::http::HttpResponse;
use crate::multipart::Multipart;

/// A validated `POST /api/compress` form.
#[derive(Debug, Clone)]
pub struct CompressForm {
    pub pdf: Vec<u8>,
    pub filename: String,
    pub request: CompressionRequest,
    pub password: Option<String>,
}

impl CompressForm {
    /// Validate the uploaded fields, filling in configured defaults.
    ///
    /// Only the parameter for the chosen method is parsed: `quality` in
    /// quality mode, `target_size` in size mode.
    pub fn from_multipart(mut form: Multipart, config: &CompressionConfig) -> Result<Self> {
        let file = form
            .take("file")
            .ok_or_else(|| PdfwerkError::BadRequest("no file uploaded".into()))?;
        let filename = file.filename.clone().unwrap_or_default();
        if filename.trim().is_empty() {
            return Err(PdfwerkError::BadRequest("no file selected".into()));
        }
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(PdfwerkError::BadRequest(format!(
                "only PDF files are accepted, got {filename}"
            )));
        }

        let method = form.text("method").unwrap_or_else(|| "quality".into());
        let request = match method.to_ascii_lowercase().as_str() {
            "quality" => {
                let profile = match form.text("quality") {
                    Some(name) => name.parse::<ProfileName>()?,
                    None => config.default_profile,
                };
                CompressionRequest::Profile(profile)
            }
            "size" => {
                let target_mb = match form.text("target_size") {
                    Some(raw) => raw.parse::<f64>().map_err(|_| {
                        PdfwerkError::InvalidTarget(format!("{raw:?} is not a number"))
                    })?,
                    None => config.default_target_mb,
                };
                CompressionRequest::target_mb(target_mb)?
            }
            other => {
                return Err(PdfwerkError::BadRequest(format!(
                    "method must be 'quality' or 'size', got {other:?}"
                )));
            }
        };

        Ok(Self {
            pdf: file.data,
            filename,
            request,
            password: form.text("password"),
        })
    }
}

/// Outcome of one request's compression job.
#[derive(Debug, Clone)]
pub struct CompressedPdf {
    pub bytes: Vec<u8>,
    /// Profile whose output was returned; `None` when only the structural
    /// optimiser ran.
    pub profile: Option<ProfileName>,
    pub target_met: bool,
}

impl CompressedPdf {
    pub fn into_response(self) -> HttpResponse {
        let profile = self
            .profile
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "none".into());
        let achieved = self.bytes.len();
        HttpResponse::new(200, "application/pdf", self.bytes)
            .with_header(
                "Content-Disposition",
                "attachment; filename=\"compressed.pdf\"",
            )
            .with_header("X-Achieved-Size", achieved.to_string())
            .with_header("X-Compression-Profile", profile)
    }
}

/// Run one compression job. Blocking; call from `spawn_blocking`.
///
/// The upload and all outputs live in a private temporary directory that is
/// removed when this returns, whatever the outcome.
#[instrument(skip_all, fields(request_id = %request_id, filename = %form.filename, input_len = form.pdf.len()))]
pub fn run_compression(form: CompressForm, config: &AppConfig, request_id: Uuid) -> Result<CompressedPdf> {
    let work = match &config.server.work_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            tempfile::Builder::new().prefix("pdfwerk-").tempdir_in(dir)?
        }
        None => tempfile::Builder::new().prefix("pdfwerk-").tempdir()?,
    };
    let input_path = work.path().join(format!("{request_id}-input.pdf"));
    let output_path = work.path().join(format!("{request_id}-compressed.pdf"));
    std::fs::write(&input_path, &form.pdf)?;

    let reader = PdfReader::open_with_password(&input_path, form.password.as_deref())?;
    let (profile, target_met) = compress(&reader, &output_path, form.request, &config.compression)?;

    let bytes = read_output(&output_path)?;
    info!(
        achieved = bytes.len(),
        profile = profile.map(|p| p.as_str()).unwrap_or("none"),
        target_met,
        sha256 = %hash_bytes(&bytes),
        "request compressed"
    );
    Ok(CompressedPdf {
        bytes,
        profile,
        target_met,
    })
}

fn compress(
    reader: &PdfReader,
    output_path: &Path,
    request: CompressionRequest,
    config: &CompressionConfig,
) -> Result<(Option<ProfileName>, bool)> {
    match request {
        CompressionRequest::Profile(name) => {
            ProfileCompressor::new(config.clone()).compress(
                reader.document(),
                output_path,
                name.as_str(),
            )?;
            Ok((Some(name), true))
        }
        CompressionRequest::TargetSize(target_bytes) => {
            let outcome = SizeSearch::new(config.clone()).compress_to_size(
                reader,
                output_path,
                target_bytes,
            )?;
            Ok((outcome.result.profile, outcome.result.target_met))
        }
    }
}

fn read_output(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        PdfwerkError::CompressionFailed(format!("compressed output missing: {err}"))
    })
}
