// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size-targeting search — try the profiles from gentlest to harshest and
// keep the first output that fits the budget, or the smallest one when none
// does.

use std::io::Write;
use std::path::Path;

use pdfwerk_core::error::{PdfwerkError, Result};
use pdfwerk_core::{CompressionConfig, CompressionProfile, CompressionResult, PROFILES, ProfileName};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::compress::profile::ProfileCompressor;
use crate::pdf::optimizer::StructuralOptimizer;
use crate::pdf::reader::PdfReader;

/// One profile pass of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub profile: ProfileName,
    /// Output size, or `None` when the pass failed.
    pub bytes: Option<u64>,
}

/// Adopted result plus every pass that was tried.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub result: CompressionResult,
    pub attempts: Vec<Attempt>,
}

/// Best candidate so far; owns its scratch file.
struct Candidate {
    profile: ProfileName,
    bytes: u64,
    scratch: NamedTempFile,
}

/// Searches the profile table for an output within a byte budget.
#[derive(Debug, Clone, Default)]
pub struct SizeSearch {
    compressor: ProfileCompressor,
}

impl SizeSearch {
    pub fn new(config: CompressionConfig) -> Self {
        Self {
            compressor: ProfileCompressor::new(config),
        }
    }

    /// Compress `input` to at most `target_bytes` if any profile can, writing
    /// the adopted output to `output_path`.
    ///
    /// Scratch files live next to `output_path` so adoption is a rename.
    #[instrument(skip_all, fields(target_bytes = target_bytes, input_len = input.input_len()))]
    pub fn compress_to_size(
        &self,
        input: &PdfReader,
        output_path: &Path,
        target_bytes: u64,
    ) -> Result<SearchOutcome> {
        if input.input_len() <= target_bytes {
            let achieved = StructuralOptimizer::save(input.document().clone(), output_path)?;
            info!(achieved, "input already within target, optimised only");
            return Ok(SearchOutcome {
                result: CompressionResult {
                    output_path: output_path.to_path_buf(),
                    achieved_bytes: achieved,
                    profile: None,
                    target_met: achieved <= target_bytes,
                },
                attempts: Vec::new(),
            });
        }

        search_profiles(output_path, target_bytes, |profile| {
            self.compressor.compress_to_bytes(input.document(), profile)
        })
    }
}

/// Run `pass` for every profile in order and adopt the first output within
/// `target_bytes`, or the smallest one when none fits.
///
/// The previous best is released before a new scratch file is written, so at
/// most one scratch file exists at any time.
fn search_profiles<F>(output_path: &Path, target_bytes: u64, mut pass: F) -> Result<SearchOutcome>
where
    F: FnMut(&CompressionProfile) -> Result<Vec<u8>>,
{
    let scratch_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut attempts = Vec::with_capacity(PROFILES.len());
    let mut best: Option<Candidate> = None;
    let mut last_error: Option<PdfwerkError> = None;

    for profile in PROFILES.iter() {
        let bytes = match pass(profile) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(profile = %profile.name, %err, "profile attempt failed");
                attempts.push(Attempt {
                    profile: profile.name,
                    bytes: None,
                });
                last_error = Some(err);
                continue;
            }
        };
        let size = bytes.len() as u64;
        attempts.push(Attempt {
            profile: profile.name,
            bytes: Some(size),
        });
        info!(profile = %profile.name, size, target_bytes, "profile attempt measured");

        let fits = size <= target_bytes;
        if !fits && best.as_ref().is_some_and(|current| size >= current.bytes) {
            continue;
        }
        drop(best.take());

        let mut scratch = NamedTempFile::new_in(scratch_dir)?;
        scratch.write_all(&bytes)?;
        scratch.flush()?;

        if fits {
            adopt(scratch, output_path)?;
            return Ok(SearchOutcome {
                result: CompressionResult {
                    output_path: output_path.to_path_buf(),
                    achieved_bytes: size,
                    profile: Some(profile.name),
                    target_met: true,
                },
                attempts,
            });
        }

        debug!(profile = %profile.name, size, "new smallest candidate");
        best = Some(Candidate {
            profile: profile.name,
            bytes: size,
            scratch,
        });
    }

    let Some(best) = best else {
        let cause = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no profile produced output".into());
        return Err(PdfwerkError::CompressionFailed(cause));
    };

    warn!(
        profile = %best.profile,
        achieved = best.bytes,
        target_bytes,
        "target not reachable, adopting smallest output"
    );
    adopt(best.scratch, output_path)?;
    Ok(SearchOutcome {
        result: CompressionResult {
            output_path: output_path.to_path_buf(),
            achieved_bytes: best.bytes,
            profile: Some(best.profile),
            target_met: false,
        },
        attempts,
    })
}

/// Move a scratch file onto `output_path`, copying when a rename is not
/// possible (different filesystem).
fn adopt(scratch: NamedTempFile, output_path: &Path) -> Result<()> {
    match scratch.persist(output_path) {
        Ok(_) => Ok(()),
        Err(err) => {
            debug!(error = %err.error, "rename failed, copying scratch file");
            std::fs::copy(err.file.path(), output_path)?;
            Ok(())
        }
    }
}
