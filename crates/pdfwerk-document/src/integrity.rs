// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output fingerprints — SHA-256 digests of compressed documents.

use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a lowercase hex string.
///
/// Compression is deterministic, so two runs over the same input and
/// profile must produce the same digest.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
