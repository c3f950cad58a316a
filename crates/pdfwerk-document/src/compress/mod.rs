// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression drivers — one named profile, or a search over the profiles
// for a size budget.

pub mod profile;
pub mod search;

pub use profile::ProfileCompressor;
pub use search::{Attempt, SearchOutcome, SizeSearch};
