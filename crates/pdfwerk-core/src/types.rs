// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for pdfwerk compression.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PdfwerkError, Result};

/// Number of bytes in one megabyte as the HTTP surface counts them.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// The four named compression profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Low,
    Medium,
    High,
    Extreme,
}

impl ProfileName {
    /// All profiles, least aggressive first. The size search walks this order.
    pub const ALL: [ProfileName; 4] = [
        ProfileName::Low,
        ProfileName::Medium,
        ProfileName::High,
        ProfileName::Extreme,
    ];

    /// Lowercase wire name (`low`, `medium`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }

    /// Look up the parameters for this profile.
    pub fn profile(&self) -> &'static CompressionProfile {
        // PROFILES is indexed in `ALL` order.
        &PROFILES[*self as usize]
    }
}

impl FromStr for ProfileName {
    type Err = PdfwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "extreme" => Ok(Self::Extreme),
            _ => Err(PdfwerkError::InvalidProfile(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression aggressiveness parameters for one named profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionProfile {
    pub name: ProfileName,
    /// Relative linear scale applied to image dimensions, in (0, 1].
    pub scale_factor: f32,
    /// Nominal output resolution.
    pub dpi: u32,
    /// JPEG re-encode quality, 0-100.
    pub jpeg_quality: u8,
}

/// Fixed profile table, strictly more aggressive row by row.
pub static PROFILES: [CompressionProfile; 4] = [
    CompressionProfile {
        name: ProfileName::Low,
        scale_factor: 0.9,
        dpi: 200,
        jpeg_quality: 90,
    },
    CompressionProfile {
        name: ProfileName::Medium,
        scale_factor: 0.7,
        dpi: 150,
        jpeg_quality: 80,
    },
    CompressionProfile {
        name: ProfileName::High,
        scale_factor: 0.5,
        dpi: 100,
        jpeg_quality: 70,
    },
    CompressionProfile {
        name: ProfileName::Extreme,
        scale_factor: 0.3,
        dpi: 72,
        jpeg_quality: 60,
    },
];

impl CompressionProfile {
    /// Resolve a profile by its wire name.
    pub fn by_name(name: &str) -> Result<&'static CompressionProfile> {
        name.parse::<ProfileName>().map(|p| p.profile())
    }
}

/// What the caller asked for. Exactly one mode is active per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionRequest {
    /// Apply one named profile.
    Profile(ProfileName),
    /// Search the profiles for an output no larger than this many bytes.
    TargetSize(u64),
}

impl CompressionRequest {
    /// Build a size-mode request from a target expressed in megabytes.
    pub fn target_mb(target_mb: f64) -> Result<Self> {
        mb_to_bytes(target_mb).map(Self::TargetSize)
    }
}

/// Output of one compression request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionResult {
    /// Where the compressed document was written.
    pub output_path: PathBuf,
    /// Size of the written document in bytes.
    pub achieved_bytes: u64,
    /// Profile whose output was adopted; `None` when only structural
    /// optimisation ran.
    pub profile: Option<ProfileName>,
    /// Whether the requested size budget was met (always true in profile mode).
    pub target_met: bool,
}

/// Convert a positive, finite megabyte value to bytes.
pub fn mb_to_bytes(mb: f64) -> Result<u64> {
    if !mb.is_finite() || mb <= 0.0 {
        return Err(PdfwerkError::InvalidTarget(format!(
            "target size must be a positive number of MB, got {mb}"
        )));
    }
    Ok((mb * BYTES_PER_MB as f64).round() as u64)
}

/// Convert bytes to megabytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_strictly_ordered_by_aggressiveness() {
        for pair in PROFILES.windows(2) {
            let (gentle, harsh) = (&pair[0], &pair[1]);
            assert!(harsh.scale_factor < gentle.scale_factor);
            assert!(harsh.dpi < gentle.dpi);
            assert!(harsh.jpeg_quality < gentle.jpeg_quality);
        }
    }

    #[test]
    fn profile_table_matches_name_order() {
        for name in ProfileName::ALL {
            assert_eq!(name.profile().name, name);
        }
        assert!(PROFILES.iter().all(|p| p.scale_factor > 0.0 && p.scale_factor <= 1.0));
    }

    #[test]
    fn parse_known_profile_names() {
        assert_eq!("low".parse::<ProfileName>().unwrap(), ProfileName::Low);
        assert_eq!(" High ".parse::<ProfileName>().unwrap(), ProfileName::High);
        assert_eq!(
            CompressionProfile::by_name("extreme").unwrap().jpeg_quality,
            60
        );
    }

    #[test]
    fn unknown_profile_is_rejected() {
        match "ultra".parse::<ProfileName>() {
            Err(PdfwerkError::InvalidProfile(name)) => assert_eq!(name, "ultra"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn megabytes_convert_with_binary_units() {
        assert_eq!(mb_to_bytes(2.0).unwrap(), 2 * 1024 * 1024);
        assert_eq!(mb_to_bytes(0.5).unwrap(), 512 * 1024);
        assert!((bytes_to_mb(3 * BYTES_PER_MB) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_target_is_rejected() {
        assert!(matches!(mb_to_bytes(0.0), Err(PdfwerkError::InvalidTarget(_))));
        assert!(matches!(mb_to_bytes(-1.5), Err(PdfwerkError::InvalidTarget(_))));
        assert!(matches!(
            CompressionRequest::target_mb(f64::NAN),
            Err(PdfwerkError::InvalidTarget(_))
        ));
    }
}
