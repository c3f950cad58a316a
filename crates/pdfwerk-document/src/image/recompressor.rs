// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image recompressor — decodes an embedded PDF image, downscales it with
// Lanczos3 and re-encodes it as JPEG. Operates on detached `EmbeddedImage`
// values using the `image` crate, so it never touches the source document.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Object, Stream};
use pdfwerk_core::CompressionProfile;
use pdfwerk_core::error::{PdfwerkError, Result};
use tracing::{debug, instrument, warn};

use crate::pdf::images::{EmbeddedImage, SampleEncoding};

/// Images whose larger side is at or below this many pixels are left alone.
pub const DEFAULT_MIN_DIMENSION_PX: u32 = 1000;

/// Stream dictionary keys that describe the old encoding and are rewritten.
const REWRITTEN_KEYS: [&[u8]; 7] = [
    b"Filter",
    b"DecodeParms",
    b"Length",
    b"Width",
    b"Height",
    b"BitsPerComponent",
    b"ColorSpace",
];

/// Why an image was passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Four or more colour channels; channel-reducing JPEG would shift colours.
    Cmyk,
    /// Stencil mask.
    Mask,
    /// Larger side at or below the minimum dimension.
    Small,
    /// The profile does not scale images down.
    NoScaling,
    /// Re-encoding did not beat the stored stream.
    NotSmaller,
    /// Decoding or encoding failed; the failure was logged.
    Failed,
}

/// Result of recompressing one image.
#[derive(Debug, Clone)]
pub enum Recompressed {
    /// A smaller replacement stream, ready to substitute.
    Replaced(Stream),
    /// Keep the original stream.
    Unchanged(Skip),
}

impl Recompressed {
    /// The replacement stream, if one was produced.
    pub fn replacement(&self) -> Option<&Stream> {
        match self {
            Self::Replaced(stream) => Some(stream),
            Self::Unchanged(_) => None,
        }
    }
}

/// Re-encodes embedded images at one profile's scale and quality.
#[derive(Debug, Clone, Copy)]
pub struct ImageRecompressor {
    scale_factor: f32,
    jpeg_quality: u8,
    min_dimension_px: u32,
}

impl ImageRecompressor {
    /// Recompressor using a profile's scale factor and JPEG quality.
    pub fn new(profile: &CompressionProfile) -> Self {
        Self::with_parameters(profile.scale_factor, profile.jpeg_quality)
    }

    /// Recompressor with explicit parameters. Quality is clamped to 1-100.
    pub fn with_parameters(scale_factor: f32, jpeg_quality: u8) -> Self {
        Self {
            scale_factor,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            min_dimension_px: DEFAULT_MIN_DIMENSION_PX,
        }
    }

    /// Override the small-image threshold.
    pub fn with_min_dimension(mut self, min_dimension_px: u32) -> Self {
        self.min_dimension_px = min_dimension_px;
        self
    }

    /// Target pixel dimensions for an image of `width` x `height`.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.scale_factor).round() as u32).max(1);
        (scale(width), scale(height))
    }

    /// Recompress, absorbing any failure: a bad image is logged and kept.
    pub fn recompress_or_keep(&self, image: &EmbeddedImage) -> Recompressed {
        match self.recompress(image) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    image = ?image.id,
                    width = image.width,
                    height = image.height,
                    error = %err,
                    "image left unchanged"
                );
                Recompressed::Unchanged(Skip::Failed)
            }
        }
    }

    /// Recompress a single image.
    ///
    /// Returns `Ok(Unchanged(..))` when policy says to keep the image and
    /// `Err(ImageRecompress)` when it cannot be decoded or encoded.
    #[instrument(skip_all, fields(image = ?image.id, width = image.width, height = image.height))]
    pub fn recompress(&self, image: &EmbeddedImage) -> Result<Recompressed> {
        if image.is_mask {
            return Ok(Recompressed::Unchanged(Skip::Mask));
        }
        if image.channels.is_some_and(|c| c >= 4) {
            debug!("CMYK image passed through");
            return Ok(Recompressed::Unchanged(Skip::Cmyk));
        }
        if self.scale_factor >= 1.0 {
            return Ok(Recompressed::Unchanged(Skip::NoScaling));
        }
        if image.max_dimension() <= self.min_dimension_px {
            return Ok(Recompressed::Unchanged(Skip::Small));
        }

        let (new_width, new_height) = self.target_dimensions(image.width, image.height);
        let jpeg = {
            let decoded = decode(image)?;
            let resized = decoded.resize_exact(new_width, new_height, FilterType::Lanczos3);
            drop(decoded);
            encode_jpeg(&resized, self.jpeg_quality)?
        };

        if jpeg.len() >= image.encoded_len() {
            debug!(
                original = image.encoded_len(),
                reencoded = jpeg.len(),
                "re-encoded image is not smaller"
            );
            return Ok(Recompressed::Unchanged(Skip::NotSmaller));
        }

        debug!(
            new_width,
            new_height,
            original = image.encoded_len(),
            reencoded = jpeg.len(),
            "image recompressed"
        );
        Ok(Recompressed::Replaced(replacement_stream(image, jpeg)))
    }
}

/// Encoded JPEG plus the colour layout it was written with.
struct Jpeg {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    gray: bool,
}

impl Jpeg {
    fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Decode the samples of an embedded image into a `DynamicImage`.
fn decode(image: &EmbeddedImage) -> Result<DynamicImage> {
    match &image.encoding {
        SampleEncoding::Jpeg => {
            image::load_from_memory_with_format(&image.stream.content, ImageFormat::Jpeg).map_err(
                |err| PdfwerkError::ImageRecompress(format!("failed to decode JPEG: {err}")),
            )
        }
        SampleEncoding::Decodable => decode_samples(image),
        SampleEncoding::Unsupported(filter) => Err(PdfwerkError::ImageRecompress(format!(
            "unsupported image filter {filter}"
        ))),
    }
}

/// Build an image from raw 8-bit gray or RGB samples.
fn decode_samples(image: &EmbeddedImage) -> Result<DynamicImage> {
    if image.bits_per_component != 8 {
        return Err(PdfwerkError::ImageRecompress(format!(
            "{} bits per component not supported",
            image.bits_per_component
        )));
    }
    let channels = image.channels.ok_or_else(|| {
        PdfwerkError::ImageRecompress("colour space is not a plain component space".into())
    })?;

    let mut samples = if image.stream.dict.get(b"Filter").is_ok() {
        image.stream.decompressed_content().map_err(|err| {
            PdfwerkError::ImageRecompress(format!("failed to inflate samples: {err}"))
        })?
    } else {
        image.stream.content.clone()
    };

    let expected = image.width as usize * image.height as usize * channels as usize;
    if samples.len() < expected {
        return Err(PdfwerkError::ImageRecompress(format!(
            "sample data too short: {} bytes, expected {expected}",
            samples.len()
        )));
    }
    samples.truncate(expected);

    let built = match channels {
        1 => GrayImage::from_raw(image.width, image.height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(image.width, image.height, samples).map(DynamicImage::ImageRgb8),
        other => {
            return Err(PdfwerkError::ImageRecompress(format!(
                "{other} colour channels not supported"
            )));
        }
    };
    built.ok_or_else(|| PdfwerkError::ImageRecompress("sample buffer size mismatch".into()))
}

/// Encode as JPEG, keeping single-channel images gray.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Jpeg> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);
    let gray = matches!(
        image,
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_)
    );
    let written = if gray {
        image.to_luma8().write_with_encoder(encoder)
    } else {
        image.to_rgb8().write_with_encoder(encoder)
    };
    written.map_err(|err| PdfwerkError::ImageRecompress(format!("JPEG encoding failed: {err}")))?;
    Ok(Jpeg {
        bytes,
        width: image.width(),
        height: image.height(),
        gray,
    })
}

/// Build the substitute XObject: the original dictionary with the encoding
/// keys rewritten for a `DCTDecode` stream. Other keys (`/SMask`,
/// `/Decode`, `/Interpolate`, `/Intent`, ...) are kept.
fn replacement_stream(image: &EmbeddedImage, jpeg: Jpeg) -> Stream {
    let mut dict = Dictionary::new();
    for (key, value) in image.stream.dict.iter() {
        if !REWRITTEN_KEYS.contains(&key.as_slice()) {
            dict.set(key.clone(), value.clone());
        }
    }

    let keep_color_space = match (jpeg.gray, image.channels) {
        (true, Some(1)) | (false, Some(3)) => image.stream.dict.get(b"ColorSpace").ok().cloned(),
        _ => None,
    };
    let color_space = keep_color_space.unwrap_or_else(|| {
        Object::Name(if jpeg.gray { b"DeviceGray".to_vec() } else { b"DeviceRGB".to_vec() })
    });

    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(jpeg.width as i64));
    dict.set("Height", Object::Integer(jpeg.height as i64));
    dict.set("ColorSpace", color_space);
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Length", Object::Integer(jpeg.bytes.len() as i64));

    let mut stream = Stream::new(dict, jpeg.bytes);
    stream.allows_compression = false;
    stream
}
