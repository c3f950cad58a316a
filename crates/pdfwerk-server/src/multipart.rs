// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// multipart/form-data decoding for the upload endpoint, on top of `multer`.

use std::io::Cursor;

use pdfwerk_core::error::{PdfwerkError, Result};
use tracing::debug;

/// One form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// All fields of a form, in upload order.
#[derive(Debug, Clone, Default)]
pub struct Multipart {
    parts: Vec<Part>,
}

impl Multipart {
    /// Decode `body` using the boundary from a `Content-Type` header value.
    pub async fn from_request(content_type: Option<&str>, body: Vec<u8>) -> Result<Self> {
        let content_type = content_type
            .ok_or_else(|| PdfwerkError::BadRequest("missing Content-Type".into()))?;
        let boundary = multer::parse_boundary(content_type).map_err(|err| {
            PdfwerkError::BadRequest(format!(
                "expected multipart/form-data with a boundary, got {content_type}: {err}"
            ))
        })?;

        let mut form = multer::Multipart::with_reader(Cursor::new(body), boundary);
        let mut parts = Vec::new();
        while let Some(field) = form.next_field().await.map_err(malformed)? {
            let name = field
                .name()
                .map(str::to_string)
                .ok_or_else(|| PdfwerkError::BadRequest("form field without a name".into()))?;
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());
            let data = field.bytes().await.map_err(malformed)?.to_vec();
            debug!(field = %name, bytes = data.len(), "form field read");
            parts.push(Part {
                name,
                filename,
                content_type,
                data,
            });
        }

        Ok(Self { parts })
    }

    /// First field called `name`.
    pub fn field(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name)
    }

    /// Text value of a field, trimmed. Empty values count as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        let part = self.field(name)?;
        let value = String::from_utf8_lossy(&part.data).trim().to_string();
        (!value.is_empty()).then_some(value)
    }

    /// Take ownership of the first field called `name`.
    pub fn take(&mut self, name: &str) -> Option<Part> {
        let index = self.parts.iter().position(|part| part.name == name)?;
        Some(self.parts.remove(index))
    }
}

fn malformed(err: multer::Error) -> PdfwerkError {
    PdfwerkError::BadRequest(format!("malformed multipart body: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::encode_form;

    const BOUNDARY: &str = "----pdfwerk7MA4YWxk";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn parses_text_and_file_fields() {
        let pdf = b"%PDF-1.5\r\n--not-a-boundary\r\n%%EOF".to_vec();
        let body = encode_form(
            BOUNDARY,
            &[
                Part::text("method", "size"),
                Part::text("target_size", " 1.5 "),
                Part::file("file", "report.pdf", "application/pdf", pdf.clone()),
            ],
        );
        let form = Multipart::from_request(Some(&content_type()), body).await.unwrap();

        assert_eq!(form.text("method").as_deref(), Some("size"));
        assert_eq!(form.text("target_size").as_deref(), Some("1.5"));
        let file = form.field("file").unwrap();
        assert_eq!(file.filename.as_deref(), Some("report.pdf"));
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.data, pdf);
    }

    #[tokio::test]
    async fn quoted_boundary_is_accepted() {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"quality\"\r\n\r\n\
             high\r\n\
             --{BOUNDARY}--\r\n"
        );
        let form = Multipart::from_request(
            Some(&format!("Multipart/Form-Data; charset=utf-8; boundary=\"{BOUNDARY}\"")),
            body.into_bytes(),
        )
        .await
        .unwrap();
        assert_eq!(form.text("quality").as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn empty_text_counts_as_absent() {
        let body = encode_form(BOUNDARY, &[Part::text("quality", "")]);
        let form = Multipart::from_request(Some(&content_type()), body).await.unwrap();
        assert!(form.field("quality").is_some());
        assert_eq!(form.text("quality"), None);
    }

    #[tokio::test]
    async fn take_removes_the_field() {
        let body = encode_form(
            BOUNDARY,
            &[Part::file("file", "a.pdf", "application/pdf", vec![1, 2])],
        );
        let mut form = Multipart::from_request(Some(&content_type()), body).await.unwrap();
        assert_eq!(form.take("file").unwrap().data, vec![1, 2]);
        assert!(form.take("file").is_none());
    }

    #[tokio::test]
    async fn missing_or_wrong_content_type_is_rejected() {
        assert!(matches!(
            Multipart::from_request(None, Vec::new()).await,
            Err(PdfwerkError::BadRequest(_))
        ));
        assert!(matches!(
            Multipart::from_request(Some("text/plain"), Vec::new()).await,
            Err(PdfwerkError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn unterminated_body_is_rejected() {
        let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nabc");
        assert!(matches!(
            Multipart::from_request(Some(&content_type()), body.into_bytes()).await,
            Err(PdfwerkError::BadRequest(_))
        ));
    }
}
