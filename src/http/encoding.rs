use std::io::Read;

use encoding_rs::Encoding;
use flate2::read::{GzDecoder, ZlibDecoder};

use super::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Deflate,
    Zstd,
    Identity,
}

impl ContentEncoding {
    pub fn parse(value: &str) -> Result<Self, HttpError> {
        match value.to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Ok(ContentEncoding::Gzip),
            "deflate" => Ok(ContentEncoding::Deflate),
            "zstd" => Ok(ContentEncoding::Zstd),
            "identity" => Ok(ContentEncoding::Identity),
            _ => Err(HttpError::UnsupportedContentEncoding(value.to_string())),
        }
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, HttpError> {
        let mut decoded = Vec::new();
        let result = match self {
            ContentEncoding::Gzip => GzDecoder::new(data).read_to_end(&mut decoded),
            ContentEncoding::Deflate => ZlibDecoder::new(data).read_to_end(&mut decoded),
            ContentEncoding::Zstd => {
                return zstd::stream::decode_all(data)
                    .map_err(|e| HttpError::Decompression(format!("invalid zstd data: {e}")))
            }
            ContentEncoding::Identity => return Ok(data.to_vec()),
        };
        result.map_err(|e| HttpError::Decompression(format!("invalid {self:?} data: {e}")))?;
        Ok(decoded)
    }
}

/// Undoes encodings in reverse order of application.
pub(super) fn decode_all(body: &[u8], encodings: &[ContentEncoding]) -> Result<Vec<u8>, HttpError> {
    let mut buffer = body.to_vec();
    for encoding in encodings.iter().rev() {
        buffer = encoding.decode(&buffer)?;
    }
    Ok(buffer)
}

/// Charset parameter of a `Content-Type` value.
fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

pub(super) fn decode_text(body: &[u8], content_type: Option<&str>) -> Result<String, HttpError> {
    let label = content_type.and_then(charset).unwrap_or("utf-8");
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| HttpError::UnknownCharset(label.to_string()))?;
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| HttpError::InvalidText(encoding.name().to_string()))
}
