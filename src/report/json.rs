//! JSON report of a run.
//!
//! Field order is part of the format: `entries`, `success`, `duration`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::http::{HttpRequest, HttpResponse, MultipartPart};
use crate::runner::{EntryResult, RunResult};

const INVALID_TEXT_BODY: &str = "<invalid text body>";

#[derive(Debug, Serialize)]
pub struct KeyValueDto {
    pub name: String,
    pub value: String,
}

fn key_values(pairs: &[(String, String)]) -> Vec<KeyValueDto> {
    pairs
        .iter()
        .map(|(name, value)| KeyValueDto {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDataDto {
    pub name: String,
    pub filename: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartFormDataDto {
    pub text_datas: Vec<KeyValueDto>,
    pub file_datas: Vec<FileDataDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpecDto {
    pub method: String,
    pub url: String,
    pub query_string: Vec<KeyValueDto>,
    pub headers: Vec<KeyValueDto>,
    pub cookies: Vec<KeyValueDto>,
    pub form: Vec<KeyValueDto>,
    pub multipart_form_data: MultipartFormDataDto,
    pub body: Option<String>,
}

impl From<&HttpRequest> for RequestSpecDto {
    fn from(request: &HttpRequest) -> Self {
        let mut text_datas = Vec::new();
        let mut file_datas = Vec::new();
        for part in &request.multipart {
            match part {
                MultipartPart::Text { name, value } => text_datas.push(KeyValueDto {
                    name: name.clone(),
                    value: value.clone(),
                }),
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    ..
                } => file_datas.push(FileDataDto {
                    name: name.clone(),
                    filename: filename.clone(),
                    content_type: content_type.clone(),
                }),
            }
        }
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            query_string: key_values(&request.query_params),
            headers: key_values(&request.headers),
            cookies: key_values(&request.cookies),
            form: key_values(&request.form_params),
            multipart_form_data: MultipartFormDataDto {
                text_datas,
                file_datas,
            },
            body: request.body.as_ref().map(|body| {
                String::from_utf8(body.data.clone()).unwrap_or_else(|_| INVALID_TEXT_BODY.to_string())
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseDto {
    pub version: String,
    pub status: u16,
    pub headers: Vec<KeyValueDto>,
    pub body: String,
}

impl From<&HttpResponse> for ResponseDto {
    fn from(response: &HttpResponse) -> Self {
        Self {
            version: response.version.as_str().to_string(),
            status: response.status,
            headers: key_values(&response.headers),
            body: response
                .text()
                .unwrap_or_else(|_| INVALID_TEXT_BODY.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResultDto {
    pub request_spec: Option<RequestSpecDto>,
    pub response: Option<ResponseDto>,
}

impl From<&EntryResult> for EntryResultDto {
    fn from(entry: &EntryResult) -> Self {
        Self {
            request_spec: entry.request_spec.as_ref().map(RequestSpecDto::from),
            response: entry.http_response.as_ref().map(ResponseDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunResultDto {
    pub entries: Vec<EntryResultDto>,
    pub success: bool,
    /// Milliseconds.
    pub duration: u64,
}

impl From<&RunResult> for RunResultDto {
    fn from(result: &RunResult) -> Self {
        Self {
            entries: result.entries.iter().map(EntryResultDto::from).collect(),
            success: result.succeeded(),
            duration: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub fn to_string(result: &RunResult) -> Result<String> {
    serde_json::to_string(&RunResultDto::from(result)).context("Failed to serialize run result")
}

pub fn write(result: &RunResult, path: &Path) -> Result<()> {
    let text = to_string(result)?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write JSON report to {}", path.display()))
}
