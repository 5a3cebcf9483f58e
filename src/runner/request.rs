//! Turns a parsed request into a concrete [`HttpRequest`].

use std::path::Path;

use crate::ast::{self, Bytes, KeyValue, MultipartParam, Template};
use crate::http::{HttpRequest, MultipartPart, RequestBody};
use crate::parser::Position;
use crate::template;
use crate::variables::VariableStore;

use super::RunError;

fn render(template: &Template, variables: &VariableStore) -> Result<String, RunError> {
    Ok(template::render(
        &template.value,
        variables,
        template.position,
    )?)
}

fn render_pairs(
    pairs: &[KeyValue],
    variables: &VariableStore,
) -> Result<Vec<(String, String)>, RunError> {
    pairs
        .iter()
        .map(|kv| Ok((kv.key.clone(), render(&kv.value, variables)?)))
        .collect()
}

fn read_file(filename: &str, position: Position, file_root: &Path) -> Result<Vec<u8>, RunError> {
    let path = file_root.join(filename);
    std::fs::read(&path).map_err(|e| RunError::Runtime {
        message: format!("file {} can not be read: {e}", path.display()),
        position,
    })
}

/// Bytes of a body, with templates rendered and files read from `file_root`.
pub fn body_bytes(
    bytes: &Bytes,
    variables: &VariableStore,
    file_root: &Path,
) -> Result<Vec<u8>, RunError> {
    match bytes {
        Bytes::Json(text) | Bytes::Xml(text) | Bytes::Raw(text) => {
            Ok(render(text, variables)?.into_bytes())
        }
        Bytes::Base64(data) => Ok(data.clone()),
        Bytes::File { filename, position } => read_file(filename, *position, file_root),
    }
}

fn content_type(bytes: &Bytes) -> Option<String> {
    match bytes {
        Bytes::Json(_) => Some("application/json".to_string()),
        Bytes::Xml(_) => Some("application/xml".to_string()),
        _ => None,
    }
}

/// Renders every template of `request` against `variables`.
pub fn render_request(
    request: &ast::Request,
    variables: &VariableStore,
    file_root: &Path,
) -> Result<HttpRequest, RunError> {
    let body = match &request.body {
        Some(body) => Some(RequestBody {
            data: body_bytes(&body.bytes, variables, file_root)?,
            content_type: content_type(&body.bytes),
        }),
        None => None,
    };
    let multipart = request
        .multipart
        .iter()
        .map(|param| match param {
            MultipartParam::Text(kv) => Ok(MultipartPart::Text {
                name: kv.key.clone(),
                value: render(&kv.value, variables)?,
            }),
            MultipartParam::File(file) => Ok(MultipartPart::File {
                name: file.key.clone(),
                filename: file.filename.clone(),
                data: read_file(&file.filename, file.position, file_root)?,
                content_type: file.content_type.clone(),
            }),
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    Ok(HttpRequest {
        method: request.method.as_str().to_string(),
        url: render(&request.url, variables)?,
        headers: render_pairs(&request.headers, variables)?,
        query_params: render_pairs(&request.query_params, variables)?,
        form_params: render_pairs(&request.form_params, variables)?,
        multipart,
        cookies: render_pairs(&request.cookies, variables)?,
        body,
    })
}
