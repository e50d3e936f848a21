//! Request body extractors that reject with [`AppError`] instead of axum's plain-text
//! rejections, so malformed bodies come back in the standard validation envelope.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// A file part of a multipart request, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Lower-cased extension of the client-supplied file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

/// FormPayload
///
/// Accepts either `multipart/form-data` (text parts become fields, file parts are
/// collected into `files`) or a JSON object. Either way the fields are deserialized
/// into `T`, so the same handler serves browser forms and API clients.
#[derive(Debug)]
pub struct FormPayload<T> {
    pub fields: T,
    pub files: Vec<UploadedFile>,
}

impl<T> FormPayload<T> {
    /// Files submitted under any of `names` (e.g. `images` and `images[]`).
    pub fn files_named(&self, names: &[&str]) -> Vec<UploadedFile> {
        self.files
            .iter()
            .filter(|f| names.contains(&f.field.as_str()))
            .cloned()
            .collect()
    }
}

fn body_error(message: impl Into<String>) -> AppError {
    AppError::invalid("body", message)
}

impl<S, T> FromRequest<S> for FormPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let (object, files) = if is_multipart {
            read_multipart(Multipart::from_request(req, state).await.map_err(|e| {
                body_error(e.body_text())
            })?)
            .await?
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| body_error(e.body_text()))?;
            (read_json_object(&bytes)?, Vec::new())
        };

        let fields = serde_json::from_value(Value::Object(object))
            .map_err(|e| body_error(format!("Invalid request body: {e}")))?;

        Ok(FormPayload { fields, files })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Map<String, Value>, Vec<UploadedFile>), AppError> {
    let mut object = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_ascii_lowercase();
                let bytes = field.bytes().await.map_err(|e| body_error(e.body_text()))?;
                // Browsers submit an empty part for an untouched file input.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    bytes,
                });
            }
            None => {
                let text = field.text().await.map_err(|e| body_error(e.body_text()))?;
                object.insert(name, Value::String(text));
            }
        }
    }

    Ok((object, files))
}

fn read_json_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(body_error("Request body must be a JSON object")),
        Err(e) => Err(body_error(format!("Malformed JSON: {e}"))),
    }
}

/// JsonBody
///
/// `axum::Json` with the rejection mapped onto a `body` field error.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|e| body_error(e.body_text()))
    }
}
