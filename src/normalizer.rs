//! Turns an inbound multipart or JSON body into an [`UploadedImage`] plus
//! [`StyleParameters`].

use crate::{
    data_url,
    error::{RedesignError, Result},
    models::{FieldMap, StyleParameters, UploadedImage},
};
use actix_multipart::Multipart;
use futures::StreamExt;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Recognized image field names, in lookup order.
pub const IMAGE_FIELD_NAMES: [&str; 4] = ["image", "photo", "file", "init_image"];

/// Text field names that carry the photo as a data URL.
const DATA_URL_KEYS: [&str; 2] = ["dataUrl", "data_url"];

static NULL: Value = Value::Null;

#[derive(Debug)]
pub struct NormalizedInput {
    pub image: UploadedImage,
    pub params: StyleParameters,
}

/// A file field spooled to the scratch directory. The temp file is removed on drop.
#[derive(Debug)]
pub struct BufferedFile {
    pub field_name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    file: NamedTempFile,
}

impl BufferedFile {
    pub fn new(
        field_name: impl Into<String>,
        filename: Option<String>,
        content_type: Option<String>,
        size: usize,
        file: NamedTempFile,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            filename,
            content_type,
            size,
            file,
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut handle = self.file.reopen()?;
        let mut bytes = Vec::new();
        handle.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: Vec<BufferedFile>,
    pub fields: FieldMap,
}

/// Buffers every multipart field. File fields go to temp files under `scratch_dir`;
/// empty file parts are dropped. Text fields keep their first value.
/// The combined size of all fields is capped at `max_bytes`.
pub async fn read_multipart(
    mut payload: Multipart,
    scratch_dir: &Path,
    max_bytes: usize,
) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();
    let mut total = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            RedesignError::InvalidInput(format!("Invalid multipart data: {}", e))
        })?;

        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);
        let content_type = field.content_type().map(|m| m.to_string());

        let is_file = filename.is_some() || IMAGE_FIELD_NAMES.contains(&field_name.as_str());
        if is_file {
            let mut temp = tempfile::Builder::new()
                .prefix("roomgen-upload-")
                .tempfile_in(scratch_dir)?;
            let mut size = 0usize;
            while let Some(chunk) = field.next().await {
                let bytes = chunk.map_err(|e| {
                    RedesignError::InvalidInput(format!("Error reading file field '{}': {}", field_name, e))
                })?;
                size += bytes.len();
                total += bytes.len();
                check_size(total, max_bytes)?;
                temp.write_all(&bytes)?;
            }
            if size == 0 {
                log::debug!("Skipping empty file field '{}'", field_name);
                continue;
            }
            temp.flush()?;
            log::debug!("Buffered file field '{}' to {}", field_name, temp.path().display());
            form.files
                .push(BufferedFile::new(field_name, filename, content_type, size, temp));
        } else {
            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let bytes = chunk.map_err(|e| {
                    RedesignError::InvalidInput(format!("Error reading field '{}': {}", field_name, e))
                })?;
                total += bytes.len();
                check_size(total, max_bytes)?;
                data.extend_from_slice(&bytes);
            }
            form.fields
                .entry(field_name)
                .or_insert_with(|| String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok(form)
}

pub(crate) fn check_size(total: usize, max_bytes: usize) -> Result<()> {
    if total > max_bytes {
        return Err(RedesignError::InvalidInput(format!(
            "Request body exceeds the {} byte limit",
            max_bytes
        )));
    }
    Ok(())
}

/// Returns the item under the first recognized name, else the first item.
pub fn select_image_field<'a, T>(items: &'a [T], name: impl Fn(&T) -> &str) -> Option<&'a T> {
    IMAGE_FIELD_NAMES
        .iter()
        .find_map(|wanted| items.iter().find(|item| name(*item) == *wanted))
        .or_else(|| items.first())
}

pub fn normalize_multipart(form: MultipartForm) -> Result<NormalizedInput> {
    let params = StyleParameters::from_fields(&form.fields);

    let uploads: Vec<&BufferedFile> = form.files.iter().filter(|f| f.size > 0).collect();
    if let Some(file) = select_image_field(&uploads, |f| f.field_name.as_str()) {
        log::debug!(
            "Using uploaded file from field '{}' ({})",
            file.field_name,
            file.filename.as_deref().unwrap_or("unnamed")
        );
        let bytes = file.read_bytes()?;
        // A plain text field under an image name may carry a data URL.
        let image = if file.filename.is_none() && bytes.starts_with(b"data:") {
            let parsed = data_url::parse(&String::from_utf8_lossy(&bytes))?;
            UploadedImage::new(parsed.bytes, Some(parsed.mime_type), None)?
        } else {
            UploadedImage::new(bytes, file.content_type.clone(), file.filename.clone())?
        };
        return Ok(NormalizedInput { image, params });
    }

    // Some clients post the photo as a data URL under a dedicated text field.
    if let Some(value) = find_data_url_field(&form.fields) {
        let parsed = data_url::parse(value)?;
        let image = UploadedImage::new(parsed.bytes, Some(parsed.mime_type), None)?;
        return Ok(NormalizedInput { image, params });
    }

    Err(missing_image())
}

fn find_data_url_field(fields: &FieldMap) -> Option<&str> {
    DATA_URL_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .map(|v| v.trim())
        .find(|v| v.starts_with("data:"))
}

pub fn normalize_json(body: &[u8]) -> Result<NormalizedInput> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RedesignError::InvalidInput(format!("Invalid JSON body: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| RedesignError::InvalidInput("JSON body must be an object".into()))?;

    let image_key = IMAGE_FIELD_NAMES
        .iter()
        .chain(DATA_URL_KEYS.iter())
        .copied()
        .find(|key| object.get(*key).map_or(false, |v| !is_blank(v)));

    let mut fields = FieldMap::new();
    for (key, value) in object {
        if Some(key.as_str()) == image_key {
            continue;
        }
        if let Some(text) = field_text(value) {
            fields.insert(key.clone(), text);
        }
    }
    let params = StyleParameters::from_fields(&fields);

    let image_key = image_key.ok_or_else(missing_image)?;
    let image_value = first_element(&object[image_key]);
    let url = image_value.as_str().ok_or_else(|| {
        RedesignError::InvalidInput(format!("Field '{}' must be a data URL string", image_key))
    })?;
    let parsed = data_url::parse(url)?;
    let image = UploadedImage::new(parsed.bytes, Some(parsed.mime_type), None)?;

    Ok(NormalizedInput { image, params })
}

fn missing_image() -> RedesignError {
    RedesignError::MissingImage(format!(
        "No image found under any of: {}",
        IMAGE_FIELD_NAMES.join(", ")
    ))
}

fn first_element(value: &Value) -> &Value {
    match value {
        Value::Array(items) => items.first().map(first_element).unwrap_or(&NULL),
        other => other,
    }
}

fn is_blank(value: &Value) -> bool {
    match first_element(value) {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn field_text(value: &Value) -> Option<String> {
    match first_element(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
