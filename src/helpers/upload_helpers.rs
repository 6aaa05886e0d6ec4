use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A multipart body split into file parts and plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: HashMap<String, UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?.to_vec();
                    if bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> Result<UploadedFile> {
        self.take_file(name).ok_or_else(|| Error::InvalidInput {
            reason: format!("No file uploaded in field '{name}'"),
        })
    }

    /// Text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn number(&self, name: &str) -> Result<Option<f64>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| Error::InvalidInput {
                    reason: format!("{name} must be a number"),
                })
            })
            .transpose()
    }
}

/// Rejects files whose declared type is not `prefix/*`.
pub fn ensure_content_type(file: &UploadedFile, prefix: &str) -> Result<()> {
    match file.content_type.as_deref() {
        Some(ct) if !ct.starts_with(prefix) && ct != "application/octet-stream" => {
            Err(Error::InvalidInput {
                reason: format!("Expected a {prefix} file, got {ct}"),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: "cover.png".to_string(),
            content_type: content_type.map(str::to_string),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_form_text_and_number() {
        let mut form = UploadForm::default();
        form.fields.insert("title".into(), "  Night Drive ".into());
        form.fields.insert("artist".into(), "   ".into());
        form.fields.insert("duration".into(), "201.5".into());
        form.fields.insert("bad".into(), "abc".into());

        assert_eq!(form.text("title").as_deref(), Some("Night Drive"));
        assert_eq!(form.text("artist"), None);
        assert_eq!(form.number("duration").unwrap(), Some(201.5));
        assert!(form.number("bad").is_err());
        assert!(form.require_file("audio").is_err());
    }

    #[test]
    fn test_content_type_check() {
        assert!(ensure_content_type(&file(Some("image/png")), "image/").is_ok());
        assert!(ensure_content_type(&file(None), "image/").is_ok());
        assert!(ensure_content_type(&file(Some("audio/mpeg")), "image/").is_err());
        assert_eq!(file(None).size(), 3);
    }
}
