//! Damage-photo attachments.
//!
//! Photos arrive inline in the chat request as base64 payloads and are
//! forwarded to the model as data-URL image parts. Validation happens
//! here so a bad upload produces a 400 instead of a provider error
//! mid-conversation.

use agent_flow::ImageSource;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

const ALLOWED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_IMAGES_PER_MESSAGE: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64-encoded image bytes
    pub data: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
}

fn default_media_type() -> String {
    "image/jpeg".to_string()
}

/// Validate attachments and convert them to provider image sources.
pub fn validate_attachments(
    attachments: &[ImageAttachment],
) -> Result<Vec<ImageSource>, String> {
    if attachments.len() > MAX_IMAGES_PER_MESSAGE {
        return Err(format!(
            "Too many images: {} (limit {MAX_IMAGES_PER_MESSAGE})",
            attachments.len()
        ));
    }

    let mut sources = Vec::with_capacity(attachments.len());
    for (i, attachment) in attachments.iter().enumerate() {
        if !ALLOWED_MEDIA_TYPES.contains(&attachment.media_type.as_str()) {
            return Err(format!(
                "Unsupported media type for image {}: {}",
                i + 1,
                attachment.media_type
            ));
        }
        let bytes = STANDARD
            .decode(attachment.data.trim())
            .map_err(|_| format!("Image {} is not valid base64", i + 1))?;
        if bytes.is_empty() {
            return Err(format!("Image {} is empty", i + 1));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(format!(
                "Image {} is too large: {} bytes (limit {MAX_IMAGE_BYTES})",
                i + 1,
                bytes.len()
            ));
        }
        sources.push(ImageSource {
            media_type: attachment.media_type.clone(),
            base64: attachment.data.trim().to_string(),
        });
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(data: &str) -> ImageAttachment {
        ImageAttachment {
            data: data.to_string(),
            media_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_valid_attachment() {
        let encoded = STANDARD.encode(b"fake image bytes");
        let sources = validate_attachments(&[jpeg(&encoded)]).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].media_type, "image/jpeg");
    }

    #[test]
    fn test_rejects_bad_media_type() {
        let attachment = ImageAttachment {
            data: STANDARD.encode(b"x"),
            media_type: "application/pdf".to_string(),
        };
        let err = validate_attachments(&[attachment]).unwrap_err();
        assert!(err.contains("Unsupported media type"));
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = validate_attachments(&[jpeg("not!!base64~~")]).unwrap_err();
        assert!(err.contains("not valid base64"));
    }

    #[test]
    fn test_rejects_too_many() {
        let encoded = STANDARD.encode(b"x");
        let many: Vec<_> = (0..9).map(|_| jpeg(&encoded)).collect();
        let err = validate_attachments(&many).unwrap_err();
        assert!(err.contains("Too many images"));
    }

    #[test]
    fn test_media_type_defaults_to_jpeg() {
        let parsed: ImageAttachment =
            serde_json::from_str(r#"{"data":"aGVsbG8="}"#).unwrap();
        assert_eq!(parsed.media_type, "image/jpeg");
    }
}
