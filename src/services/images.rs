use base64::Engine;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
pub struct ImageLimits {
    pub max_per_booking: usize,
    pub max_bytes: usize,
}

/// Accepts `http(s)://` URLs and base64 `data:image/...` URIs.
pub fn validate_image(image: &str, max_bytes: usize) -> Result<(), AppError> {
    if image.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "image exceeds the {max_bytes} byte limit"
        )));
    }

    if image.starts_with("https://") || image.starts_with("http://") {
        return Ok(());
    }

    let Some(rest) = image.strip_prefix("data:image/") else {
        return Err(AppError::Validation(
            "images must be http(s) URLs or data:image URIs".to_string(),
        ));
    };

    let Some((media, payload)) = rest.split_once(',') else {
        return Err(AppError::Validation("malformed data URI".to_string()));
    };

    if !media.ends_with(";base64") {
        return Err(AppError::Validation(
            "data URIs must be base64 encoded".to_string(),
        ));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| AppError::Validation("data URI payload is not valid base64".to_string()))?;

    Ok(())
}

/// Validates a batch against what the booking already holds for that kind.
pub fn validate_batch(
    existing: usize,
    images: &[String],
    limits: ImageLimits,
) -> Result<(), AppError> {
    if images.is_empty() {
        return Err(AppError::Validation("no images provided".to_string()));
    }

    if existing + images.len() > limits.max_per_booking {
        return Err(AppError::Validation(format!(
            "a booking holds at most {} images of each kind",
            limits.max_per_booking
        )));
    }

    for image in images {
        validate_image(image, limits.max_bytes)?;
    }
    Ok(())
}
