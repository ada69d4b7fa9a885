use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload has no ',' separating the type tag from the body")]
    MissingSeparator,
    #[error("payload has more than one ',' separator")]
    ExtraSeparator,
    #[error("payload body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Decodes a `"<type-tag>,<base64-body>"` transport payload into raw bytes.
pub fn decode(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let (_, body) = split(payload)?;
    Ok(STANDARD.decode(body.trim())?)
}

/// The descriptive prefix of a payload, e.g. `data:text/csv;base64`.
pub fn type_tag(payload: &str) -> Result<&str, DecodeError> {
    split(payload).map(|(tag, _)| tag)
}

fn split(payload: &str) -> Result<(&str, &str), DecodeError> {
    let (tag, body) = payload
        .split_once(',')
        .ok_or(DecodeError::MissingSeparator)?;
    if body.contains(',') {
        return Err(DecodeError::ExtraSeparator);
    }
    Ok((tag, body))
}

#[cfg(test)]
#[path = "tests/decode_tests.rs"]
mod tests;
