//! QR payload generation and parsing.

use ::image::{GrayImage, Luma};
use chrono::{SecondsFormat, Utc};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InviteError, Result};

/// Encoded in place of a missing payload.
pub const MISSING_PAYLOAD_SENTINEL: &str = "invalid";

/// QR code data payload, captured once when the guest is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub id: String,
    pub guest: String,
    pub table: String,
    pub timestamp: String,
}

impl QrPayload {
    pub fn new(guest_name: &str, table_name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            guest: guest_name.to_string(),
            table: table_name.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Builds the JSON text stored on the guest record.
pub fn generate_qr_data(guest_name: &str, table_name: &str) -> Result<String> {
    Ok(serde_json::to_string(&QrPayload::new(guest_name, table_name))?)
}

/// Parses stored payload text. Malformed input yields `None`.
pub fn parse_qr_data(data: &str) -> Option<QrPayload> {
    serde_json::from_str(data).ok()
}

/// The text actually encoded for a stored payload.
pub fn qr_value(data: &str) -> &str {
    if data.is_empty() {
        MISSING_PAYLOAD_SENTINEL
    } else {
        data
    }
}

/// Renders `data` at error-correction level High, at least `size_px` square.
pub fn render_qr_image(data: &str, size_px: u32) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(qr_value(data).as_bytes(), EcLevel::H)
        .map_err(|e| InviteError::Qr(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .min_dimensions(size_px, size_px)
        .build();
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_captures_names() {
        let data = generate_qr_data("Alice", "Table 1").unwrap();
        let parsed = parse_qr_data(&data).unwrap();
        assert_eq!(parsed.guest, "Alice");
        assert_eq!(parsed.table, "Table 1");
        assert!(chrono::DateTime::parse_from_rfc3339(&parsed.timestamp).is_ok());
        assert!(Uuid::parse_str(&parsed.id).is_ok());
    }

    #[test]
    fn malformed_payload_is_none() {
        assert!(parse_qr_data("not json").is_none());
        assert!(parse_qr_data("{\"guest\":1}").is_none());
    }

    #[test]
    fn empty_payload_encodes_sentinel() {
        assert_eq!(qr_value(""), MISSING_PAYLOAD_SENTINEL);
        let img = render_qr_image("", 140).unwrap();
        assert!(img.width() >= 140);
    }
}
