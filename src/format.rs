//! Card format catalog.

use crate::error::{InviteError, Result};
use crate::geometry::Size;

pub const CUSTOM_FORMAT_ID: &str = "custom";

/// Smallest custom side accepted from the user, in card pixels.
pub const MIN_CUSTOM_SIDE: u32 = 100;
/// Largest custom side accepted, in card pixels.
pub const MAX_CUSTOM_SIDE: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub id: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub print_width: Option<&'static str>,
    pub print_height: Option<&'static str>,
}

impl Format {
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_FORMAT_ID
    }

    /// Human-readable label, e.g. `ID Card (85.6mm × 53.98mm)`.
    pub fn label(&self) -> String {
        match (self.print_width, self.print_height) {
            (Some(w), Some(h)) => format!("{} ({} × {})", self.name, w, h),
            _ => self.name.to_string(),
        }
    }
}

pub const INVITE_FORMATS: [Format; 4] = [
    Format {
        id: "id-card",
        name: "ID Card",
        width: 1050,
        height: 500,
        print_width: Some("85.6mm"),
        print_height: Some("53.98mm"),
    },
    Format {
        id: "a5",
        name: "A5",
        width: 1480,
        height: 2100,
        print_width: Some("148mm"),
        print_height: Some("210mm"),
    },
    Format {
        id: "a4",
        name: "A4",
        width: 2100,
        height: 2970,
        print_width: Some("210mm"),
        print_height: Some("297mm"),
    },
    Format {
        id: CUSTOM_FORMAT_ID,
        name: "Custom",
        width: 1050,
        height: 500,
        print_width: None,
        print_height: None,
    },
];

/// Looks up a format; unknown ids fall back to the first catalog entry.
pub fn get_format_by_id(id: &str) -> &'static Format {
    INVITE_FORMATS
        .iter()
        .find(|f| f.id == id)
        .unwrap_or(&INVITE_FORMATS[0])
}

/// Effective card size in design pixels.
///
/// Custom dimensions only apply to the `custom` format, and only when set
/// to a non-zero value; otherwise the catalog dimensions are used.
pub fn card_dimensions(format_id: &str, custom_width: Option<u32>, custom_height: Option<u32>) -> Size {
    let format = get_format_by_id(format_id);
    if format.is_custom() {
        let w = custom_width.filter(|w| *w > 0).unwrap_or(format.width);
        let h = custom_height.filter(|h| *h > 0).unwrap_or(format.height);
        Size::new(f64::from(w), f64::from(h))
    } else {
        format.size()
    }
}

/// Result of switching formats: the new id plus the custom overrides to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChange {
    pub format_id: String,
    pub custom_width: Option<u32>,
    pub custom_height: Option<u32>,
}

impl FormatChange {
    /// Switching to `custom` keeps existing overrides or seeds them from the
    /// base format; any other format clears them.
    pub fn switch_to(format_id: &str, current_width: Option<u32>, current_height: Option<u32>) -> Self {
        let format = get_format_by_id(format_id);
        if format.is_custom() {
            Self {
                format_id: format.id.to_string(),
                custom_width: Some(current_width.unwrap_or(format.width)),
                custom_height: Some(current_height.unwrap_or(format.height)),
            }
        } else {
            Self {
                format_id: format.id.to_string(),
                custom_width: None,
                custom_height: None,
            }
        }
    }
}

pub fn validate_custom_side(value: u32) -> Result<u32> {
    if value < MIN_CUSTOM_SIDE {
        return Err(InviteError::InvalidInput(format!(
            "custom dimension must be at least {MIN_CUSTOM_SIDE}px, got {value}"
        )));
    }
    if value > MAX_CUSTOM_SIDE {
        return Err(InviteError::InvalidInput(format!(
            "custom dimension must be at most {MAX_CUSTOM_SIDE}px, got {value}"
        )));
    }
    Ok(value)
}
