//! Stored records: the event configuration, tables and guests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::{card_dimensions, get_format_by_id, Format, FormatChange};
use crate::geometry::{Anchor, Point, Size, Zone};

pub const DEFAULT_FORMAT_ID: &str = "id-card";
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_QR_ZONE: Zone = Zone {
    x: 700.0,
    y: 150.0,
    width: 150.0,
    height: 150.0,
};
pub const DEFAULT_GUEST_NAME_ANCHOR: Anchor = Point { x: 50.0, y: 50.0 };
pub const DEFAULT_TABLE_NAME_ANCHOR: Anchor = Point { x: 50.0, y: 100.0 };

/// Which text block a position or color belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    GuestName,
    TableName,
}

impl TextField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GuestName => "guest-name",
            Self::TableName => "table-name",
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "guest-name" | "guest" => Ok(Self::GuestName),
            "table-name" | "table" => Ok(Self::TableName),
            other => Err(format!("unknown text field '{other}' (expected guest-name or table-name)")),
        }
    }
}

fn default_format_id() -> String {
    DEFAULT_FORMAT_ID.to_string()
}

fn default_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

// Fields missing from older stored documents fall back to the defaults.
fn default_qr_zone_x() -> f64 {
    DEFAULT_QR_ZONE.x
}

fn default_qr_zone_y() -> f64 {
    DEFAULT_QR_ZONE.y
}

fn default_qr_zone_width() -> f64 {
    DEFAULT_QR_ZONE.width
}

fn default_qr_zone_height() -> f64 {
    DEFAULT_QR_ZONE.height
}

fn default_guest_name_x() -> f64 {
    DEFAULT_GUEST_NAME_ANCHOR.x
}

fn default_guest_name_y() -> f64 {
    DEFAULT_GUEST_NAME_ANCHOR.y
}

fn default_table_name_x() -> f64 {
    DEFAULT_TABLE_NAME_ANCHOR.x
}

fn default_table_name_y() -> f64 {
    DEFAULT_TABLE_NAME_ANCHOR.y
}

/// The singleton layout configuration. Geometry is in design space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub id: String,
    #[serde(default)]
    pub background_image_url: Option<String>,
    #[serde(default)]
    pub format_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_height: Option<u32>,
    #[serde(default = "default_qr_zone_x")]
    pub qr_zone_x: f64,
    #[serde(default = "default_qr_zone_y")]
    pub qr_zone_y: f64,
    #[serde(default = "default_qr_zone_width")]
    pub qr_zone_width: f64,
    #[serde(default = "default_qr_zone_height")]
    pub qr_zone_height: f64,
    #[serde(default = "default_guest_name_x")]
    pub guest_name_x: f64,
    #[serde(default = "default_guest_name_y")]
    pub guest_name_y: f64,
    #[serde(default = "default_color")]
    pub guest_name_color: String,
    #[serde(default = "default_table_name_x")]
    pub table_name_x: f64,
    #[serde(default = "default_table_name_y")]
    pub table_name_y: f64,
    #[serde(default = "default_color")]
    pub table_name_color: String,
}

impl EventConfig {
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            background_image_url: None,
            format_id: default_format_id(),
            custom_width: None,
            custom_height: None,
            qr_zone_x: DEFAULT_QR_ZONE.x,
            qr_zone_y: DEFAULT_QR_ZONE.y,
            qr_zone_width: DEFAULT_QR_ZONE.width,
            qr_zone_height: DEFAULT_QR_ZONE.height,
            guest_name_x: DEFAULT_GUEST_NAME_ANCHOR.x,
            guest_name_y: DEFAULT_GUEST_NAME_ANCHOR.y,
            guest_name_color: default_color(),
            table_name_x: DEFAULT_TABLE_NAME_ANCHOR.x,
            table_name_y: DEFAULT_TABLE_NAME_ANCHOR.y,
            table_name_color: default_color(),
        }
    }

    pub fn format(&self) -> &'static Format {
        get_format_by_id(&self.format_id)
    }

    /// Effective design size of the card.
    pub fn card_size(&self) -> Size {
        card_dimensions(&self.format_id, self.custom_width, self.custom_height)
    }

    pub fn qr_zone(&self) -> Zone {
        Zone::new(self.qr_zone_x, self.qr_zone_y, self.qr_zone_width, self.qr_zone_height)
    }

    pub fn anchor(&self, field: TextField) -> Anchor {
        match field {
            TextField::GuestName => Point::new(self.guest_name_x, self.guest_name_y),
            TextField::TableName => Point::new(self.table_name_x, self.table_name_y),
        }
    }

    pub fn color(&self, field: TextField) -> &str {
        match field {
            TextField::GuestName => &self.guest_name_color,
            TextField::TableName => &self.table_name_color,
        }
    }

    pub fn has_background(&self) -> bool {
        self.background_image_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Applies one update in place. Returns false when the value was already
    /// current, so callers can skip the write.
    pub fn apply(&mut self, update: &ConfigUpdate) -> bool {
        match update {
            ConfigUpdate::SetQrZone(zone) => {
                if self.qr_zone() == *zone {
                    return false;
                }
                self.qr_zone_x = zone.x;
                self.qr_zone_y = zone.y;
                self.qr_zone_width = zone.width;
                self.qr_zone_height = zone.height;
            }
            ConfigUpdate::SetGuestNameAnchor(p) => {
                if self.anchor(TextField::GuestName) == *p {
                    return false;
                }
                self.guest_name_x = p.x;
                self.guest_name_y = p.y;
            }
            ConfigUpdate::SetTableNameAnchor(p) => {
                if self.anchor(TextField::TableName) == *p {
                    return false;
                }
                self.table_name_x = p.x;
                self.table_name_y = p.y;
            }
            ConfigUpdate::SetColor(field, color) => {
                let slot = match field {
                    TextField::GuestName => &mut self.guest_name_color,
                    TextField::TableName => &mut self.table_name_color,
                };
                if *slot == *color {
                    return false;
                }
                slot.clone_from(color);
            }
            ConfigUpdate::SetBackground(url) => {
                if self.background_image_url == *url {
                    return false;
                }
                self.background_image_url.clone_from(url);
            }
            ConfigUpdate::SetFormat(change) => {
                if self.format_id == change.format_id
                    && self.custom_width == change.custom_width
                    && self.custom_height == change.custom_height
                {
                    return false;
                }
                self.format_id.clone_from(&change.format_id);
                self.custom_width = change.custom_width;
                self.custom_height = change.custom_height;
            }
            ConfigUpdate::SetCustomSize { width, height } => {
                if self.custom_width == Some(*width) && self.custom_height == Some(*height) {
                    return false;
                }
                self.custom_width = Some(*width);
                self.custom_height = Some(*height);
            }
        }
        true
    }
}

/// The closed set of configuration edits.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    SetQrZone(Zone),
    SetGuestNameAnchor(Anchor),
    SetTableNameAnchor(Anchor),
    SetColor(TextField, String),
    SetBackground(Option<String>),
    SetFormat(FormatChange),
    SetCustomSize { width: u32, height: u32 },
}

impl ConfigUpdate {
    pub fn anchor(field: TextField, anchor: Anchor) -> Self {
        match field {
            TextField::GuestName => Self::SetGuestNameAnchor(anchor),
            TextField::TableName => Self::SetTableNameAnchor(anchor),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetQrZone(_) => "qr_zone",
            Self::SetGuestNameAnchor(_) => "guest_name_position",
            Self::SetTableNameAnchor(_) => "table_name_position",
            Self::SetColor(TextField::GuestName, _) => "guest_name_color",
            Self::SetColor(TextField::TableName, _) => "table_name_color",
            Self::SetBackground(_) => "background_image_url",
            Self::SetFormat(_) => "format_id",
            Self::SetCustomSize { .. } => "custom_size",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub event_config_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: String,
    pub event_config_id: String,
    #[serde(default)]
    pub table_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub qr_code_data: String,
}

/// Fields supplied when registering a guest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGuest {
    pub table_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qr_code_data: String,
}

/// Partial guest edit. The QR payload is fixed at creation and has no slot here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub table_id: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

impl GuestPatch {
    pub(crate) fn apply_to(&self, guest: &mut Guest) {
        if let Some(name) = &self.name {
            guest.name.clone_from(name);
        }
        if let Some(table_id) = &self.table_id {
            guest.table_id.clone_from(table_id);
        }
        if let Some(email) = &self.email {
            guest.email.clone_from(email);
        }
        if let Some(phone) = &self.phone {
            guest.phone.clone_from(phone);
        }
    }
}

/// Resolves a guest's table name; orphaned or missing ids resolve to `None`.
pub fn table_name_for<'a>(guest: &Guest, tables: &'a [Table]) -> Option<&'a str> {
    let id = guest.table_id.as_deref()?;
    tables.iter().find(|t| t.id == id).map(|t| t.name.as_str())
}

/// Guests on `table_id` (when given) whose name contains `search`, ignoring case.
pub fn filter_guests<'a>(guests: &'a [Guest], table_id: Option<&str>, search: &str) -> Vec<&'a Guest> {
    let needle = search.trim().to_lowercase();
    guests
        .iter()
        .filter(|g| table_id.map_or(true, |t| g.table_id.as_deref() == Some(t)))
        .filter(|g| needle.is_empty() || g.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(name: &str, table: Option<&str>) -> Guest {
        Guest {
            id: name.to_lowercase(),
            event_config_id: "cfg".into(),
            table_id: table.map(str::to_string),
            name: name.into(),
            email: None,
            phone: None,
            qr_code_data: String::new(),
        }
    }

    #[test]
    fn apply_reports_unchanged_values() {
        let mut cfg = EventConfig::with_defaults("cfg");
        assert!(!cfg.apply(&ConfigUpdate::SetQrZone(DEFAULT_QR_ZONE)));
        assert!(cfg.apply(&ConfigUpdate::SetQrZone(Zone::new(10.0, 10.0, 80.0, 80.0))));
        assert_eq!(cfg.qr_zone_width, 80.0);
        assert!(!cfg.apply(&ConfigUpdate::SetColor(TextField::TableName, "#FFFFFF".into())));
        assert!(cfg.apply(&ConfigUpdate::anchor(TextField::TableName, Point::new(1.0, 2.0))));
        assert_eq!(cfg.anchor(TextField::TableName), Point::new(1.0, 2.0));
    }

    #[test]
    fn missing_format_id_deserializes_empty() {
        let json = r#"{"id":"x","qr_zone_x":1,"qr_zone_y":2,"qr_zone_width":60,"qr_zone_height":60,
            "guest_name_x":0,"guest_name_y":0,"table_name_x":0,"table_name_y":0}"#;
        let cfg: EventConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.format_id.is_empty());
        assert_eq!(cfg.guest_name_color, DEFAULT_TEXT_COLOR);
        assert_eq!(cfg.card_size(), Size::new(1050.0, 500.0));
    }

    #[test]
    fn orphaned_table_resolves_to_none() {
        let tables = vec![Table {
            id: "t1".into(),
            event_config_id: "cfg".into(),
            name: "Table 1".into(),
        }];
        assert_eq!(table_name_for(&guest("Alice", Some("t1")), &tables), Some("Table 1"));
        assert_eq!(table_name_for(&guest("Bob", Some("gone")), &tables), None);
        assert_eq!(table_name_for(&guest("Eve", None), &tables), None);
    }

    #[test]
    fn filter_by_table_and_name() {
        let guests = vec![guest("Alice", Some("t1")), guest("Alicia", Some("t2")), guest("Bob", Some("t1"))];
        let hits = filter_guests(&guests, Some("t1"), "ali");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Alice");
        assert_eq!(filter_guests(&guests, None, "").len(), 3);
    }
}
