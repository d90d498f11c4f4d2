//! The configuration page: owns the committed config and persists edits.
//!
//! Every edit goes through [`ConfigSession::apply`], which drops values
//! equal to what is already stored before touching the repository.
//! Failures stop here: they are logged and queued as a [`Notice`] for the
//! user instead of being returned, so one bad write never ends the session.

use std::fmt;

use tracing::{debug, error, warn};

use crate::editor::{Commit, LayoutSink};
use crate::error::{InviteError, Result};
use crate::format::{validate_custom_side, FormatChange, CUSTOM_FORMAT_ID};
use crate::geometry::{Point, Zone};
use crate::model::{ConfigUpdate, EventConfig, TextField};
use crate::render::parse_hex_color;
use crate::store::{KeyValueStore, Repository};

/// A failed action, reported to the user instead of ending the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.message)
    }
}

#[derive(Debug)]
pub struct ConfigSession<S> {
    repo: Repository<S>,
    config: EventConfig,
    notices: Vec<Notice>,
}

impl<S: KeyValueStore> ConfigSession<S> {
    pub fn open(mut repo: Repository<S>) -> Result<Self> {
        let config = repo.get_or_create_config()?;
        Ok(Self {
            repo,
            config,
            notices: Vec::new(),
        })
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut Repository<S> {
        &mut self.repo
    }

    pub fn into_repository(self) -> Repository<S> {
        self.repo
    }

    /// Drains queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify_error(&mut self, action: &str, err: &InviteError) {
        error!(action, error = %err, "config action failed");
        self.notices.push(Notice {
            message: format!("Failed to {action}: {err}"),
        });
    }

    /// Persists `update` unless it matches the committed value.
    /// Returns true when a write happened.
    pub fn apply(&mut self, update: ConfigUpdate) -> bool {
        let mut candidate = self.config.clone();
        if !candidate.apply(&update) {
            debug!(field = update.name(), "unchanged value, skipping write");
            return false;
        }

        match self.repo.update_config(&self.config.id, &update) {
            Ok(stored) => {
                self.config = stored;
                true
            }
            Err(err) => {
                self.notify_error(&format!("update {}", update.name()), &err);
                false
            }
        }
    }

    pub fn set_color(&mut self, field: TextField, color: &str) -> bool {
        let color = color.trim();
        if parse_hex_color(color).is_none() {
            warn!(%field, color, "rejected color");
            let err = InviteError::InvalidInput(format!("'{color}' is not a #RRGGBB color"));
            self.notify_error("update color", &err);
            return false;
        }
        self.apply(ConfigUpdate::SetColor(field, color.to_uppercase()))
    }

    /// Stores a background reference (file path or http(s) URL); an empty
    /// string clears it.
    pub fn set_background(&mut self, reference: &str) -> bool {
        let reference = reference.trim();
        let value = (!reference.is_empty()).then(|| reference.to_string());
        self.apply(ConfigUpdate::SetBackground(value))
    }

    pub fn set_format(&mut self, format_id: &str) -> bool {
        let change = FormatChange::switch_to(format_id, self.config.custom_width, self.config.custom_height);
        if change.format_id != format_id {
            warn!(format_id, fallback = %change.format_id, "unknown format, using default");
        }
        self.apply(ConfigUpdate::SetFormat(change))
    }

    pub fn set_custom_size(&mut self, width: u32, height: u32) -> bool {
        match validate_custom_side(width).and_then(|_| validate_custom_side(height)) {
            Ok(_) => self.apply(ConfigUpdate::SetCustomSize { width, height }),
            Err(err) => {
                self.notify_error("update custom size", &err);
                false
            }
        }
    }

    /// Switches to the custom format with the given sides in one write.
    /// Missing sides keep the current override or the base size. Nothing is
    /// stored when either side is out of range.
    pub fn set_custom_format(&mut self, width: Option<u32>, height: Option<u32>) -> bool {
        let change = FormatChange::switch_to(
            CUSTOM_FORMAT_ID,
            width.or(self.config.custom_width),
            height.or(self.config.custom_height),
        );
        let sides = [change.custom_width, change.custom_height];
        if let Err(err) = sides.into_iter().flatten().try_for_each(|side| validate_custom_side(side).map(drop)) {
            self.notify_error("update custom size", &err);
            return false;
        }
        self.apply(ConfigUpdate::SetFormat(change))
    }

    /// Persists a released gesture. Returns true when a write happened.
    pub fn commit(&mut self, commit: Commit) -> bool {
        match commit {
            Commit::QrZone(zone) => self.apply(ConfigUpdate::SetQrZone(zone)),
            Commit::TextPosition(field, anchor) => self.apply(ConfigUpdate::anchor(field, anchor)),
        }
    }
}

impl<S: KeyValueStore> LayoutSink for ConfigSession<S> {
    fn on_qr_zone_change(&mut self, zone: Zone) {
        self.commit(Commit::QrZone(zone));
    }

    fn on_text_position_change(&mut self, field: TextField, x: f64, y: f64) {
        self.commit(Commit::TextPosition(field, Point::new(x, y)));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::store::MemoryStore;

    /// Counts writes so change suppression can be observed.
    struct CountingStore {
        inner: MemoryStore,
        writes: Rc<Cell<usize>>,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn session() -> (ConfigSession<CountingStore>, Rc<Cell<usize>>) {
        let writes = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            writes: Rc::clone(&writes),
        };
        let session = ConfigSession::open(Repository::new(store)).unwrap();
        writes.set(0);
        (session, writes)
    }

    #[test]
    fn unchanged_zone_is_not_written() {
        let (mut s, writes) = session();
        let zone = s.config().qr_zone();
        s.on_qr_zone_change(zone);
        assert_eq!(writes.get(), 0);

        s.on_qr_zone_change(Zone::new(10.0, 20.0, 60.0, 60.0));
        assert_eq!(writes.get(), 1);
        s.on_qr_zone_change(Zone::new(10.0, 20.0, 60.0, 60.0));
        assert_eq!(writes.get(), 1);
    }

    #[test]
    fn unchanged_anchor_is_not_written() {
        let (mut s, writes) = session();
        s.on_text_position_change(TextField::GuestName, 50.0, 50.0);
        assert_eq!(writes.get(), 0);
        s.on_text_position_change(TextField::GuestName, 51.0, 50.0);
        assert_eq!(writes.get(), 1);
        assert_eq!(s.config().guest_name_x, 51.0);
    }

    #[test]
    fn bad_color_becomes_notice() {
        let (mut s, writes) = session();
        assert!(!s.set_color(TextField::TableName, "blue"));
        assert_eq!(writes.get(), 0);
        let notices = s.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].to_string().starts_with("Error: "));

        assert!(!s.set_color(TextField::TableName, "#aéabc"));
        assert_eq!(s.take_notices().len(), 1);

        assert!(s.set_color(TextField::TableName, "#00ff00"));
        assert_eq!(s.config().table_name_color, "#00FF00");
    }

    #[test]
    fn format_switch_seeds_custom_size() {
        let (mut s, _) = session();
        assert!(s.set_format("custom"));
        assert_eq!(s.config().custom_width, Some(1050));
        assert!(!s.set_custom_size(20, 400));
        assert!(s.set_custom_size(800, 400));
        assert_eq!(s.config().card_size().width, 800.0);
        assert!(s.set_format("a5"));
        assert_eq!(s.config().custom_width, None);
    }

    #[test]
    fn rejected_custom_format_stores_nothing() {
        let (mut s, writes) = session();
        assert!(!s.set_custom_format(Some(20), Some(400)));
        assert!(!s.set_custom_format(Some(800), Some(4_000_000_000)));
        assert_eq!(writes.get(), 0);
        assert_eq!(s.config().format_id, "id-card");
        assert_eq!(s.config().custom_width, None);
        assert_eq!(s.take_notices().len(), 2);

        assert!(s.set_custom_format(Some(800), None));
        assert_eq!(writes.get(), 1);
        assert_eq!(s.config().card_size().width, 800.0);
        assert_eq!(s.config().card_size().height, 500.0);
    }

    #[test]
    fn commit_reports_whether_it_wrote() {
        let (mut s, writes) = session();
        let zone = s.config().qr_zone();
        assert!(!s.commit(Commit::QrZone(zone)));
        assert!(s.commit(Commit::QrZone(Zone::new(0.0, 0.0, 80.0, 80.0))));
        assert!(!s.commit(Commit::TextPosition(TextField::GuestName, Point::new(50.0, 50.0))));
        assert_eq!(writes.get(), 1);
    }
}
