//! Persistence: a key-value document store and the repository over it.
//!
//! Each entity collection lives under one key as a JSON document, the same
//! layout a browser profile's local storage would hold. There is no locking:
//! a single writer is assumed, and two repositories sharing one store simply
//! overwrite each other (last writer wins).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{InviteError, Result};
use crate::model::{ConfigUpdate, EventConfig, Guest, GuestPatch, NewGuest, Table, DEFAULT_FORMAT_ID};
use crate::qr::generate_qr_data;

pub const EVENT_CONFIG_KEY: &str = "party_invite_event_config";
pub const TABLES_KEY: &str = "party_invite_tables";
pub const GUESTS_KEY: &str = "party_invite_guests";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Volatile store, for tests and `--memory` sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Durable store: one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| InviteError::Storage(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| InviteError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| InviteError::Storage(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).map_err(|e| InviteError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InviteError::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}

/// Typed access to configuration, tables and guests over an injected store.
#[derive(Debug)]
pub struct Repository<S> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.store.set(key, &text)
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.read(key)?.unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Event configuration
    // ------------------------------------------------------------------

    /// Loads the configuration, creating it with defaults on first access.
    pub fn get_or_create_config(&mut self) -> Result<EventConfig> {
        if let Some(mut config) = self.read::<EventConfig>(EVENT_CONFIG_KEY)? {
            if config.format_id.is_empty() {
                config.format_id = DEFAULT_FORMAT_ID.to_string();
                self.write(EVENT_CONFIG_KEY, &config)?;
                info!(config_id = %config.id, "migrated config without format id");
            }
            return Ok(config);
        }

        let config = EventConfig::with_defaults(Uuid::new_v4().to_string());
        self.write(EVENT_CONFIG_KEY, &config)?;
        info!(config_id = %config.id, "created event config");
        Ok(config)
    }

    /// Applies one update to the stored configuration and returns the result.
    pub fn update_config(&mut self, config_id: &str, update: &ConfigUpdate) -> Result<EventConfig> {
        let mut config: EventConfig = self
            .read(EVENT_CONFIG_KEY)?
            .ok_or_else(|| InviteError::not_found("Event config", config_id))?;
        if config.id != config_id {
            return Err(InviteError::Mismatch {
                expected: config.id,
                actual: config_id.to_string(),
            });
        }

        config.apply(update);
        self.write(EVENT_CONFIG_KEY, &config)?;
        info!(config_id, field = update.name(), "updated event config");
        Ok(config)
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    pub fn list_tables(&self, config_id: &str) -> Result<Vec<Table>> {
        let all: Vec<Table> = self.read_list(TABLES_KEY)?;
        Ok(all.into_iter().filter(|t| t.event_config_id == config_id).collect())
    }

    pub fn find_table(&self, table_id: &str) -> Result<Option<Table>> {
        let all: Vec<Table> = self.read_list(TABLES_KEY)?;
        Ok(all.into_iter().find(|t| t.id == table_id))
    }

    pub fn create_table(&mut self, config_id: &str, name: &str) -> Result<Table> {
        let name = required("table name", name)?;
        let mut all: Vec<Table> = self.read_list(TABLES_KEY)?;
        let table = Table {
            id: Uuid::new_v4().to_string(),
            event_config_id: config_id.to_string(),
            name,
        };
        all.push(table.clone());
        self.write(TABLES_KEY, &all)?;
        info!(table_id = %table.id, name = %table.name, "created table");
        Ok(table)
    }

    pub fn rename_table(&mut self, table_id: &str, name: &str) -> Result<Table> {
        let name = required("table name", name)?;
        let mut all: Vec<Table> = self.read_list(TABLES_KEY)?;
        let table = all
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| InviteError::not_found("Table", table_id))?;
        table.name = name;
        let renamed = table.clone();
        self.write(TABLES_KEY, &all)?;
        info!(table_id, name = %renamed.name, "renamed table");
        Ok(renamed)
    }

    /// Removes a table. Guests that reference it keep their `table_id`.
    pub fn delete_table(&mut self, table_id: &str) -> Result<()> {
        let mut all: Vec<Table> = self.read_list(TABLES_KEY)?;
        let before = all.len();
        all.retain(|t| t.id != table_id);
        if all.len() == before {
            debug!(table_id, "delete of unknown table ignored");
            return Ok(());
        }
        self.write(TABLES_KEY, &all)?;
        info!(table_id, "deleted table");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Guests
    // ------------------------------------------------------------------

    pub fn list_guests(&self, config_id: &str) -> Result<Vec<Guest>> {
        let all: Vec<Guest> = self.read_list(GUESTS_KEY)?;
        Ok(all.into_iter().filter(|g| g.event_config_id == config_id).collect())
    }

    pub fn find_guest(&self, guest_id: &str) -> Result<Option<Guest>> {
        let all: Vec<Guest> = self.read_list(GUESTS_KEY)?;
        Ok(all.into_iter().find(|g| g.id == guest_id))
    }

    pub fn create_guest(&mut self, config_id: &str, fields: NewGuest) -> Result<Guest> {
        let name = required("guest name", &fields.name)?;
        let mut all: Vec<Guest> = self.read_list(GUESTS_KEY)?;
        let guest = Guest {
            id: Uuid::new_v4().to_string(),
            event_config_id: config_id.to_string(),
            table_id: fields.table_id,
            name,
            email: optional(fields.email),
            phone: optional(fields.phone),
            qr_code_data: fields.qr_code_data,
        };
        all.push(guest.clone());
        self.write(GUESTS_KEY, &all)?;
        info!(guest_id = %guest.id, "created guest");
        Ok(guest)
    }

    /// Registers a guest at an existing table, capturing the QR payload from
    /// the guest and table names as they are right now.
    pub fn register_guest(
        &mut self,
        config_id: &str,
        table_id: &str,
        name: &str,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Guest> {
        let name = required("guest name", name)?;
        let table = self
            .list_tables(config_id)?
            .into_iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| InviteError::InvalidInput(format!("no table with id {table_id}")))?;

        let qr_code_data = generate_qr_data(&name, &table.name)?;
        self.create_guest(
            config_id,
            NewGuest {
                table_id: Some(table.id),
                name,
                email,
                phone,
                qr_code_data,
            },
        )
    }

    pub fn update_guest(&mut self, guest_id: &str, patch: &GuestPatch) -> Result<Guest> {
        if let Some(name) = &patch.name {
            required("guest name", name)?;
        }
        let mut all: Vec<Guest> = self.read_list(GUESTS_KEY)?;
        let guest = all
            .iter_mut()
            .find(|g| g.id == guest_id)
            .ok_or_else(|| InviteError::not_found("Guest", guest_id))?;
        patch.apply_to(guest);
        guest.name = guest.name.trim().to_string();
        let updated = guest.clone();
        self.write(GUESTS_KEY, &all)?;
        info!(guest_id, "updated guest");
        Ok(updated)
    }

    pub fn delete_guest(&mut self, guest_id: &str) -> Result<()> {
        let mut all: Vec<Guest> = self.read_list(GUESTS_KEY)?;
        let before = all.len();
        all.retain(|g| g.id != guest_id);
        if all.len() == before {
            debug!(guest_id, "delete of unknown guest ignored");
            return Ok(());
        }
        self.write(GUESTS_KEY, &all)?;
        info!(guest_id, "deleted guest");
        Ok(())
    }
}

fn required(what: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InviteError::InvalidInput(format!("{what} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
