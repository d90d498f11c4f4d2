//! Export adapter: per-guest card files and the CSV roster.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use tracing::info;

use crate::error::{InviteError, Result};
use crate::model::{table_name_for, EventConfig, Guest, Table};
use crate::render::{CardLayout, Rasterizer};

pub const CSV_HEADER: [&str; 5] = ["Name", "Email", "Phone", "Table", "QR Code Data"];
pub const UNASSIGNED_TABLE: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    /// Raster scale relative to the design size.
    pub scale: f64,
    pub pdf_width_mm: f32,
    pub pdf_height_mm: f32,
    /// Wait before a bulk export starts rendering.
    pub settle_delay: Duration,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: 2.0,
            pdf_width_mm: 210.0,
            pdf_height_mm: 100.0,
            settle_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFormat {
    Png,
    Pdf,
}

impl CardFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CardFormat::Png => "png",
            CardFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for CardFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(CardFormat::Png),
            "pdf" => Ok(CardFormat::Pdf),
            other => Err(format!("unknown card format '{other}' (expected png or pdf)")),
        }
    }
}

/// One roster line, with the table already resolved to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRow {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub table: Option<String>,
    pub qr_code_data: String,
}

pub fn join_table_names(guests: &[Guest], tables: &[Table]) -> Vec<GuestRow> {
    guests
        .iter()
        .map(|g| GuestRow {
            name: g.name.clone(),
            email: g.email.clone(),
            phone: g.phone.clone(),
            table: table_name_for(g, tables).map(str::to_string),
            qr_code_data: g.qr_code_data.clone(),
        })
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Serializes rows as CSV with a header line. Guests without a table get
/// `Unassigned` in the Table column.
pub fn guests_to_csv(rows: &[GuestRow]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for row in rows {
        let fields = [
            row.name.as_str(),
            row.email.as_deref().unwrap_or(""),
            row.phone.as_deref().unwrap_or(""),
            row.table.as_deref().unwrap_or(UNASSIGNED_TABLE),
            row.qr_code_data.as_str(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn find_target<'a>(guest_id: &str, guests: &'a [Guest]) -> Result<&'a Guest> {
    guests
        .iter()
        .find(|g| g.id == guest_id)
        .ok_or_else(|| InviteError::RenderTargetMissing(format!("card for guest {guest_id}")))
}

/// Renders a single guest's card into `output`.
#[allow(clippy::too_many_arguments)]
pub fn export_card<R: Rasterizer>(
    rasterizer: &R,
    config: &EventConfig,
    tables: &[Table],
    guests: &[Guest],
    guest_id: &str,
    format: CardFormat,
    settings: &ExportSettings,
    output: &Path,
) -> Result<()> {
    let guest = find_target(guest_id, guests)?;
    let table = guest
        .table_id
        .as_deref()
        .and_then(|id| tables.iter().find(|t| t.id == id));
    let layout = CardLayout::compute(config, table, guest);

    let bytes = match format {
        CardFormat::Png => rasterizer.rasterize_to_image(&layout)?,
        CardFormat::Pdf => rasterizer.rasterize_to_pdf(&layout, settings.pdf_width_mm, settings.pdf_height_mm)?,
    };
    fs::write(output, bytes)?;
    info!(guest_id, path = %output.display(), format = format.extension(), "exported card");
    Ok(())
}

/// Writes `invite-<guest id>.png` for every guest into `dir`.
pub fn export_all_cards<R: Rasterizer>(
    rasterizer: &R,
    config: &EventConfig,
    tables: &[Table],
    guests: &[Guest],
    settings: &ExportSettings,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    if guests.is_empty() {
        return Err(InviteError::InvalidInput("no guests to export".to_string()));
    }
    fs::create_dir_all(dir)?;
    thread::sleep(settings.settle_delay);

    let mut written = Vec::with_capacity(guests.len());
    for guest in guests {
        let path = dir.join(format!("invite-{}.png", guest.id));
        export_card(rasterizer, config, tables, guests, &guest.id, CardFormat::Png, settings, &path)?;
        written.push(path);
    }
    info!(count = written.len(), dir = %dir.display(), "exported all cards");
    Ok(written)
}

/// Writes the roster to `output`.
pub fn export_csv(guests: &[Guest], tables: &[Table], output: &Path) -> Result<()> {
    let csv = guests_to_csv(&join_table_names(guests, tables));
    fs::write(output, csv)?;
    info!(rows = guests.len(), path = %output.display(), "exported guest list");
    Ok(())
}
