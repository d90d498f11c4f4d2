//! Invitation card layout editor.
//!
//! Design a card template (background, QR zone, text positions and colors)
//! in a fixed design space, manage tables and guests, and export one card per
//! guest as PNG or PDF plus a CSV roster.

pub mod editor;
pub mod error;
pub mod export;
pub mod format;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod qr;
pub mod render;
pub mod session;
pub mod store;

pub use editor::{Commit, EditorElement, LayoutEditor, LayoutSink};
pub use error::{InviteError, Result};
pub use export::{CardFormat, ExportSettings, GuestRow};
pub use format::{get_format_by_id, Format, INVITE_FORMATS};
pub use geometry::{Anchor, Point, Size, Zone};
pub use interaction::ResizeHandle;
pub use model::{ConfigUpdate, EventConfig, Guest, GuestPatch, Table, TextField};
pub use render::{CardLayout, CardRasterizer, Rasterizer};
pub use session::{ConfigSession, Notice};
pub use store::{FileStore, KeyValueStore, MemoryStore, Repository};

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true);

    let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
}
