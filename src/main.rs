// invite-cards: Design invitation card layouts and export per-guest cards

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use invite_cards::editor::{status_line, GUEST_NAME_EXAMPLE, TABLE_NAME_EXAMPLE};
use invite_cards::export::{export_all_cards, export_card, export_csv, UNASSIGNED_TABLE};
use invite_cards::model::{filter_guests, table_name_for};
use invite_cards::qr::parse_qr_data;
use invite_cards::render::estimate_text_block;
use invite_cards::{
    get_format_by_id, CardFormat, CardRasterizer, ConfigSession, EditorElement, EventConfig, ExportSettings, FileStore,
    GuestPatch, InviteError, KeyValueStore, LayoutEditor, MemoryStore, Point, Repository, ResizeHandle, Size,
    TextField, INVITE_FORMATS,
};

// ============================================================================
// Constants
// ============================================================================

/// Example labels in the editor are bold 18px with 8px padding.
const LABEL_FONT_PX: f64 = 18.0;
const LABEL_PADDING_PX: f64 = 8.0;

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error("{0}")]
    Rejected(String),
}

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Design invitation card layouts and export per-guest cards")]
struct Cli {
    /// Directory holding the stored configuration, tables and guests
    #[arg(long, global = true, env = "INVITE_CARDS_STORE", default_value = ".invite-cards")]
    store: PathBuf,

    /// Use an ephemeral in-memory store instead of --store
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Card template: format, background, colors and layout
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Tables guests are seated at
    #[command(subcommand)]
    Table(TableCommand),
    /// Guest list
    #[command(subcommand)]
    Guest(GuestCommand),
    /// Card files and the CSV roster
    #[command(subcommand)]
    Export(ExportCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the current configuration
    Show,
    /// Switch the card format (id-card, a5, a4, custom)
    Format {
        id: String,
        /// Custom width in pixels (custom format only)
        #[arg(long)]
        width: Option<u32>,
        /// Custom height in pixels (custom format only)
        #[arg(long)]
        height: Option<u32>,
    },
    /// Set the background image (file path or http(s) URL); empty clears it
    Background { reference: String },
    /// Set a text color (#RRGGBB)
    Color { field: TextField, color: String },
    /// Replay one pointer gesture on the layout editor and save the result
    Drag(DragArgs),
}

#[derive(Args, Debug)]
struct DragArgs {
    /// qr, guest-name or table-name
    element: EditorElement,
    /// Resize handle on the QR zone (nw, ne, sw, se); omit to move
    #[arg(long)]
    handle: Option<ResizeHandle>,
    /// Size the preview is rendered at, WxH
    #[arg(long, value_parser = parse_size)]
    display: Size,
    /// Pointer-down position in preview pixels, X,Y
    #[arg(long, value_parser = parse_point)]
    from: Point,
    /// Pointer-up position in preview pixels, X,Y
    #[arg(long, value_parser = parse_point)]
    to: Point,
}

#[derive(Subcommand, Debug)]
enum TableCommand {
    List,
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum GuestCommand {
    /// List guests, optionally filtered by table and name
    List {
        #[arg(long)]
        table: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
    },
    Add {
        name: String,
        /// Table id
        #[arg(long)]
        table: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Table id
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete { id: String },
    /// Print one guest with its decoded QR payload
    Show { id: String },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Raster scale relative to the design size
    #[arg(long, default_value = "2")]
    scale: f64,
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Export one guest's card as PNG or PDF
    Card {
        guest_id: String,
        #[arg(long, default_value = "png")]
        format: CardFormat,
        /// Output filename (defaults to invite-{guest id}.{format})
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// PDF page width in mm
        #[arg(long, default_value = "210")]
        page_width: f32,
        /// PDF page height in mm
        #[arg(long, default_value = "100")]
        page_height: f32,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Export one PNG per guest
    All {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Wait before rendering starts, in milliseconds
        #[arg(long, default_value = "50")]
        settle_ms: u64,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Export the guest list as CSV
    Csv {
        #[arg(short, long, default_value = "guests.csv")]
        output: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    invite_cards::init_logging();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    if cli.memory {
        execute(Repository::new(MemoryStore::new()), cli.command)
    } else {
        execute(Repository::new(FileStore::open(&cli.store)?), cli.command)
    }
}

fn execute<S: KeyValueStore>(repo: Repository<S>, command: Command) -> Result<(), AppError> {
    let mut session = ConfigSession::open(repo)?;
    match command {
        Command::Config(cmd) => run_config(&mut session, cmd)?,
        Command::Table(cmd) => run_table(&mut session, cmd)?,
        Command::Guest(cmd) => run_guest(&mut session, cmd)?,
        Command::Export(cmd) => run_export(&session, cmd)?,
    }
    report_notices(&mut session)
}

// ============================================================================
// Config
// ============================================================================

fn run_config<S: KeyValueStore>(session: &mut ConfigSession<S>, cmd: ConfigCommand) -> Result<(), AppError> {
    match cmd {
        ConfigCommand::Show => print_config(session.config()),
        ConfigCommand::Format { id, width, height } => {
            if width.is_some() || height.is_some() {
                if !get_format_by_id(&id).is_custom() {
                    return Err(AppError::Rejected(
                        "--width/--height only apply to the custom format".to_string(),
                    ));
                }
                session.set_custom_format(width, height);
            } else {
                session.set_format(&id);
            }
            println!("{}", status_line(session.config()));
        }
        ConfigCommand::Background { reference } => {
            session.set_background(&reference);
            match &session.config().background_image_url {
                Some(bg) => println!("✓ Background: {}", bg),
                None => println!("✓ Background cleared"),
            }
        }
        ConfigCommand::Color { field, color } => {
            if session.set_color(field, &color) {
                println!("✓ {} color: {}", field, session.config().color(field));
            }
        }
        ConfigCommand::Drag(args) => run_drag(session, args)?,
    }
    Ok(())
}

fn run_drag<S: KeyValueStore>(session: &mut ConfigSession<S>, args: DragArgs) -> Result<(), AppError> {
    let mut editor = LayoutEditor::new(session.config(), Some(args.display));
    if let Some(placeholder) = editor.placeholder() {
        return Err(AppError::Rejected(format!("{placeholder}: set one with `config background` first")));
    }
    if !editor.is_interactive() {
        return Err(AppError::Rejected(format!(
            "display size {}x{} is not usable",
            args.display.width, args.display.height
        )));
    }

    editor.set_label_size(
        TextField::GuestName,
        estimate_text_block(GUEST_NAME_EXAMPLE, LABEL_FONT_PX, LABEL_PADDING_PX),
    );
    editor.set_label_size(
        TextField::TableName,
        estimate_text_block(TABLE_NAME_EXAMPLE, LABEL_FONT_PX, LABEL_PADDING_PX),
    );

    let handle = match args.element {
        EditorElement::QrZone => args.handle,
        _ => None,
    };
    editor.pointer_down(args.element, handle, args.from);
    editor.pointer_move(args.to);
    let saved = match editor.pointer_up() {
        Some(commit) => session.commit(commit),
        None => false,
    };
    if !saved {
        println!("No change");
        return Ok(());
    }

    let config = session.config();
    match args.element.text_field() {
        None => {
            let z = config.qr_zone();
            println!("✓ QR zone: x={:.1} y={:.1} w={:.1} h={:.1}", z.x, z.y, z.width, z.height);
        }
        Some(field) => {
            let a = config.anchor(field);
            println!("✓ {} position: x={:.1} y={:.1}", field, a.x, a.y);
        }
    }
    Ok(())
}

fn print_config(config: &EventConfig) {
    println!("{}", status_line(config));
    println!(
        "  Background: {}",
        config.background_image_url.as_deref().unwrap_or("(none)")
    );
    let z = config.qr_zone();
    println!("  QR zone: x={} y={} w={} h={}", z.x, z.y, z.width, z.height);
    for field in [TextField::GuestName, TextField::TableName] {
        let a = config.anchor(field);
        println!("  {}: x={} y={} color={}", field, a.x, a.y, config.color(field));
    }
    println!("  Formats:");
    for format in INVITE_FORMATS.iter() {
        let marker = if format.id == config.format_id { "*" } else { " " };
        println!("   {} {:8} {}", marker, format.id, format.label());
    }
}

// ============================================================================
// Tables & Guests
// ============================================================================

fn run_table<S: KeyValueStore>(session: &mut ConfigSession<S>, cmd: TableCommand) -> Result<(), AppError> {
    let config_id = session.config().id.clone();
    let repo = session.repository_mut();
    match cmd {
        TableCommand::List => {
            let tables = repo.list_tables(&config_id)?;
            let guests = repo.list_guests(&config_id)?;
            for table in &tables {
                let seated = guests.iter().filter(|g| g.table_id.as_deref() == Some(&table.id)).count();
                println!("{}  {} ({} guests)", table.id, table.name, seated);
            }
        }
        TableCommand::Add { name } => {
            let table = repo.create_table(&config_id, &name)?;
            println!("✓ Added table {} ({})", table.name, table.id);
        }
        TableCommand::Rename { id, name } => {
            let table = repo.rename_table(&id, &name)?;
            println!("✓ Renamed table {} to {}", table.id, table.name);
        }
        TableCommand::Delete { id } => {
            repo.delete_table(&id)?;
            println!("✓ Deleted table {}", id);
        }
    }
    Ok(())
}

fn run_guest<S: KeyValueStore>(session: &mut ConfigSession<S>, cmd: GuestCommand) -> Result<(), AppError> {
    let config_id = session.config().id.clone();
    let repo = session.repository_mut();
    match cmd {
        GuestCommand::List { table, search } => {
            let tables = repo.list_tables(&config_id)?;
            let guests = repo.list_guests(&config_id)?;
            for guest in filter_guests(&guests, table.as_deref(), &search) {
                let table_name = table_name_for(guest, &tables).unwrap_or(UNASSIGNED_TABLE);
                println!(
                    "{}  {}  [{}]  {}",
                    guest.id,
                    guest.name,
                    table_name,
                    guest.email.as_deref().unwrap_or("")
                );
            }
        }
        GuestCommand::Add {
            name,
            table,
            email,
            phone,
        } => {
            let guest = repo.register_guest(&config_id, &table, &name, email, phone)?;
            println!("✓ Added guest {} ({})", guest.name, guest.id);
        }
        GuestCommand::Update {
            id,
            name,
            table,
            email,
            phone,
        } => {
            if let Some(table_id) = &table {
                if repo.list_tables(&config_id)?.iter().all(|t| &t.id != table_id) {
                    return Err(InviteError::InvalidInput(format!("no table with id {table_id}")).into());
                }
            }
            let patch = GuestPatch {
                name,
                table_id: table.map(Some),
                email: email.map(Some),
                phone: phone.map(Some),
            };
            let guest = repo.update_guest(&id, &patch)?;
            println!("✓ Updated guest {} ({})", guest.name, guest.id);
        }
        GuestCommand::Delete { id } => {
            repo.delete_guest(&id)?;
            println!("✓ Deleted guest {}", id);
        }
        GuestCommand::Show { id } => {
            let guest = repo
                .find_guest(&id)?
                .ok_or_else(|| InviteError::NotFound {
                    entity: "Guest",
                    id: id.clone(),
                })?;
            let tables = repo.list_tables(&config_id)?;
            println!("{}", guest.name);
            println!("  ID: {}", guest.id);
            println!("  Table: {}", table_name_for(&guest, &tables).unwrap_or(UNASSIGNED_TABLE));
            println!("  Email: {}", guest.email.as_deref().unwrap_or(""));
            println!("  Phone: {}", guest.phone.as_deref().unwrap_or(""));
            match parse_qr_data(&guest.qr_code_data) {
                Some(payload) => println!(
                    "  QR: id={} guest={} table={} at {}",
                    payload.id, payload.guest, payload.table, payload.timestamp
                ),
                None => println!("  QR: (unreadable payload)"),
            }
        }
    }
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

fn run_export<S: KeyValueStore>(session: &ConfigSession<S>, cmd: ExportCommand) -> Result<(), AppError> {
    let config = session.config();
    let repo = session.repository();
    let tables = repo.list_tables(&config.id)?;
    let guests = repo.list_guests(&config.id)?;

    match cmd {
        ExportCommand::Card {
            guest_id,
            format,
            output,
            page_width,
            page_height,
            render,
        } => {
            let settings = ExportSettings {
                scale: render.scale,
                pdf_width_mm: page_width,
                pdf_height_mm: page_height,
                ..ExportSettings::default()
            };
            let rasterizer = CardRasterizer::new(config, settings.scale)?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("invite-{}.{}", guest_id, format.extension())));
            export_card(&rasterizer, config, &tables, &guests, &guest_id, format, &settings, &output)?;
            println!("✓ Generated: {}", output.display());
        }
        ExportCommand::All { dir, settle_ms, render } => {
            let settings = ExportSettings {
                scale: render.scale,
                settle_delay: Duration::from_millis(settle_ms),
                ..ExportSettings::default()
            };
            let rasterizer = CardRasterizer::new(config, settings.scale)?;
            let written = export_all_cards(&rasterizer, config, &tables, &guests, &settings, &dir)?;
            println!("✓ Generated {} cards in {}", written.len(), dir.display());
        }
        ExportCommand::Csv { output } => {
            export_csv(&guests, &tables, &output)?;
            println!("✓ Generated: {}", output.display());
            println!("  Guests: {}", guests.len());
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Fails the command with the last queued notice, if any.
fn report_notices<S: KeyValueStore>(session: &mut ConfigSession<S>) -> Result<(), AppError> {
    match session.take_notices().pop() {
        Some(notice) => Err(AppError::Rejected(notice.message)),
        None => Ok(()),
    }
}

fn parse_pair(value: &str, separator: char) -> Result<(f64, f64), String> {
    let (a, b) = value
        .split_once(separator)
        .ok_or_else(|| format!("expected two numbers separated by '{separator}', got '{value}'"))?;
    let parse = |s: &str| s.trim().parse::<f64>().map_err(|e| format!("'{}': {}", s.trim(), e));
    Ok((parse(a)?, parse(b)?))
}

fn parse_point(value: &str) -> Result<Point, String> {
    parse_pair(value, ',').map(|(x, y)| Point::new(x, y))
}

fn parse_size(value: &str) -> Result<Size, String> {
    parse_pair(&value.to_ascii_lowercase(), 'x').map(|(w, h)| Size::new(w, h))
}
