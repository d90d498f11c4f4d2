use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn cargo_bin(store: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_invite-cards"));
    cmd.arg("--store").arg(store).env("RUST_LOG", "warn");
    cmd
}

fn run(store: &Path, args: &[&str]) -> Output {
    cargo_bin(store).args(args).output().expect("Failed to execute command")
}

fn run_ok(store: &Path, args: &[&str]) -> String {
    let output = run(store, args);
    assert!(output.status.success(), "Command {:?} failed: {:?}", args, output);
    String::from_utf8(output.stdout).expect("stdout is not UTF-8")
}

/// Pulls the id out of a `✓ Added ... (<id>)` line.
fn added_id(stdout: &str) -> String {
    let start = stdout.rfind('(').expect("no id in output") + 1;
    let end = stdout.rfind(')').expect("no id in output");
    stdout[start..end].to_string()
}

/// A store with one table holding one guest.
fn seeded() -> (TempDir, String, String) {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = dir.path().join("store");
    let table_id = added_id(&run_ok(&store, &["table", "add", "Family"]));
    let guest_id = added_id(&run_ok(
        &store,
        &["guest", "add", "Alice Martin", "--table", &table_id, "--email", "alice@example.com"],
    ));
    (dir, table_id, guest_id)
}

#[test]
fn test_config_show_defaults() {
    let dir = tempdir().unwrap();
    let stdout = run_ok(&dir.path().join("store"), &["config", "show"]);
    assert!(stdout.contains("Format: ID Card (1050 × 500px) - 85.6mm × 53.98mm"));
    assert!(stdout.contains("QR zone: x=700 y=150 w=150 h=150"));
}

#[test]
fn test_png_card_export() {
    let (dir, _, guest_id) = seeded();
    let store = dir.path().join("store");
    let out = dir.path().join("alice.png");

    run_ok(
        &store,
        &["export", "card", &guest_id, "--scale", "1", "-o", out.to_str().unwrap()],
    );

    let bytes = fs::read(&out).expect("PNG file was not created");
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']), "not a PNG file");
}

#[test]
fn test_pdf_card_export() {
    let (dir, _, guest_id) = seeded();
    let store = dir.path().join("store");
    let out = dir.path().join("alice.pdf");

    run_ok(
        &store,
        &["export", "card", &guest_id, "--format", "pdf", "--scale", "1", "-o", out.to_str().unwrap()],
    );

    let bytes = fs::read(&out).expect("PDF file was not created");
    assert!(bytes.starts_with(b"%PDF"), "not a PDF file");
    assert!(bytes.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

#[test]
fn test_bulk_export_names_files_by_guest() {
    let (dir, table_id, guest_id) = seeded();
    let store = dir.path().join("store");
    let second = added_id(&run_ok(&store, &["guest", "add", "Bob", "--table", &table_id]));
    let cards = dir.path().join("cards");

    let stdout = run_ok(
        &store,
        &["export", "all", "--dir", cards.to_str().unwrap(), "--scale", "0.5"],
    );
    assert!(stdout.contains("Generated 2 cards"));
    assert!(cards.join(format!("invite-{}.png", guest_id)).exists());
    assert!(cards.join(format!("invite-{}.png", second)).exists());
}

#[test]
fn test_bulk_export_without_guests_fails() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("store"), &["export", "all", "--dir", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no guests to export"));
}

#[test]
fn test_unknown_guest_card_fails() {
    let (dir, _, _) = seeded();
    let output = run(&dir.path().join("store"), &["export", "card", "ghost"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Render target not found"));
}

#[test]
fn test_csv_after_table_delete() {
    let (dir, table_id, _) = seeded();
    let store = dir.path().join("store");
    run_ok(&store, &["table", "delete", &table_id]);

    let out = dir.path().join("guests.csv");
    run_ok(&store, &["export", "csv", "-o", out.to_str().unwrap()]);

    let csv = fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Name,Email,Phone,Table,QR Code Data"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Alice Martin,alice@example.com,,Unassigned,"));
}

#[test]
fn test_guest_list_filters() {
    let (dir, table_id, _) = seeded();
    let store = dir.path().join("store");
    run_ok(&store, &["guest", "add", "Bob", "--table", &table_id]);

    let stdout = run_ok(&store, &["guest", "list", "--search", "ALICE"]);
    assert!(stdout.contains("Alice Martin"));
    assert!(!stdout.contains("Bob"));

    let stdout = run_ok(&store, &["guest", "list", "--table", "other"]);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_drag_requires_background() {
    let dir = tempdir().unwrap();
    let output = run(
        &dir.path().join("store"),
        &["config", "drag", "qr", "--display", "525x250", "--from", "400,100", "--to", "410,110"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No background image"));
}

#[test]
fn test_drag_moves_qr_zone_in_design_space() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    run_ok(&store, &["config", "background", "party.png"]);

    let stdout = run_ok(
        &store,
        &["config", "drag", "qr", "--display", "525x250", "--from", "400,100", "--to", "410,110"],
    );
    assert!(stdout.contains("QR zone: x=720.0 y=170.0 w=150.0 h=150.0"));

    let stdout = run_ok(
        &store,
        &[
            "config", "drag", "qr", "--handle", "se", "--display", "1050x500", "--from", "870,320", "--to", "700,200",
        ],
    );
    assert!(stdout.contains("w=50.0 h=50.0"));
}

#[test]
fn test_invalid_custom_size_is_rejected() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    let output = run(&store, &["config", "format", "custom", "--width", "20", "--height", "400"]);
    assert!(!output.status.success());

    // The rejected command leaves the stored format alone.
    let stdout = run_ok(&store, &["config", "show"]);
    assert!(stdout.contains("Format: ID Card (1050 × 500px)"), "{}", stdout);

    let output = run(&store, &["config", "format", "custom", "--width", "4000000000", "--height", "400"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at most"));
    assert!(run_ok(&store, &["config", "show"]).contains("Format: ID Card"));

    let stdout = run_ok(&store, &["config", "format", "custom", "--width", "800", "--height", "400"]);
    assert!(stdout.contains("(800 × 400px)"));
}

#[test]
fn test_non_ascii_color_is_an_error_not_a_crash() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    let output = run(&store, &["config", "color", "guest-name", "#aéabc"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("is not a #RRGGBB color"));
    assert!(run_ok(&store, &["config", "show"]).contains("guest-name: x=50 y=50 color=#FFFFFF"));
}

#[test]
fn test_click_without_move_reports_no_change() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    run_ok(&store, &["config", "background", "party.png"]);

    let stdout = run_ok(
        &store,
        &["config", "drag", "qr", "--display", "333x171", "--from", "240,60", "--to", "240,60"],
    );
    assert!(stdout.contains("No change"), "{}", stdout);
    assert!(!stdout.contains("QR zone"));
}

#[test]
fn test_bulk_export_accepts_settle_delay() {
    let (dir, _, guest_id) = seeded();
    let cards = dir.path().join("cards");
    run_ok(
        &dir.path().join("store"),
        &["export", "all", "--dir", cards.to_str().unwrap(), "--settle-ms", "0", "--scale", "0.5"],
    );
    assert!(cards.join(format!("invite-{}.png", guest_id)).exists());
}

#[test]
fn test_memory_store_leaves_no_files() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    let output = cargo_bin(&store)
        .args(["--memory", "table", "add", "Family"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(!store.exists());
}
