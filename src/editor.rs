//! The layout editor surface: QR zone plus two text anchors over a preview.
//!
//! Committed geometry lives in design space on the [`EventConfig`]. The
//! editor keeps a display-space copy scaled to whatever size the preview is
//! rendered at, lets the gesture machines mutate that copy live, and only
//! on release translates the active element back to design space and hands
//! it to a [`LayoutSink`].

use std::str::FromStr;

use tracing::debug;

use crate::geometry::{scale_point, scale_rect, Anchor, Point, ScaleFactors, Size, Zone};
use crate::interaction::{AnchorGesture, RectGesture, ResizeHandle};
use crate::model::{EventConfig, TextField};

/// Shown instead of the editor while no background image is set.
pub const NO_BACKGROUND_PLACEHOLDER: &str = "No background image";
pub const GUEST_NAME_EXAMPLE: &str = "Guest name example";
pub const TABLE_NAME_EXAMPLE: &str = "Table name example";

/// Commits closer than this to the stored value are treated as unchanged.
const SNAP_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorElement {
    QrZone,
    GuestName,
    TableName,
}

impl EditorElement {
    pub fn text_field(self) -> Option<TextField> {
        match self {
            Self::QrZone => None,
            Self::GuestName => Some(TextField::GuestName),
            Self::TableName => Some(TextField::TableName),
        }
    }
}

impl FromStr for EditorElement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "qr" | "qr-zone" => Ok(Self::QrZone),
            other => other
                .parse::<TextField>()
                .map(Self::from)
                .map_err(|_| format!("unknown element '{other}' (expected qr, guest-name or table-name)")),
        }
    }
}

impl From<TextField> for EditorElement {
    fn from(field: TextField) -> Self {
        match field {
            TextField::GuestName => Self::GuestName,
            TextField::TableName => Self::TableName,
        }
    }
}

/// A design-space value produced by releasing a gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Commit {
    QrZone(Zone),
    TextPosition(TextField, Anchor),
}

impl Commit {
    pub fn dispatch<K: LayoutSink + ?Sized>(self, sink: &mut K) {
        match self {
            Self::QrZone(zone) => sink.on_qr_zone_change(zone),
            Self::TextPosition(field, p) => sink.on_text_position_change(field, p.x, p.y),
        }
    }
}

/// Receives committed layout changes.
///
/// Implementations are expected to ignore values equal to what they last
/// stored.
pub trait LayoutSink {
    fn on_qr_zone_change(&mut self, zone: Zone);
    fn on_text_position_change(&mut self, field: TextField, x: f64, y: f64);
}

impl LayoutSink for Vec<Commit> {
    fn on_qr_zone_change(&mut self, zone: Zone) {
        self.push(Commit::QrZone(zone));
    }

    fn on_text_position_change(&mut self, field: TextField, x: f64, y: f64) {
        self.push(Commit::TextPosition(field, Point::new(x, y)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CommittedLayout {
    qr_zone: Zone,
    guest_name: Anchor,
    table_name: Anchor,
}

impl CommittedLayout {
    fn from_config(config: &EventConfig) -> Self {
        Self {
            qr_zone: config.qr_zone(),
            guest_name: config.anchor(TextField::GuestName),
            table_name: config.anchor(TextField::TableName),
        }
    }

    fn anchor(&self, field: TextField) -> Anchor {
        match field {
            TextField::GuestName => self.guest_name,
            TextField::TableName => self.table_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutEditor {
    card_size: Size,
    rendered_size: Option<Size>,
    has_background: bool,
    format_label: String,
    committed: CommittedLayout,
    qr: RectGesture,
    guest_name: AnchorGesture,
    table_name: AnchorGesture,
    guest_label: Size,
    table_label: Size,
    active: Option<EditorElement>,
}

impl LayoutEditor {
    /// Builds an editor for `config`, with the preview rendered at `rendered_size`.
    pub fn new(config: &EventConfig, rendered_size: Option<Size>) -> Self {
        let committed = CommittedLayout::from_config(config);
        let mut editor = Self {
            card_size: config.card_size(),
            rendered_size: None,
            has_background: false,
            format_label: String::new(),
            committed,
            qr: RectGesture::new(committed.qr_zone),
            guest_name: AnchorGesture::new(committed.guest_name),
            table_name: AnchorGesture::new(committed.table_name),
            guest_label: Size::default(),
            table_label: Size::default(),
            active: None,
        };
        editor.sync(config, rendered_size);
        editor
    }

    /// Re-reads committed geometry, card size and background from `config`
    /// and rescales the display state. Elements mid-gesture are left alone.
    pub fn sync(&mut self, config: &EventConfig, rendered_size: Option<Size>) {
        self.card_size = config.card_size();
        self.has_background = config.has_background();
        self.format_label = status_line(config);
        self.committed = CommittedLayout::from_config(config);
        self.rendered_size = rendered_size.filter(Size::is_usable);
        self.rescale();
    }

    /// The preview was laid out at a new size (window resize, panel toggle).
    pub fn set_rendered_size(&mut self, rendered_size: Size) {
        self.rendered_size = Some(rendered_size).filter(Size::is_usable);
        self.rescale();
    }

    /// Reports the live measured size of an example text block, in display pixels.
    pub fn set_label_size(&mut self, field: TextField, size: Size) {
        match field {
            TextField::GuestName => self.guest_label = size,
            TextField::TableName => self.table_label = size,
        }
    }

    fn to_display(&self) -> ScaleFactors {
        match self.rendered_size {
            Some(rendered) => ScaleFactors::between(self.card_size, rendered),
            None => ScaleFactors::IDENTITY,
        }
    }

    fn rescale(&mut self) {
        let scale = self.to_display();
        self.qr.set_zone(scale_rect(self.committed.qr_zone, scale));
        self.guest_name.set_anchor(scale_point(self.committed.guest_name, scale));
        self.table_name.set_anchor(scale_point(self.committed.table_name, scale));
        debug!(sx = scale.x, sy = scale.y, "rescaled editor display state");
    }

    /// Whether pointer input is accepted. False while no background is set.
    pub fn is_interactive(&self) -> bool {
        self.has_background && self.rendered_size.is_some()
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        (!self.has_background).then_some(NO_BACKGROUND_PLACEHOLDER)
    }

    pub fn active(&self) -> Option<EditorElement> {
        self.active
    }

    pub fn card_size(&self) -> Size {
        self.card_size
    }

    pub fn rendered_size(&self) -> Option<Size> {
        self.rendered_size
    }

    pub fn qr_zone_display(&self) -> Zone {
        self.qr.zone()
    }

    pub fn anchor_display(&self, field: TextField) -> Anchor {
        match field {
            TextField::GuestName => self.guest_name.anchor(),
            TextField::TableName => self.table_name.anchor(),
        }
    }

    pub fn status(&self) -> &str {
        &self.format_label
    }

    /// Starts a gesture on `element`. `handle` only applies to the QR zone.
    /// Returns false when the editor is not interactive or already busy.
    pub fn pointer_down(&mut self, element: EditorElement, handle: Option<ResizeHandle>, pointer: Point) -> bool {
        if !self.is_interactive() || self.active.is_some() {
            return false;
        }
        match element {
            EditorElement::QrZone => self.qr.pointer_down(pointer, handle),
            EditorElement::GuestName => self.guest_name.pointer_down(pointer),
            EditorElement::TableName => self.table_name.pointer_down(pointer),
        }
        self.active = Some(element);
        true
    }

    /// Updates only the active element; returns false when idle.
    pub fn pointer_move(&mut self, pointer: Point) -> bool {
        let (Some(element), Some(container)) = (self.active, self.rendered_size) else {
            return false;
        };
        match element {
            EditorElement::QrZone => self.qr.pointer_move(pointer, container),
            EditorElement::GuestName => self.guest_name.pointer_move(pointer, self.guest_label, container),
            EditorElement::TableName => self.table_name.pointer_move(pointer, self.table_label, container),
        }
    }

    /// Ends the active gesture and returns its design-space value.
    pub fn pointer_up(&mut self) -> Option<Commit> {
        let element = self.active.take()?;
        let to_design = self.to_display().inverse();
        let commit = match element {
            EditorElement::QrZone => {
                let zone = scale_rect(self.qr.pointer_up()?, to_design);
                Commit::QrZone(snap_zone(zone, self.committed.qr_zone))
            }
            EditorElement::GuestName | EditorElement::TableName => {
                let field = element.text_field()?;
                let gesture = match field {
                    TextField::GuestName => &mut self.guest_name,
                    TextField::TableName => &mut self.table_name,
                };
                let anchor = scale_point(gesture.pointer_up()?, to_design);
                Commit::TextPosition(field, snap_point(anchor, self.committed.anchor(field)))
            }
        };
        debug!(?commit, "gesture committed");
        Some(commit)
    }

    /// Leaving the container ends the gesture exactly like a release.
    pub fn pointer_leave(&mut self) -> Option<Commit> {
        self.pointer_up()
    }

    /// Releases and forwards the commit, if any, to `sink`.
    pub fn release_into<K: LayoutSink + ?Sized>(&mut self, sink: &mut K) -> bool {
        match self.pointer_up() {
            Some(commit) => {
                commit.dispatch(sink);
                true
            }
            None => false,
        }
    }
}

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= SNAP_EPSILON * b.abs().max(1.0)
}

fn snap_zone(zone: Zone, committed: Zone) -> Zone {
    if near(zone.x, committed.x)
        && near(zone.y, committed.y)
        && near(zone.width, committed.width)
        && near(zone.height, committed.height)
    {
        committed
    } else {
        zone
    }
}

fn snap_point(point: Point, committed: Point) -> Point {
    if near(point.x, committed.x) && near(point.y, committed.y) {
        committed
    } else {
        point
    }
}

/// `Format: ID Card (1050 × 500px) - 85.6mm × 53.98mm`
pub fn status_line(config: &EventConfig) -> String {
    let format = config.format();
    let size = config.card_size();
    let mut line = format!("Format: {} ({} × {}px)", format.name, size.width, size.height);
    if let (Some(w), Some(h)) = (format.print_width, format.print_height) {
        line.push_str(&format!(" - {w} × {h}"));
    }
    line
}
