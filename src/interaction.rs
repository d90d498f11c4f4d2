//! Pointer gesture state machines for the QR zone and the text anchors.
//!
//! A gesture starts on pointer-down, which snapshots the pointer and the
//! element's display-space geometry into a [`GestureSession`]. Every
//! pointer-move recomputes the geometry from that snapshot plus the total
//! pointer delta, so moves may arrive at any rate without drift. The session
//! is consumed on pointer-up (or pointer-leave, which is the same thing) and
//! the final geometry is handed back to the caller for committing.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::geometry::{clamp_point, clamp_rect, finite_or, Point, Size, Zone, MIN_ZONE_HEIGHT, MIN_ZONE_WIDTH};

/// Corner handle of a resizable zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 4] = [Self::Nw, Self::Ne, Self::Sw, Self::Se];

    /// Handles on the west side co-move the x origin.
    pub fn moves_left_edge(self) -> bool {
        matches!(self, Self::Nw | Self::Sw)
    }

    /// Handles on the north side co-move the y origin.
    pub fn moves_top_edge(self) -> bool {
        matches!(self, Self::Nw | Self::Ne)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nw => "nw",
            Self::Ne => "ne",
            Self::Sw => "sw",
            Self::Se => "se",
        }
    }
}

impl fmt::Display for ResizeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeHandle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nw" => Ok(Self::Nw),
            "ne" => Ok(Self::Ne),
            "sw" => Ok(Self::Sw),
            "se" => Ok(Self::Se),
            other => Err(format!("unknown resize handle '{other}' (expected nw, ne, sw or se)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize(ResizeHandle),
}

/// Snapshot taken on pointer-down and consumed on release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession<G> {
    pub kind: GestureKind,
    pub start_pointer: Point,
    pub start_geometry: G,
}

impl<G> GestureSession<G> {
    fn delta(&self, pointer: Point) -> (f64, f64) {
        (
            finite_or(pointer.x - self.start_pointer.x, 0.0),
            finite_or(pointer.y - self.start_pointer.y, 0.0),
        )
    }
}

/// Gesture state of one interactive element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputState<G> {
    /// No gesture in progress.
    Idle,
    Dragging(GestureSession<G>),
    Resizing(GestureSession<G>),
}

impl<G> InputState<G> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn session(&self) -> Option<&GestureSession<G>> {
        match self {
            Self::Idle => None,
            Self::Dragging(s) | Self::Resizing(s) => Some(s),
        }
    }
}

/// Moves `start` by the delta, keeping its size and staying inside `container`.
pub fn move_zone(start: Zone, dx: f64, dy: f64, container: Size) -> Zone {
    let max_x = (container.width - start.width).max(0.0);
    let max_y = (container.height - start.height).max(0.0);
    Zone {
        x: (start.x + finite_or(dx, 0.0)).clamp(0.0, max_x),
        y: (start.y + finite_or(dy, 0.0)).clamp(0.0, max_y),
        ..start
    }
}

/// Applies a corner drag to `start`.
///
/// Clamping runs in a fixed order: the size floor first, then the origin
/// floor, then the far-edge cap. West and north handles keep the opposite
/// edge in place when a floor kicks in.
pub fn resize_zone(
    start: Zone,
    handle: ResizeHandle,
    dx: f64,
    dy: f64,
    container: Size,
    min_width: f64,
    min_height: f64,
) -> Zone {
    let dx = finite_or(dx, 0.0);
    let dy = finite_or(dy, 0.0);
    let right = start.right();
    let bottom = start.bottom();

    let (mut x, mut y, mut width, mut height) = (start.x, start.y, start.width, start.height);
    if handle.moves_left_edge() {
        x += dx;
        width -= dx;
    } else {
        width += dx;
    }
    if handle.moves_top_edge() {
        y += dy;
        height -= dy;
    } else {
        height += dy;
    }

    if width < min_width {
        width = min_width;
        if handle.moves_left_edge() {
            x = right - min_width;
        }
    }
    if height < min_height {
        height = min_height;
        if handle.moves_top_edge() {
            y = bottom - min_height;
        }
    }

    if x < 0.0 {
        if handle.moves_left_edge() {
            width += x;
        }
        x = 0.0;
    }
    if y < 0.0 {
        if handle.moves_top_edge() {
            height += y;
        }
        y = 0.0;
    }

    width = width.min(container.width - x);
    height = height.min(container.height - y);

    // Only a start zone that was already out of bounds can still violate
    // the invariant at this point.
    clamp_rect(Zone::new(x, y, width, height), container, min_width, min_height)
}

/// Drag/resize machine for the QR zone, in display space.
#[derive(Debug, Clone)]
pub struct RectGesture {
    zone: Zone,
    state: InputState<Zone>,
    min_width: f64,
    min_height: f64,
}

impl RectGesture {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            state: InputState::Idle,
            min_width: MIN_ZONE_WIDTH,
            min_height: MIN_ZONE_HEIGHT,
        }
    }

    pub fn with_min_size(mut self, min_width: f64, min_height: f64) -> Self {
        self.min_width = min_width;
        self.min_height = min_height;
        self
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn state(&self) -> &InputState<Zone> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_idle()
    }

    /// Replaces the live geometry. Ignored mid-gesture so a resync cannot
    /// yank the element out from under the pointer.
    pub fn set_zone(&mut self, zone: Zone) -> bool {
        if self.is_active() {
            return false;
        }
        self.zone = zone;
        true
    }

    /// Starts a move (no handle) or a corner resize.
    pub fn pointer_down(&mut self, pointer: Point, handle: Option<ResizeHandle>) {
        let kind = handle.map_or(GestureKind::Move, GestureKind::Resize);
        let session = GestureSession {
            kind,
            start_pointer: pointer,
            start_geometry: self.zone,
        };
        self.state = match kind {
            GestureKind::Move => InputState::Dragging(session),
            GestureKind::Resize(_) => InputState::Resizing(session),
        };
        debug!(?kind, x = pointer.x, y = pointer.y, "zone gesture started");
    }

    /// Recomputes the live zone. Returns false when no gesture is active.
    pub fn pointer_move(&mut self, pointer: Point, container: Size) -> bool {
        let Some(session) = self.state.session().copied() else {
            return false;
        };
        let (dx, dy) = session.delta(pointer);
        self.zone = match session.kind {
            GestureKind::Move => move_zone(session.start_geometry, dx, dy, container),
            GestureKind::Resize(handle) => resize_zone(
                session.start_geometry,
                handle,
                dx,
                dy,
                container,
                self.min_width,
                self.min_height,
            ),
        };
        true
    }

    /// Ends the gesture, returning the final zone if one was in progress.
    pub fn pointer_up(&mut self) -> Option<Zone> {
        if self.state.is_idle() {
            return None;
        }
        self.state = InputState::Idle;
        debug!(zone = ?self.zone, "zone gesture released");
        Some(self.zone)
    }
}

/// Drag machine for a text block anchored at its top-left corner.
#[derive(Debug, Clone)]
pub struct AnchorGesture {
    anchor: Point,
    state: InputState<Point>,
}

impl AnchorGesture {
    pub fn new(anchor: Point) -> Self {
        Self {
            anchor,
            state: InputState::Idle,
        }
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn set_anchor(&mut self, anchor: Point) -> bool {
        if self.is_active() {
            return false;
        }
        self.anchor = anchor;
        true
    }

    pub fn pointer_down(&mut self, pointer: Point) {
        self.state = InputState::Dragging(GestureSession {
            kind: GestureKind::Move,
            start_pointer: pointer,
            start_geometry: self.anchor,
        });
        debug!(x = pointer.x, y = pointer.y, "anchor gesture started");
    }

    /// `label` is the live measured size of the text block being dragged.
    pub fn pointer_move(&mut self, pointer: Point, label: Size, container: Size) -> bool {
        let Some(session) = self.state.session().copied() else {
            return false;
        };
        let (dx, dy) = session.delta(pointer);
        self.anchor = clamp_point(session.start_geometry.offset(dx, dy), label, container);
        true
    }

    pub fn pointer_up(&mut self) -> Option<Point> {
        if self.state.is_idle() {
            return None;
        }
        self.state = InputState::Idle;
        debug!(anchor = ?self.anchor, "anchor gesture released");
        Some(self.anchor)
    }
}
