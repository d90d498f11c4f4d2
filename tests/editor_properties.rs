use invite_cards::geometry::{scale_rect, ScaleFactors, MIN_ZONE_HEIGHT, MIN_ZONE_WIDTH};
use invite_cards::interaction::{move_zone, resize_zone, RectGesture};
use invite_cards::{Commit, EditorElement, EventConfig, LayoutEditor, Point, ResizeHandle, Size, Zone};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn handle() -> impl Strategy<Value = ResizeHandle> {
    prop_oneof![
        Just(ResizeHandle::Nw),
        Just(ResizeHandle::Ne),
        Just(ResizeHandle::Sw),
        Just(ResizeHandle::Se),
    ]
}

/// A container plus a zone already satisfying the placement invariant.
fn container_and_zone() -> impl Strategy<Value = (Size, Zone)> {
    (100.0f64..2000.0, 100.0f64..2000.0).prop_flat_map(|(cw, ch)| {
        (MIN_ZONE_WIDTH..=cw, MIN_ZONE_HEIGHT..=ch).prop_flat_map(move |(w, h)| {
            (0.0..=(cw - w), 0.0..=(ch - h))
                .prop_map(move |(x, y)| (Size::new(cw, ch), Zone::new(x, y, w, h)))
        })
    })
}

fn assert_placed(zone: Zone, container: Size) {
    assert!(zone.x >= -EPS && zone.y >= -EPS, "origin out of bounds: {zone:?}");
    assert!(zone.width >= MIN_ZONE_WIDTH - EPS, "too narrow: {zone:?}");
    assert!(zone.height >= MIN_ZONE_HEIGHT - EPS, "too short: {zone:?}");
    assert!(zone.right() <= container.width + EPS, "past right edge: {zone:?} in {container:?}");
    assert!(zone.bottom() <= container.height + EPS, "past bottom edge: {zone:?} in {container:?}");
}

proptest! {
    #[test]
    fn resize_never_breaks_placement(
        (container, start) in container_and_zone(),
        handle in handle(),
        dx in -3000.0f64..3000.0,
        dy in -3000.0f64..3000.0,
    ) {
        let zone = resize_zone(start, handle, dx, dy, container, MIN_ZONE_WIDTH, MIN_ZONE_HEIGHT);
        assert_placed(zone, container);
    }

    #[test]
    fn move_keeps_size_and_stays_inside(
        (container, start) in container_and_zone(),
        dx in -3000.0f64..3000.0,
        dy in -3000.0f64..3000.0,
    ) {
        let zone = move_zone(start, dx, dy, container);
        prop_assert_eq!(zone.size(), start.size());
        assert_placed(zone, container);
    }

    #[test]
    fn gesture_only_commits_last_state(
        (container, start) in container_and_zone(),
        handle in handle(),
        moves in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 1..8),
    ) {
        let mut gesture = RectGesture::new(start);
        gesture.pointer_down(Point::new(0.0, 0.0), Some(handle));
        let mut last = start;
        for (x, y) in &moves {
            prop_assert!(gesture.pointer_move(Point::new(*x, *y), container));
            last = gesture.zone();
        }
        let (fx, fy) = moves[moves.len() - 1];
        let expected = resize_zone(start, handle, fx, fy, container, MIN_ZONE_WIDTH, MIN_ZONE_HEIGHT);
        prop_assert_eq!(last, expected);
        prop_assert_eq!(gesture.pointer_up(), Some(expected));
        prop_assert!(!gesture.pointer_move(Point::new(1.0, 1.0), container));
    }

    #[test]
    fn display_round_trip_within_one_unit(
        (card, zone) in container_and_zone(),
        rendered_w in 50.0f64..3000.0,
        rendered_h in 50.0f64..3000.0,
    ) {
        let to_display = ScaleFactors::between(card, Size::new(rendered_w, rendered_h));
        let back = scale_rect(scale_rect(zone, to_display), to_display.inverse());
        prop_assert!((back.x - zone.x).abs() <= 1.0);
        prop_assert!((back.y - zone.y).abs() <= 1.0);
        prop_assert!((back.width - zone.width).abs() <= 1.0);
        prop_assert!((back.height - zone.height).abs() <= 1.0);
    }

    #[test]
    fn click_without_move_commits_stored_zone(
        rendered_w in 60.0f64..2500.0,
        rendered_h in 60.0f64..2500.0,
    ) {
        let mut cfg = EventConfig::with_defaults("cfg");
        cfg.background_image_url = Some("bg.png".into());
        let mut editor = LayoutEditor::new(&cfg, Some(Size::new(rendered_w, rendered_h)));
        prop_assert!(editor.pointer_down(EditorElement::QrZone, None, Point::new(10.0, 10.0)));
        prop_assert_eq!(editor.pointer_up(), Some(Commit::QrZone(cfg.qr_zone())));
    }
}

#[test]
fn resize_corner_cases() {
    let container = Size::new(1050.0, 500.0);
    let start = Zone::new(100.0, 100.0, 100.0, 100.0);

    let shrunk = resize_zone(start, ResizeHandle::Se, -80.0, -80.0, container, 50.0, 50.0);
    assert_eq!(shrunk, Zone::new(100.0, 100.0, 50.0, 50.0));

    // North-west shrink keeps the bottom-right corner where it was.
    let nw = resize_zone(start, ResizeHandle::Nw, 80.0, 80.0, container, 50.0, 50.0);
    assert_eq!(nw, Zone::new(150.0, 150.0, 50.0, 50.0));

    let grown = resize_zone(start, ResizeHandle::Nw, -500.0, -500.0, container, 50.0, 50.0);
    assert_eq!(grown, Zone::new(0.0, 0.0, 200.0, 200.0));
}

#[test]
fn resized_editor_commits_scaled_zone() {
    let mut cfg = EventConfig::with_defaults("cfg");
    cfg.background_image_url = Some("bg.png".into());
    // Half-size preview of the 1050 x 500 card.
    let mut editor = LayoutEditor::new(&cfg, Some(Size::new(525.0, 250.0)));
    assert!(editor.pointer_down(EditorElement::QrZone, Some(ResizeHandle::Se), Point::new(425.0, 150.0)));
    editor.pointer_move(Point::new(450.0, 175.0));
    assert_eq!(editor.qr_zone_display(), Zone::new(350.0, 75.0, 100.0, 100.0));
    assert_eq!(editor.pointer_up(), Some(Commit::QrZone(Zone::new(700.0, 150.0, 200.0, 200.0))));
}
