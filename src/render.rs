//! Card renderer: percentage layout of one guest's card, and the rasterizer
//! that turns it into PNG or PDF bytes.

use std::io::{BufWriter, Cursor, Read};

use ::image::imageops::{self, FilterType};
use ::image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use printpdf::*;
use rusttype::{point, Font, Scale};
use tracing::{debug, warn};

use crate::error::{InviteError, Result};
use crate::geometry::{Size, Zone};
use crate::model::{EventConfig, Guest, Table, TextField};
use crate::qr::{qr_value, render_qr_image};

/// Inner padding around each text block, in design pixels.
const TEXT_PADDING_PX: f64 = 24.0;
const GUEST_NAME_FONT_PX: f64 = 30.0;
const TABLE_NAME_FONT_PX: f64 = 20.0;
const EMAIL_FONT_PX: f64 = 14.0;
const EMAIL_MARGIN_PX: f64 = 4.0;
const LINE_HEIGHT: f64 = 1.25;
/// Margin subtracted from the QR zone's short side.
const QR_INSET_PX: f64 = 10.0;

/// Placeholder gradient (top-left to bottom-right).
const GRADIENT_FROM: [u8; 3] = [0x60, 0xA5, 0xFA];
const GRADIENT_TO: [u8; 3] = [0x25, 0x63, 0xEB];

const PT_PER_MM: f64 = 72.0 / 25.4;

/// Largest bitmap side the rasterizer will allocate.
pub const MAX_RASTER_SIDE: u32 = 20_000;

/// Used when no table is resolved for the guest.
pub const TABLE_TBA: &str = "TBA";

/// Parses `#RGB` or `#RRGGBB`.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        _ => None,
    }
}

/// A box positioned in percent of the card's width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentBox {
    pub fn of(zone: Zone, card: Size) -> Self {
        Self {
            left: percent(zone.x, card.width),
            top: percent(zone.y, card.height),
            width: percent(zone.width, card.width),
            height: percent(zone.height, card.height),
        }
    }

    /// Resolves the box against a target of any pixel size.
    pub fn to_pixels(&self, target: Size) -> Zone {
        Zone::new(
            self.left / 100.0 * target.width,
            self.top / 100.0 * target.height,
            self.width / 100.0 * target.width,
            self.height / 100.0 * target.height,
        )
    }
}

fn percent(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Font size in design pixels.
    pub font_px: f64,
    pub bold: bool,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub field: TextField,
    pub left_pct: f64,
    pub top_pct: f64,
    pub color: [u8; 3],
    pub lines: Vec<TextLine>,
}

/// Everything needed to paint one card, independent of output size.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub card_size: Size,
    pub background: Option<String>,
    pub qr_box: PercentBox,
    /// QR side at design resolution.
    pub qr_size_px: u32,
    pub qr_value: String,
    pub text_blocks: Vec<TextBlock>,
}

impl CardLayout {
    /// Lays out `guest`'s card. Reads the config, never modifies it.
    pub fn compute(config: &EventConfig, table: Option<&Table>, guest: &Guest) -> Self {
        let card = config.card_size();
        let zone = config.qr_zone();
        let qr_size_px = (zone.width.min(zone.height) - QR_INSET_PX).max(1.0).round() as u32;

        let text_block = |field: TextField, lines: Vec<TextLine>| {
            let anchor = config.anchor(field);
            TextBlock {
                field,
                left_pct: percent(anchor.x, card.width),
                top_pct: percent(anchor.y, card.height),
                color: parse_hex_color(config.color(field)).unwrap_or([0xFF, 0xFF, 0xFF]),
                lines,
            }
        };

        let guest_lines = vec![TextLine {
            text: guest.name.clone(),
            font_px: GUEST_NAME_FONT_PX,
            bold: true,
            opacity: 1.0,
        }];

        let table_name = table.map_or(TABLE_TBA, |t| t.name.as_str());
        let mut table_lines = vec![TextLine {
            text: format!("Table: {table_name}"),
            font_px: TABLE_NAME_FONT_PX,
            bold: false,
            opacity: 0.9,
        }];
        if let Some(email) = guest.email.as_deref().filter(|e| !e.is_empty()) {
            table_lines.push(TextLine {
                text: email.to_string(),
                font_px: EMAIL_FONT_PX,
                bold: false,
                opacity: 0.75,
            });
        }

        Self {
            card_size: card,
            background: config.background_image_url.clone().filter(|b| !b.trim().is_empty()),
            qr_box: PercentBox::of(zone, card),
            qr_size_px,
            qr_value: qr_value(&guest.qr_code_data).to_string(),
            text_blocks: vec![
                text_block(TextField::GuestName, guest_lines),
                text_block(TextField::TableName, table_lines),
            ],
        }
    }
}

/// Rough size of a single-line text block, for hosts that cannot measure.
pub fn estimate_text_block(text: &str, font_px: f64, padding_px: f64) -> Size {
    let chars = text.chars().count() as f64;
    Size::new(chars * font_px * 0.6 + 2.0 * padding_px, font_px * LINE_HEIGHT + 2.0 * padding_px)
}

/// Turns a card layout into output bytes.
pub trait Rasterizer {
    /// PNG bytes.
    fn rasterize_to_image(&self, layout: &CardLayout) -> Result<Vec<u8>>;
    /// A single-page PDF with the card stretched to the page.
    fn rasterize_to_pdf(&self, layout: &CardLayout, page_width_mm: f32, page_height_mm: f32) -> Result<Vec<u8>>;
}

// ============================================================================
// Background & fonts
// ============================================================================

/// Loads a background from a file path or an http(s) URL.
pub fn load_background(reference: &str) -> Result<DynamicImage> {
    let image_bytes = if reference.starts_with("http://") || reference.starts_with("https://") {
        let response = ureq::get(reference)
            .call()
            .map_err(|e| InviteError::Background(format!("Failed to fetch URL: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| InviteError::Background(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        std::fs::read(reference).map_err(|e| InviteError::Background(format!("{}: {}", reference, e)))?
    };

    ::image::load_from_memory(&image_bytes)
        .map_err(|e| InviteError::Background(format!("Failed to decode image: {}", e)))
}

struct CardFonts {
    regular: Font<'static>,
    bold: Option<Font<'static>>,
}

impl CardFonts {
    fn load() -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let regular = query_font(&db, fontdb::Weight::NORMAL)?;
        let bold = query_font(&db, fontdb::Weight::BOLD);
        Some(Self { regular, bold })
    }

    fn pick(&self, bold: bool) -> &Font<'static> {
        match (&self.bold, bold) {
            (Some(font), true) => font,
            _ => &self.regular,
        }
    }
}

fn query_font(db: &fontdb::Database, weight: fontdb::Weight) -> Option<Font<'static>> {
    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    };
    let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
    let bytes = db.with_face_data(id, |data, _| data.to_vec())?;
    Font::try_from_vec(bytes)
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Paints cards with `image` + `qrcode`, wrapping them in PDF with `printpdf`.
///
/// Text is drawn with the first sans-serif system font found. Without one
/// the bitmap carries no text and PDF output falls back to built-in
/// Helvetica drawn on top of the image.
pub struct CardRasterizer {
    scale: f64,
    background: Option<DynamicImage>,
    fonts: Option<CardFonts>,
}

impl CardRasterizer {
    /// Prepares a rasterizer for `config`, loading its background once.
    pub fn new(config: &EventConfig, scale: f64) -> Result<Self> {
        let background = match config.background_image_url.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => Some(load_background(reference)?),
            _ => None,
        };
        let fonts = CardFonts::load();
        if fonts.is_none() {
            warn!("no system font found, card bitmaps will not contain text");
        }
        Ok(Self {
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
            background,
            fonts,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn has_fonts(&self) -> bool {
        self.fonts.is_some()
    }

    /// Output bitmap size for `layout`. Fails instead of allocating a bitmap
    /// with a side above [`MAX_RASTER_SIDE`].
    pub fn pixel_size(&self, layout: &CardLayout) -> Result<(u32, u32)> {
        let w = (layout.card_size.width * self.scale).round().max(1.0);
        let h = (layout.card_size.height * self.scale).round().max(1.0);
        let limit = f64::from(MAX_RASTER_SIDE);
        if !(w <= limit && h <= limit) {
            return Err(InviteError::InvalidInput(format!(
                "card would render at {w}x{h}px, above the {MAX_RASTER_SIDE}px limit"
            )));
        }
        Ok((w as u32, h as u32))
    }

    pub fn render_bitmap(&self, layout: &CardLayout) -> Result<RgbaImage> {
        let (width, height) = self.pixel_size(layout)?;
        let target = Size::new(f64::from(width), f64::from(height));

        let mut canvas = match &self.background {
            Some(bg) => bg.resize_to_fill(width, height, FilterType::Triangle).to_rgba8(),
            None => gradient(width, height),
        };

        // QR panel: white box, code centered inside.
        let panel = layout.qr_box.to_pixels(target);
        fill_rect(&mut canvas, panel, [0xFF, 0xFF, 0xFF]);
        let qr_px = (f64::from(layout.qr_size_px) * self.scale).round().max(1.0) as u32;
        let qr = DynamicImage::ImageLuma8(render_qr_image(&layout.qr_value, qr_px)?).to_rgba8();
        let qr_x = panel.x + (panel.width - f64::from(qr.width())) / 2.0;
        let qr_y = panel.y + (panel.height - f64::from(qr.height())) / 2.0;
        imageops::overlay(&mut canvas, &qr, qr_x.round() as i64, qr_y.round() as i64);

        if let Some(fonts) = &self.fonts {
            for block in &layout.text_blocks {
                self.draw_block(&mut canvas, fonts, block, target);
            }
        }

        debug!(width, height, "rendered card bitmap");
        Ok(canvas)
    }

    fn draw_block(&self, canvas: &mut RgbaImage, fonts: &CardFonts, block: &TextBlock, target: Size) {
        let padding = TEXT_PADDING_PX * self.scale;
        let x = block.left_pct / 100.0 * target.width + padding;
        let mut y = block.top_pct / 100.0 * target.height + padding;

        for (i, line) in block.lines.iter().enumerate() {
            if i > 0 && line.font_px <= EMAIL_FONT_PX {
                y += EMAIL_MARGIN_PX * self.scale;
            }
            let px = (line.font_px * self.scale) as f32;
            let font = fonts.pick(line.bold);
            // Soft drop shadow first, then the text itself.
            draw_text(canvas, font, &line.text, px, x as f32, (y + 2.0 * self.scale) as f32, [0, 0, 0], 0.3);
            draw_text(canvas, font, &line.text, px, x as f32, y as f32, block.color, line.opacity);
            y += line.font_px * LINE_HEIGHT * self.scale;
        }
    }
}

impl Rasterizer for CardRasterizer {
    fn rasterize_to_image(&self, layout: &CardLayout) -> Result<Vec<u8>> {
        let bitmap = self.render_bitmap(layout)?;
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(bitmap).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    fn rasterize_to_pdf(&self, layout: &CardLayout, page_width_mm: f32, page_height_mm: f32) -> Result<Vec<u8>> {
        // Landscape: the long side runs horizontally.
        let (page_w, page_h) = if page_width_mm >= page_height_mm {
            (page_width_mm, page_height_mm)
        } else {
            (page_height_mm, page_width_mm)
        };

        let (doc, page1, layer1) = PdfDocument::new("Invitation", Mm(page_w), Mm(page_h), "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);

        let rgb_image = DynamicImage::ImageRgba8(self.render_bitmap(layout)?).to_rgb8();
        let (width_px, height_px) = rgb_image.dimensions();

        let image = Image::from(ImageXObject {
            width: Px(width_px as usize),
            height: Px(height_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: rgb_image.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI fits the width; the vertical scale stretches to the page height.
        let dpi = (width_px as f32) / (page_w / 25.4);
        let natural_height_mm = height_px as f32 / dpi * 25.4;
        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                dpi: Some(dpi),
                scale_y: Some(page_h / natural_height_mm),
                ..Default::default()
            },
        );

        if self.fonts.is_none() {
            let font_regular = doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| InviteError::Pdf(e.to_string()))?;
            let font_bold = doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| InviteError::Pdf(e.to_string()))?;
            let mm_per_px = f64::from(page_w) / layout.card_size.width;
            for block in &layout.text_blocks {
                draw_pdf_block(&layer, &font_regular, &font_bold, block, mm_per_px, page_w, page_h);
            }
        }

        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(Cursor::new(&mut buf));
            doc.save(&mut writer).map_err(|e| InviteError::Pdf(e.to_string()))?;
        }
        Ok(buf)
    }
}

fn draw_pdf_block(
    layer: &PdfLayerReference,
    font_regular: &IndirectFontRef,
    font_bold: &IndirectFontRef,
    block: &TextBlock,
    mm_per_px: f64,
    page_w: f32,
    page_h: f32,
) {
    let [r, g, b] = block.color;
    layer.set_fill_color(Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    )));

    let x_mm = block.left_pct / 100.0 * f64::from(page_w) + TEXT_PADDING_PX * mm_per_px;
    let mut top_mm = block.top_pct / 100.0 * f64::from(page_h) + TEXT_PADDING_PX * mm_per_px;
    for line in &block.lines {
        let size_mm = line.font_px * mm_per_px;
        // PDF y grows upward from the bottom; place the baseline one size below the top.
        let baseline = f64::from(page_h) - top_mm - size_mm;
        let font = if line.bold { font_bold } else { font_regular };
        layer.use_text(
            &line.text,
            (size_mm * PT_PER_MM) as f32,
            Mm(x_mm as f32),
            Mm(baseline as f32),
            font,
        );
        top_mm += line.font_px * LINE_HEIGHT * mm_per_px;
    }
}

// ============================================================================
// Drawing Utilities
// ============================================================================

fn gradient(width: u32, height: u32) -> RgbaImage {
    let span = f64::from(width + height).max(1.0);
    RgbaImage::from_fn(width, height, |x, y| {
        let t = f64::from(x + y) / span;
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgba([
            mix(GRADIENT_FROM[0], GRADIENT_TO[0]),
            mix(GRADIENT_FROM[1], GRADIENT_TO[1]),
            mix(GRADIENT_FROM[2], GRADIENT_TO[2]),
            255,
        ])
    })
}

fn fill_rect(canvas: &mut RgbaImage, rect: Zone, color: [u8; 3]) {
    let x0 = rect.x.max(0.0).round() as u32;
    let y0 = rect.y.max(0.0).round() as u32;
    let x1 = (rect.right().round().max(0.0) as u32).min(canvas.width());
    let y1 = (rect.bottom().round().max(0.0) as u32).min(canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
        }
    }
}

fn blend(pixel: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for (channel, c) in pixel.0.iter_mut().take(3).zip(color) {
        *channel = (f32::from(c) * a + f32::from(*channel) * (1.0 - a)).round() as u8;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_text(canvas: &mut RgbaImage, font: &Font<'_>, text: &str, px: f32, x: f32, y: f32, color: [u8; 3], alpha: f32) {
    let scale = Scale::uniform(px);
    let ascent = font.v_metrics(scale).ascent;
    let (width, height) = canvas.dimensions();

    for glyph in font.layout(text, scale, point(x, y + ascent)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                blend(canvas.get_pixel_mut(px as u32, py as u32), color, coverage * alpha);
            }
        });
    }
}
