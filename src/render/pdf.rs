use anyhow::Context;

use chrono::NaiveDate;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Point, Polygon, Rgb,
};

use qrcode::{EcLevel, QrCode};

use url::Url;

use super::Template;

// A4 landscape
const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;

const QR_SIZE_MM: f32 = 42.0;
const QR_QUIET_MODULES: usize = 4;

const NUMBER_SIZE_PT: f32 = 8.2;
const MM_PER_PT: f32 = 0.352_778;

/// Text content laid out on a course certificate
#[derive(Debug)]
pub struct CourseCertificateDoc<'a> {
    pub recipient: &'a str,
    pub course: &'a str,
    pub issued_on: NaiveDate,
    pub number: &'a str,
}

/// Text content laid out on a gift certificate
#[derive(Debug)]
pub struct GiftCertificateDoc<'a> {
    pub course: &'a str,
    pub expires_on: NaiveDate,
    pub number: &'a str,
}

/// Render a course certificate as a one-page PDF
///
/// The verification URL is embedded as a QR code in the top right
/// corner, with the certificate number printed underneath it.
pub fn render_course_certificate(
    doc: &CourseCertificateDoc<'_>,
    verification_url: &Url,
    template: Template,
) -> anyhow::Result<Vec<u8>> {
    let (pdf, page, layer) = PdfDocument::new(
        "Course Certificate",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "certificate",
    );
    let layer = pdf.get_page(page).get_layer(layer);

    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("Failed to load builtin font")?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .context("Failed to load builtin font")?;

    let theme = template.theme();
    draw_frame(&layer, &theme);

    layer.set_fill_color(theme.ink.clone());
    layer.use_text("CERTIFICATE OF COMPLETION", 20.0, Mm(93.6), Mm(160.0), &bold);
    layer.use_text(doc.recipient, 34.0, Mm(93.6), Mm(123.0), &bold);
    layer.use_text(
        "has successfully completed the course",
        12.0,
        Mm(93.6),
        Mm(105.0),
        &regular,
    );
    layer.use_text(doc.course, 26.0, Mm(93.5), Mm(85.0), &bold);
    layer.use_text(
        doc.issued_on.format("%d.%m.%Y").to_string(),
        18.0,
        Mm(98.0),
        Mm(47.0),
        &regular,
    );

    draw_verification_qr(&layer, verification_url)?;
    draw_number(&layer, &regular, doc.number);

    pdf.save_to_bytes().context("Failed to serialize certificate PDF")
}

/// Render a gift certificate as a one-page PDF
pub fn render_gift_certificate(
    doc: &GiftCertificateDoc<'_>,
    verification_url: &Url,
) -> anyhow::Result<Vec<u8>> {
    let (pdf, page, layer) = PdfDocument::new(
        "Gift Certificate",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "certificate",
    );
    let layer = pdf.get_page(page).get_layer(layer);

    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("Failed to load builtin font")?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .context("Failed to load builtin font")?;

    let theme = Template::Classic.theme();
    draw_frame(&layer, &theme);

    layer.set_fill_color(theme.ink.clone());
    layer.use_text("GIFT CERTIFICATE", 20.0, Mm(93.6), Mm(160.0), &bold);
    layer.use_text(doc.course, 26.0, Mm(93.5), Mm(115.0), &bold);
    layer.use_text("Valid until", 12.0, Mm(94.0), Mm(54.0), &regular);
    layer.use_text(
        doc.expires_on.format("%d.%m.%Y").to_string(),
        18.0,
        Mm(94.0),
        Mm(47.0),
        &regular,
    );

    draw_verification_qr(&layer, verification_url)?;
    draw_number(&layer, &regular, doc.number);

    pdf.save_to_bytes().context("Failed to serialize certificate PDF")
}

struct Theme {
    band: Color,
    accent: Color,
    ink: Color,
}

impl Template {
    fn theme(self) -> Theme {
        match self {
            Template::Classic => Theme {
                band: rgb(0.10, 0.16, 0.32),
                accent: rgb(0.77, 0.62, 0.26),
                ink: rgb(0.13, 0.13, 0.17),
            },
            Template::Modern => Theme {
                band: rgb(0.04, 0.36, 0.36),
                accent: rgb(0.90, 0.49, 0.13),
                ink: rgb(0.10, 0.12, 0.12),
            },
        }
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn draw_frame(layer: &PdfLayerReference, theme: &Theme) {
    layer.set_fill_color(theme.band.clone());
    fill_rect(layer, 0.0, 0.0, 22.0, PAGE_HEIGHT_MM);

    layer.set_fill_color(theme.accent.clone());
    fill_rect(layer, 22.0, 0.0, 4.0, PAGE_HEIGHT_MM);
    fill_rect(layer, 93.5, 155.0, 120.0, 0.8);
}

/// Draw the verification QR code in the top right corner
fn draw_verification_qr(layer: &PdfLayerReference, url: &Url) -> anyhow::Result<()> {
    let code = QrCode::with_error_correction_level(url.as_str(), EcLevel::L)
        .context("Failed to build verification QR code")?;
    let width = code.width();
    let colors = code.to_colors();

    // The module grid is inset by a quiet zone on every side
    let module = QR_SIZE_MM / (width + 2 * QR_QUIET_MODULES) as f32;
    let origin_x = PAGE_WIDTH_MM - 70.0 + QR_QUIET_MODULES as f32 * module;
    let origin_y = PAGE_HEIGHT_MM - 10.0 - QR_SIZE_MM + QR_QUIET_MODULES as f32 * module;

    layer.set_fill_color(rgb(0.0, 0.0, 0.0));
    for (i, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let col = i % width;
        let row = i / width;
        let x = origin_x + col as f32 * module;
        // Matrix rows run top to bottom; the page y axis runs up
        let y = origin_y + (width - 1 - row) as f32 * module;
        fill_rect(layer, x, y, module, module);
    }

    Ok(())
}

/// Print the certificate number centered underneath the QR code
fn draw_number(layer: &PdfLayerReference, font: &IndirectFontRef, number: &str) {
    layer.set_fill_color(rgb(0.25, 0.25, 0.25));
    let x = centered_x(number, NUMBER_SIZE_PT, PAGE_WIDTH_MM - 49.0);
    layer.use_text(number, NUMBER_SIZE_PT, Mm(x), Mm(152.0), font);
}

fn centered_x(text: &str, font_size: f32, center_x: f32) -> f32 {
    // Helvetica metrics are not at hand; a mean glyph width is close
    // enough for a short identifier string
    let width = text.chars().count() as f32 * font_size * 0.55 * MM_PER_PT;
    center_x - width / 2.0
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32) {
    let ring = vec![
        (Point::new(Mm(x), Mm(y)), false),
        (Point::new(Mm(x + w), Mm(y)), false),
        (Point::new(Mm(x + w), Mm(y + h)), false),
        (Point::new(Mm(x), Mm(y + h)), false),
    ];
    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}
