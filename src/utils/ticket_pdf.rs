use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::{AppError, AppResult};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 25.0;

pub struct TicketDetails<'a> {
    pub ticket_no: &'a str,
    pub park: &'a str,
    pub district: &'a str,
    pub visit_date: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub total_amount: f64,
    pub visitor_name: &'a str,
    pub status: &'a str,
}

pub fn file_name(ticket_no: &str) -> String {
    format!("ticket-{}.pdf", ticket_no)
}

/// Render a single-page A4 ticket.
pub fn render(ticket: &TicketDetails<'_>) -> AppResult<Vec<u8>> {
    let title = format!("ParkPass Ticket {}", ticket.ticket_no);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT - 40.0;
    centered(&layer, "ParkPass Ticket", 25.0, y, &bold);
    y -= 15.0;
    centered(&layer, &format!("Ticket No: {}", ticket.ticket_no), 15.0, y, &bold);
    y -= 20.0;

    // Builtin fonts only cover WinAnsi, so the rupee sign is spelled out
    let lines = [
        format!("Park: {}", ticket.park),
        format!("District: {}", ticket.district),
        format!("Visit Date: {}", ticket.visit_date.format("%a %b %d %Y")),
        format!("Adults: {}", ticket.adults),
        format!("Children: {}", ticket.children),
        format!("Total Amount: Rs. {:.2}", ticket.total_amount),
        format!("Visitor: {}", ticket.visitor_name),
        format!("Status: {}", ticket.status),
    ];
    for line in lines {
        layer.use_text(line, 12.0, Mm(MARGIN), Mm(y), &regular);
        y -= 8.0;
    }

    y -= 10.0;
    centered(
        &layer,
        "Please present this ticket at the park entrance.",
        12.0,
        y,
        &regular,
    );

    doc.save_to_bytes().map_err(pdf_error)
}

/// Helvetica averages roughly half an em per glyph, close enough to centre a line.
fn centered(layer: &PdfLayerReference, text: &str, size: f32, y: f32, font: &IndirectFontRef) {
    let pt_to_mm = 25.4 / 72.0;
    let width = text.chars().count() as f32 * size * 0.5 * pt_to_mm;
    let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("Failed to render ticket PDF: {}", e))
}
