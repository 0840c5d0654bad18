use super::layout::{
    fit_text, Document, Page, BLACK, BRAND, CONTENT_WIDTH, MARGIN, MUTED, PANEL, RULE, STRIPE,
    WHITE,
};
use super::pdf::{Font, PdfWriter, PAGE_WIDTH};
use crate::aggregate::{AggregatedReportData, Summary};
use crate::error::ReportError;
use crate::registry::ReportDefinition;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

const CONFIDENTIAL_NOTICE: &str = "Confidential - for internal use only";
const MAX_KPI_CARDS: usize = 4;

/// KPI cards in priority order. A card is shown only if its key is in the summary.
const KPI_CANDIDATES: &[(&str, &str)] = &[
    ("attendanceRate", "Attendance Rate"),
    ("totalWorkingHours", "Working Hours"),
    ("approvalRate", "Approval Rate"),
    ("totalLeaveDays", "Leave Days"),
    ("totalNetSalary", "Net Payroll"),
    ("averageNetSalary", "Average Net"),
    ("averageRating", "Average Rating"),
    ("excellentCount", "Excellent Ratings"),
    ("totalRecords", "Total Records"),
];

const ROW_HEIGHT: f32 = 16.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const CELL_PADDING: f32 = 4.0;
const SUMMARY_LINE_HEIGHT: f32 = 16.0;

/// Per-request values shown in the masthead and metadata panel
#[derive(Debug, Clone)]
pub struct RenderMetadata {
    pub title: String,
    pub requested_by: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    organization: String,
}

/// Up to four (label, value) cards backed by present summary keys
pub fn kpi_cards(summary: &Summary) -> Vec<(&'static str, String)> {
    KPI_CANDIDATES
        .iter()
        .filter_map(|(key, label)| summary.get(key).map(|v| (*label, v.to_string())))
        .take(MAX_KPI_CARDS)
        .collect()
}

/// "attendanceRate" -> "Attendance Rate"
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_ascii_uppercase() {
            out.push(' ');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out
}

struct TableSpec<'a> {
    headers: Vec<&'a str>,
    widths: Vec<f32>,
}

impl<'a> TableSpec<'a> {
    /// Scale relative weights to the content width
    fn new(headers: Vec<&'a str>, weights: Vec<f32>) -> Self {
        let total: f32 = weights.iter().sum::<f32>().max(f32::EPSILON);
        let widths = weights.iter().map(|w| w / total * CONTENT_WIDTH).collect();
        Self { headers, widths }
    }

    fn draw_header(&self, doc: &mut Document) {
        let top = doc.cursor();
        let page = doc.page();
        page.fill_rect(MARGIN, top - ROW_HEIGHT, CONTENT_WIDTH, ROW_HEIGHT, BRAND);
        let mut x = MARGIN;
        for (header, width) in self.headers.iter().zip(&self.widths) {
            let text = fit_text(header, Font::Bold, TABLE_FONT_SIZE, width - 2.0 * CELL_PADDING);
            page.text(x + CELL_PADDING, top - 11.0, Font::Bold, TABLE_FONT_SIZE, WHITE, &text);
            x += width;
        }
        doc.advance(ROW_HEIGHT);
    }

    fn draw_row(&self, doc: &mut Document, cells: &[String], striped: bool) {
        let top = doc.cursor();
        let page = doc.page();
        if striped {
            page.fill_rect(MARGIN, top - ROW_HEIGHT, CONTENT_WIDTH, ROW_HEIGHT, STRIPE);
        }
        let mut x = MARGIN;
        for (i, width) in self.widths.iter().enumerate() {
            let raw = cells.get(i).map(String::as_str).unwrap_or("N/A");
            let text = fit_text(raw, Font::Regular, TABLE_FONT_SIZE, width - 2.0 * CELL_PADDING);
            page.text(x + CELL_PADDING, top - 11.0, Font::Regular, TABLE_FONT_SIZE, BLACK, &text);
            x += width;
        }
        doc.advance(ROW_HEIGHT);
    }

    /// Header plus rows. The header is repeated at the top of every page the
    /// table continues on.
    fn draw(&self, doc: &mut Document, rows: impl Iterator<Item = Vec<String>>) {
        doc.ensure_space(ROW_HEIGHT * 2.0);
        self.draw_header(doc);
        for (i, cells) in rows.enumerate() {
            if doc.ensure_space(ROW_HEIGHT) {
                self.draw_header(doc);
            }
            self.draw_row(doc, &cells, i % 2 == 1);
        }
    }
}

impl ReportRenderer {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
        }
    }

    /// Lay out every page, including the footer pass
    pub fn layout(
        &self,
        data: &AggregatedReportData,
        meta: &RenderMetadata,
        definition: &ReportDefinition,
    ) -> Vec<Page> {
        let mut doc = Document::new();
        self.draw_masthead(&mut doc, meta);
        self.draw_metadata(&mut doc, data, meta);
        self.draw_summary(&mut doc, &data.summary);
        self.draw_kpis(&mut doc, &data.summary);
        self.draw_details(&mut doc, data, definition);
        self.draw_breakdowns(&mut doc, data);
        self.stamp_footers(&mut doc, meta);
        doc.into_pages()
    }

    /// Render `data` as a PDF into `writer`. Completes only after the writer
    /// has been flushed and shut down. Returns the number of bytes written.
    #[tracing::instrument(skip_all, fields(report.type = %data.report_type, pages = tracing::field::Empty))]
    pub async fn render<W>(
        &self,
        data: &AggregatedReportData,
        meta: &RenderMetadata,
        definition: &ReportDefinition,
        writer: W,
    ) -> Result<u64, ReportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let pages = self.layout(data, meta, definition);
        tracing::Span::current().record("pages", pages.len());

        let mut pdf = PdfWriter::new(writer, pages.len());
        pdf.begin().await?;
        for page in &pages {
            pdf.write_page(page.content()).await?;
        }
        let (written, mut writer) = pdf.finish().await?;
        writer.flush().await?;
        writer.shutdown().await?;

        tracing::debug!(bytes = written, "Report document written");
        Ok(written)
    }

    fn draw_masthead(&self, doc: &mut Document, meta: &RenderMetadata) {
        const BAND_HEIGHT: f32 = 64.0;
        let top = doc.cursor();
        let page = doc.page();
        page.fill_rect(MARGIN, top - BAND_HEIGHT, CONTENT_WIDTH, BAND_HEIGHT, BRAND);
        let org = fit_text(&self.organization, Font::Bold, 18.0, CONTENT_WIDTH - 24.0);
        page.text(MARGIN + 12.0, top - 26.0, Font::Bold, 18.0, WHITE, &org);
        let title = fit_text(&meta.title, Font::Regular, 12.0, CONTENT_WIDTH - 24.0);
        page.text(MARGIN + 12.0, top - 48.0, Font::Regular, 12.0, WHITE, &title);
        doc.advance(BAND_HEIGHT + 14.0);
    }

    fn draw_metadata(&self, doc: &mut Document, data: &AggregatedReportData, meta: &RenderMetadata) {
        let fields = [
            (
                "Generated",
                meta.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
            ("Period", data.period.clone()),
            ("Report Type", data.report_type.label().to_string()),
            ("Requested By", meta.requested_by.clone()),
            ("Scope", data.scope.clone()),
            ("Total Records", data.total_records.to_string()),
        ];
        self.draw_panel(doc, None, fields.iter().map(|(l, v)| (l.to_string(), v.clone())));
    }

    fn draw_summary(&self, doc: &mut Document, summary: &Summary) {
        self.draw_panel(
            doc,
            Some("Executive Summary"),
            summary
                .entries()
                .map(|(k, v)| (humanize_key(k), v.to_string())),
        );
    }

    /// Two-column label/value panel. Height follows from the entry count.
    fn draw_panel(
        &self,
        doc: &mut Document,
        heading: Option<&str>,
        entries: impl Iterator<Item = (String, String)>,
    ) {
        let entries: Vec<(String, String)> = entries.collect();
        let rows = entries.len().div_ceil(2);
        let panel_height = rows as f32 * SUMMARY_LINE_HEIGHT + 12.0;
        let heading_height = if heading.is_some() { 22.0 } else { 0.0 };

        doc.ensure_space(heading_height + panel_height);
        if let Some(heading) = heading {
            let y = doc.cursor() - 14.0;
            doc.page().text(MARGIN, y, Font::Bold, 13.0, BRAND, heading);
            doc.advance(heading_height);
        }

        let top = doc.cursor();
        let column_width = CONTENT_WIDTH / 2.0;
        let page = doc.page();
        page.fill_rect(MARGIN, top - panel_height, CONTENT_WIDTH, panel_height, PANEL);
        for (i, (label, value)) in entries.iter().enumerate() {
            let x = MARGIN + 10.0 + (i % 2) as f32 * column_width;
            let y = top - 6.0 - (i / 2) as f32 * SUMMARY_LINE_HEIGHT - 11.0;
            let label = fit_text(label, Font::Regular, 9.0, 110.0);
            page.text(x, y, Font::Regular, 9.0, MUTED, &label);
            let value = fit_text(value, Font::Bold, 9.0, column_width - 130.0);
            page.text(x + 115.0, y, Font::Bold, 9.0, BLACK, &value);
        }
        doc.advance(panel_height + 14.0);
    }

    fn draw_kpis(&self, doc: &mut Document, summary: &Summary) {
        const CARD_HEIGHT: f32 = 56.0;
        const GAP: f32 = 10.0;

        let cards = kpi_cards(summary);
        if cards.is_empty() {
            return;
        }
        doc.ensure_space(CARD_HEIGHT + 14.0);
        let top = doc.cursor();
        let card_width = (CONTENT_WIDTH - GAP * (MAX_KPI_CARDS as f32 - 1.0)) / MAX_KPI_CARDS as f32;
        let page = doc.page();
        for (i, (label, value)) in cards.iter().enumerate() {
            let x = MARGIN + i as f32 * (card_width + GAP);
            page.fill_rect(x, top - CARD_HEIGHT, card_width, CARD_HEIGHT, PANEL);
            page.fill_rect(x, top - CARD_HEIGHT, 3.0, CARD_HEIGHT, BRAND);
            let value = fit_text(value, Font::Bold, 15.0, card_width - 16.0);
            page.text(x + 10.0, top - 26.0, Font::Bold, 15.0, BRAND, &value);
            page.text(x + 10.0, top - 44.0, Font::Regular, 8.0, MUTED, label);
        }
        doc.advance(CARD_HEIGHT + 14.0);
    }

    fn section_heading(&self, doc: &mut Document, title: &str, caption: Option<&str>) {
        let height = if caption.is_some() { 34.0 } else { 22.0 };
        doc.ensure_space(height + ROW_HEIGHT * 2.0);
        let y = doc.cursor() - 14.0;
        let page = doc.page();
        page.text(MARGIN, y, Font::Bold, 13.0, BRAND, title);
        if let Some(caption) = caption {
            page.text(MARGIN, y - 13.0, Font::Regular, 8.0, MUTED, caption);
        }
        doc.advance(height);
    }

    fn draw_details(
        &self,
        doc: &mut Document,
        data: &AggregatedReportData,
        definition: &ReportDefinition,
    ) {
        let caption = format!(
            "Showing {} of {} records",
            data.details.len(),
            data.total_records
        );
        self.section_heading(doc, "Details", Some(&caption));

        if data.details.is_empty() {
            let y = doc.cursor() - 12.0;
            doc.page().text(
                MARGIN,
                y,
                Font::Regular,
                9.0,
                MUTED,
                "No records found for the selected period.",
            );
            doc.advance(24.0);
            return;
        }

        let table = TableSpec::new(
            definition.columns.iter().map(|c| c.header).collect(),
            definition.columns.iter().map(|c| c.width).collect(),
        );
        table.draw(doc, data.details.iter().map(|row| (definition.format_row)(row)));
        doc.advance(14.0);
    }

    fn draw_breakdowns(&self, doc: &mut Document, data: &AggregatedReportData) {
        for breakdown in &data.breakdowns {
            self.section_heading(doc, &breakdown.title, None);
            let table = TableSpec::new(
                breakdown.columns.clone(),
                vec![1.0; breakdown.columns.len()],
            );
            table.draw(doc, breakdown.rows.iter().cloned());
            doc.advance(14.0);
        }
    }

    /// Needs the final page count, so it runs after everything else is laid out
    fn stamp_footers(&self, doc: &mut Document, meta: &RenderMetadata) {
        let total = doc.page_count();
        let generated = format!("Generated {}", meta.generated_at.format("%Y-%m-%d"));
        for (i, page) in doc.pages_mut().enumerate() {
            page.line(MARGIN, 58.0, PAGE_WIDTH - MARGIN, 58.0, RULE);
            page.text(MARGIN, 44.0, Font::Regular, 8.0, MUTED, CONFIDENTIAL_NOTICE);
            page.text_centered(PAGE_WIDTH / 2.0, 44.0, Font::Regular, 8.0, MUTED, &generated);
            page.text_right(
                PAGE_WIDTH - MARGIN,
                44.0,
                Font::Regular,
                8.0,
                MUTED,
                &format!("Page {} of {}", i + 1, total),
            );
        }
    }
}
