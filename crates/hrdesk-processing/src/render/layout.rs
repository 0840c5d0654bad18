//! Page model and flow layout on A4 pages.
//!
//! Coordinates are PDF points with the origin at the bottom left. The cursor
//! walks down from the top margin; when a block does not fit above the footer
//! zone a new page is started.

use super::pdf::{escape_text, Font, PAGE_HEIGHT, PAGE_WIDTH};

pub const MARGIN: f32 = 40.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// Lowest y available to content; the footer lives below it.
pub const CONTENT_BOTTOM: f32 = 80.0;
const CONTENT_TOP: f32 = PAGE_HEIGHT - MARGIN;

pub type Rgb = (f32, f32, f32);

pub const BLACK: Rgb = (0.0, 0.0, 0.0);
pub const WHITE: Rgb = (1.0, 1.0, 1.0);
pub const BRAND: Rgb = (0.11, 0.23, 0.42);
pub const MUTED: Rgb = (0.42, 0.45, 0.5);
pub const PANEL: Rgb = (0.95, 0.96, 0.98);
pub const STRIPE: Rgb = (0.97, 0.97, 0.97);
pub const RULE: Rgb = (0.8, 0.82, 0.86);

/// Content stream of one page
#[derive(Debug, Default, Clone)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn content(&self) -> &str {
        &self.ops
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.ops.push_str(&format!(
            "{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re f\n",
            color.0, color.1, color.2, x, y, w, h
        ));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb) {
        self.ops.push_str(&format!(
            "{:.3} {:.3} {:.3} RG\n0.5 w\n{:.2} {:.2} m {:.2} {:.2} l S\n",
            color.0, color.1, color.2, x1, y1, x2, y2
        ));
    }

    /// Text with its baseline at `y`
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        self.ops.push_str(&format!(
            "{:.3} {:.3} {:.3} rg\nBT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            color.0,
            color.1,
            color.2,
            font.resource_name(),
            size,
            x,
            y,
            escape_text(text)
        ));
    }

    /// Text whose right edge sits at `right`
    pub fn text_right(&mut self, right: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let x = right - font.text_width(text, size);
        self.text(x, y, font, size, color, text);
    }

    pub fn text_centered(&mut self, center: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let x = center - font.text_width(text, size) / 2.0;
        self.text(x, y, font, size, color, text);
    }
}

/// Shorten `text` with a trailing "..." until it fits in `max_width`
pub fn fit_text(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if font.text_width(&candidate, size) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}

/// Sequence of laid-out pages plus the write cursor on the last one
pub struct Document {
    pages: Vec<Page>,
    cursor: f32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            cursor: CONTENT_TOP,
        }
    }

    pub fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Move the cursor down by `height`
    pub fn advance(&mut self, height: f32) {
        self.cursor -= height;
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = CONTENT_TOP;
    }

    /// Start a new page unless `height` fits below the cursor. Returns whether
    /// a page break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.cursor - height < CONTENT_BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut Page> {
        self.pages.iter_mut()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_text_truncates_with_ellipsis() {
        let long = "A very long department name that cannot fit";
        let fitted = fit_text(long, Font::Regular, 8.0, 60.0);
        assert!(fitted.ends_with("..."));
        assert!(Font::Regular.text_width(&fitted, 8.0) <= 60.0);
        assert_eq!(fit_text("Ada", Font::Regular, 8.0, 60.0), "Ada");
    }

    #[test]
    fn test_ensure_space_breaks_pages() {
        let mut doc = Document::new();
        assert!(!doc.ensure_space(100.0));
        doc.advance(CONTENT_TOP - CONTENT_BOTTOM - 10.0);
        assert!(doc.ensure_space(20.0));
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.cursor(), CONTENT_TOP);
    }
}
