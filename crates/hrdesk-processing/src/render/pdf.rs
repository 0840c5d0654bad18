//! Minimal PDF 1.4 object writer.
//!
//! Emits one object at a time to an async writer while tracking byte offsets
//! for the cross-reference table. Only the standard Type1 fonts are used, so
//! no font data is embedded.

use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    /// Approximate advance width in thousandths of the font size
    fn glyph_width(&self, ch: char) -> f32 {
        let regular = match ch {
            ' ' | 'i' | 'j' | 'l' | 'I' | '!' | '.' | ',' | ':' | ';' | '|' | '\'' => 278.0,
            'f' | 't' | '(' | ')' | '[' | ']' | '/' | '-' => 333.0,
            'r' => 333.0,
            'm' | 'M' => 833.0,
            'W' => 944.0,
            'w' => 722.0,
            '%' => 889.0,
            '0'..='9' | '#' | '$' | '?' | '_' => 556.0,
            'A'..='Z' => 700.0,
            _ => 556.0,
        };
        match self {
            Font::Regular => regular,
            Font::Bold => regular * 1.06,
        }
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.glyph_width(c)).sum::<f32>() * size / 1000.0
    }
}

/// WinAnsiEncoding byte for a character outside ASCII, if the encoding has one
fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{A0}'..='\u{FF}' => ch as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Escape a string for a PDF literal.
///
/// The standard fonts are declared with WinAnsiEncoding, so accented Latin
/// characters are written as octal escapes of their byte in that encoding.
/// Anything the encoding lacks becomes `?`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(ch),
            _ => match win_ansi_byte(ch) {
                Some(byte) => out.push_str(&format!("\\{:03o}", byte)),
                None => out.push('?'),
            },
        }
    }
    out
}

/// Incremental writer for a document whose page count is known up front.
///
/// Object layout: 1 catalog, 2 page tree, 3-4 fonts, then a (page, contents)
/// pair per page.
pub struct PdfWriter<W> {
    writer: W,
    offset: u64,
    object_offsets: Vec<u64>,
    page_count: usize,
}

const FIRST_PAGE_OBJECT: usize = 5;

impl<W: AsyncWrite + Unpin> PdfWriter<W> {
    pub fn new(writer: W, page_count: usize) -> Self {
        Self {
            writer,
            offset: 0,
            object_offsets: Vec::new(),
            page_count,
        }
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    async fn write_object(&mut self, body: &[u8]) -> std::io::Result<()> {
        let id = self.object_offsets.len() + 1;
        self.object_offsets.push(self.offset);
        self.write_raw(format!("{} 0 obj\n", id).as_bytes()).await?;
        self.write_raw(body).await?;
        self.write_raw(b"\nendobj\n").await
    }

    /// Header, catalog, page tree and font resources
    pub async fn begin(&mut self) -> std::io::Result<()> {
        self.write_raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n").await?;
        self.write_object(b"<< /Type /Catalog /Pages 2 0 R >>").await?;

        let kids = (0..self.page_count)
            .map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + i * 2))
            .collect::<Vec<_>>()
            .join(" ");
        let pages = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids, self.page_count
        );
        self.write_object(pages.as_bytes()).await?;

        for font in [Font::Regular, Font::Bold] {
            let body = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            );
            self.write_object(body.as_bytes()).await?;
        }
        Ok(())
    }

    /// Write the next page with its content stream
    pub async fn write_page(&mut self, content: &str) -> std::io::Result<()> {
        let contents_id = self.object_offsets.len() + 2;
        let page = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT, contents_id
        );
        self.write_object(page.as_bytes()).await?;

        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content.as_bytes());
        stream.extend_from_slice(b"\nendstream");
        self.write_object(&stream).await
    }

    /// Cross-reference table and trailer. Returns the total byte count and the
    /// inner writer so the caller can flush and close it.
    pub async fn finish(mut self) -> std::io::Result<(u64, W)> {
        let xref_offset = self.offset;
        let size = self.object_offsets.len() + 1;

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for offset in &self.object_offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, xref_offset
        ));
        self.write_raw(xref.as_bytes()).await?;

        Ok((self.offset, self.writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a (b) \\ c"), "a \\(b\\) \\\\ c");
        assert_eq!(escape_text("Zoë"), "Zo\\353");
        assert_eq!(escape_text("Müller – €5"), "M\\374ller \\226 \\2005");
        assert_eq!(escape_text("café"), "caf\\351");
        assert_eq!(escape_text("日本"), "??");
        assert_eq!(escape_text("\u{A0}"), "\\240");
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = Font::Regular.text_width("Attendance", 10.0);
        let bold = Font::Bold.text_width("Attendance", 10.0);
        assert!(regular > 0.0);
        assert!(bold > regular);
    }

    #[tokio::test]
    async fn test_xref_offsets_point_at_objects() {
        let mut writer = PdfWriter::new(Vec::new(), 1);
        writer.begin().await.unwrap();
        writer.write_page("BT ET").await.unwrap();
        let (written, bytes) = writer.finish().await.unwrap();

        assert_eq!(written, bytes.len() as u64);
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/Count 1"));

        // Object 5 is the first page
        let xref_start = text.find("xref\n").unwrap();
        let entries: Vec<&str> = text[xref_start..].lines().skip(3).take(6).collect();
        let page_offset: usize = entries[4][..10].parse().unwrap();
        assert!(bytes[page_offset..].starts_with(b"5 0 obj"));
    }
}
