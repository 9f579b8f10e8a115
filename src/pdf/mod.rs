//! PDF reports.
//!
//! `Composer` collects blocks (headings, paragraphs, tables), lays them out
//! on A4 pages, then draws them with the builtin Helvetica faces. Layout is
//! done before drawing so every footer can carry the final page count.

pub mod dashboard;
pub mod responses;
pub mod results;

use chrono::NaiveDateTime;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
/// Content stops above this line; the footer sits below it.
const CONTENT_BOTTOM: f32 = 22.0;
const FOOTER_Y: f32 = 12.0;
const PT_TO_MM: f32 = 0.3528;
/// Mean Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH: f32 = 0.5;
const LINE_SPACING: f32 = 1.35;

pub const CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug)]
pub enum PdfError {
    Font(String),
    Save(String),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::Font(e) => write!(f, "Unable to load PDF font: {}", e),
            PdfError::Save(e) => write!(f, "Unable to write PDF: {}", e),
        }
    }
}

impl std::error::Error for PdfError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
}

/// A run of text fixed to a position on a page.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub size: f32,
    pub face: Face,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug)]
enum Block {
    Text { text: String, size: f32, face: Face },
    Pair { key: String, value: String },
    Table { headers: Vec<String>, widths: Vec<f32>, rows: Vec<Vec<String>> },
    Space(f32),
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

fn chars_per_width(width: f32, size: f32) -> usize {
    ((width / (size * PT_TO_MM * AVG_GLYPH)).floor() as usize).max(1)
}

/// Greedy word wrap on an estimated glyph width. Words longer than a line
/// are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: String = word.to_owned();
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                lines.push(head);
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Moves to a new page when `height` does not fit above the footer.
fn reserve(pages: &mut Vec<Vec<PlacedText>>, y: &mut f32, height: f32) {
    if *y - height < CONTENT_BOTTOM {
        pages.push(Vec::new());
        *y = PAGE_HEIGHT - MARGIN_TOP;
    }
}

/// Builds a document block by block.
#[derive(Clone, Debug)]
pub struct Composer {
    title: String,
    blocks: Vec<Block>,
}

impl Composer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    fn text(&mut self, text: impl Into<String>, size: f32, face: Face) -> &mut Self {
        self.blocks.push(Block::Text {
            text: text.into(),
            size,
            face,
        });
        self
    }

    pub fn title(&mut self, text: impl Into<String>) -> &mut Self {
        self.text(text, 20.0, Face::Bold).space(2.0)
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.space(4.0).text(text, 15.0, Face::Bold).space(1.0)
    }

    pub fn subheading(&mut self, text: impl Into<String>) -> &mut Self {
        self.space(2.0).text(text, 12.0, Face::Bold)
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.text(text, 10.0, Face::Regular)
    }

    pub fn note(&mut self, text: impl Into<String>) -> &mut Self {
        self.text(text, 10.0, Face::Italic)
    }

    pub fn pair(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Pair {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// `widths` are fractions of the content width, one per column.
    pub fn table(&mut self, headers: &[&str], widths: &[f32], rows: Vec<Vec<String>>) -> &mut Self {
        self.blocks.push(Block::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            widths: widths.to_vec(),
            rows,
        });
        self.space(2.0)
    }

    pub fn space(&mut self, mm: f32) -> &mut Self {
        self.blocks.push(Block::Space(mm));
        self
    }

    /// Positions every block, breaking pages as needed.
    pub fn layout(&self) -> Vec<Vec<PlacedText>> {
        let content_width = PAGE_WIDTH - 2.0 * MARGIN_X;
        let mut pages: Vec<Vec<PlacedText>> = vec![Vec::new()];
        let mut y = PAGE_HEIGHT - MARGIN_TOP;

        for block in &self.blocks {
            match block {
                Block::Space(mm) => {
                    y -= mm;
                }
                Block::Text { text, size, face } => {
                    let height = line_height(*size);
                    for line in wrap(text, chars_per_width(content_width, *size)) {
                        reserve(&mut pages, &mut y, height);
                        y -= height;
                        if let Some(page) = pages.last_mut() {
                            page.push(PlacedText {
                                text: line,
                                size: *size,
                                face: *face,
                                x: MARGIN_X,
                                y,
                            });
                        }
                    }
                }
                Block::Pair { key, value } => {
                    let height = line_height(10.0);
                    reserve(&mut pages, &mut y, height);
                    y -= height;
                    let key_width = content_width * 0.4;
                    if let Some(page) = pages.last_mut() {
                        page.push(PlacedText {
                            text: clip(key, chars_per_width(key_width, 10.0)),
                            size: 10.0,
                            face: Face::Bold,
                            x: MARGIN_X,
                            y,
                        });
                        page.push(PlacedText {
                            text: clip(value, chars_per_width(content_width - key_width, 10.0)),
                            size: 10.0,
                            face: Face::Regular,
                            x: MARGIN_X + key_width,
                            y,
                        });
                    }
                }
                Block::Table {
                    headers,
                    widths,
                    rows,
                } => {
                    let height = line_height(10.0);
                    let columns: Vec<(f32, f32)> = widths
                        .iter()
                        .scan(MARGIN_X, |x, w| {
                            let start = *x;
                            let width = w * content_width;
                            *x += width;
                            Some((start, width))
                        })
                        .collect();

                    let place_row = |pages: &mut Vec<Vec<PlacedText>>,
                                         y: f32,
                                         cells: &[String],
                                         face: Face| {
                        if let Some(page) = pages.last_mut() {
                            for ((x, width), cell) in columns.iter().zip(cells) {
                                page.push(PlacedText {
                                    text: clip(cell, chars_per_width(width - 2.0, 10.0)),
                                    size: 10.0,
                                    face,
                                    x: *x,
                                    y,
                                });
                            }
                        }
                    };

                    reserve(&mut pages, &mut y, height * 2.0);
                    y -= height;
                    place_row(&mut pages, y, headers, Face::Bold);
                    for row in rows {
                        let before = pages.len();
                        reserve(&mut pages, &mut y, height);
                        if pages.len() != before {
                            // Repeat the header on continuation pages.
                            y -= height;
                            place_row(&mut pages, y, headers, Face::Bold);
                        }
                        y -= height;
                        place_row(&mut pages, y, row, Face::Regular);
                    }
                }
            }
        }

        pages
    }

    /// Draws the document and returns the file bytes.
    pub fn render(&self, generated_at: NaiveDateTime) -> Result<Vec<u8>, PdfError> {
        let pages = self.layout();
        let total = pages.len();

        let (doc, first_page, first_layer) =
            PdfDocument::new(&self.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| PdfError::Font(format!("{:?}", e)))
        };
        let regular = font(BuiltinFont::Helvetica)?;
        let bold = font(BuiltinFont::HelveticaBold)?;
        let italic = font(BuiltinFont::HelveticaOblique)?;
        let pick = |face: Face| -> &IndirectFontRef {
            match face {
                Face::Regular => &regular,
                Face::Bold => &bold,
                Face::Italic => &italic,
            }
        };

        let footer_stamp = generated_at.format("%Y-%m-%d %H:%M").to_string();
        for (number, placed) in pages.iter().enumerate() {
            let (page, layer) = if number == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(
                    Mm(PAGE_WIDTH),
                    Mm(PAGE_HEIGHT),
                    format!("Page {}, Layer 1", number + 1),
                )
            };
            let layer = doc.get_page(page).get_layer(layer);

            for text in placed {
                layer.use_text(
                    text.text.clone(),
                    text.size,
                    Mm(text.x),
                    Mm(text.y),
                    pick(text.face),
                );
            }
            layer.use_text(
                format!(
                    "Generated on {} | Page {} of {}",
                    footer_stamp,
                    number + 1,
                    total
                ),
                8.0,
                Mm(MARGIN_X),
                Mm(FOOTER_Y),
                &regular,
            );
        }

        doc.save_to_bytes()
            .map_err(|e| PdfError::Save(format!("{:?}", e)))
    }
}

/// Keeps letters, digits, `-` and `_`; other runs become one `-`.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::new();
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-').to_owned();
    if out.is_empty() {
        "Survey".to_owned()
    } else {
        out
    }
}

/// `Survey-Results-{title}-{YYYYMMDD}.pdf` and friends.
pub fn filename(prefix: &str, title: Option<&str>, date: NaiveDateTime) -> String {
    let stamp = date.format("%Y%m%d");
    match title {
        Some(title) => format!("{}-{}-{}.pdf", prefix, sanitize_filename(title), stamp),
        None => format!("{}-{}.pdf", prefix, stamp),
    }
}
