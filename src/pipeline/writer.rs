//! Digest persistence: the markdown file is always written, the PDF
//! rendition only when enabled.
//!
//! PDF generation via `printpdf` with builtin fonts. The markdown is first
//! parsed into flat blocks, then laid out top-down on A4 pages with simple
//! word wrapping and a page-number footer.

use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use printpdf::*;
use regex::Regex;

use super::error::WriterError;
use super::traits::DigestWriter;

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:-|\*)\s+(.*)$").unwrap());
static ORDERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

pub struct MarkdownWriter {
    markdown_dir: PathBuf,
    pdf_dir: PathBuf,
    output_pdf: bool,
}

impl MarkdownWriter {
    pub fn new(markdown_dir: impl Into<PathBuf>, pdf_dir: impl Into<PathBuf>, output_pdf: bool) -> Self {
        Self {
            markdown_dir: markdown_dir.into(),
            pdf_dir: pdf_dir.into(),
            output_pdf,
        }
    }

    fn write_pdf(&self, stem: &str, text: &str) -> Result<PathBuf, WriterError> {
        std::fs::create_dir_all(&self.pdf_dir)?;
        let pdf_path = self.pdf_dir.join(format!("{stem}.pdf"));
        let bytes = render_pdf(&parse_markdown_blocks(text))?;
        std::fs::write(&pdf_path, bytes)?;
        Ok(pdf_path)
    }
}

impl DigestWriter for MarkdownWriter {
    fn write(&self, run_date: NaiveDate, text: &str) -> Result<String, WriterError> {
        let stem = format!("{}_papers", run_date.format("%m%d"));

        // PDF first: a failed rendition must not leave an unrecorded markdown file.
        if self.output_pdf {
            let pdf_path = self.write_pdf(&stem, text)?;
            tracing::debug!(path = %pdf_path.display(), "PDF rendition written");
        }

        std::fs::create_dir_all(&self.markdown_dir)?;
        let markdown_path = self.markdown_dir.join(format!("{stem}.md"));
        std::fs::write(&markdown_path, text)?;

        Ok(path_string(&markdown_path))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ═══════════════════════════════════════════
// Markdown blocks
// ═══════════════════════════════════════════

/// Flat block structure of a markdown document, one entry per line
/// (fenced code collapses into a single block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownBlock {
    Heading1(String),
    Heading2(String),
    Heading3(String),
    ListItem(String),
    Paragraph(String),
    Code(String),
}

pub fn parse_markdown_blocks(text: &str) -> Vec<MarkdownBlock> {
    let mut blocks = Vec::new();
    let mut in_code = false;
    let mut code_lines: Vec<&str> = Vec::new();

    for raw in text.lines() {
        let stripped = raw.trim();

        if stripped.starts_with("```") {
            if in_code {
                blocks.push(MarkdownBlock::Code(code_lines.join("\n").trim_end().to_string()));
                code_lines.clear();
            }
            in_code = !in_code;
            continue;
        }

        if in_code {
            code_lines.push(raw);
            continue;
        }

        if stripped.is_empty() {
            continue;
        }

        let block = if let Some(rest) = stripped.strip_prefix("# ") {
            MarkdownBlock::Heading1(rest.trim().to_string())
        } else if let Some(rest) = stripped.strip_prefix("## ") {
            MarkdownBlock::Heading2(rest.trim().to_string())
        } else if let Some(rest) = stripped.strip_prefix("### ") {
            MarkdownBlock::Heading3(rest.trim().to_string())
        } else if let Some(caps) = BULLET.captures(stripped).or_else(|| ORDERED.captures(stripped)) {
            MarkdownBlock::ListItem(caps[1].trim().to_string())
        } else {
            MarkdownBlock::Paragraph(stripped.to_string())
        };
        blocks.push(block);
    }

    // Unterminated fence keeps its content.
    if in_code && !code_lines.is_empty() {
        blocks.push(MarkdownBlock::Code(code_lines.join("\n").trim_end().to_string()));
    }

    blocks
}

/// `[label](url)` becomes `label (url)`; backticks are dropped.
fn inline_text(text: &str) -> String {
    let linked = INLINE_LINK.replace_all(text, "$1 ($2)");
    INLINE_CODE.replace_all(&linked, "$1").into_owned()
}

// ─── PDF layout ───────────────────────────────────────────────────────────────

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 18.0;
const MARGIN_TOP: f32 = 16.0;
const MARGIN_BOTTOM: f32 = 18.0;
const FOOTER_Y: f32 = 10.0;

fn pdf_error(e: impl std::fmt::Display) -> WriterError {
    WriterError::Pdf(e.to_string())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
}

/// Current page, layer and vertical position; opens new pages on demand.
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: &'a Fonts,
    y: f32,
    page: usize,
}

impl PageCursor<'_> {
    fn draw_footer(&self) {
        self.layer.use_text(
            format!("Page {}", self.page),
            9.0,
            Mm(PAGE_WIDTH - MARGIN_LEFT - 12.0),
            Mm(FOOTER_Y),
            &self.fonts.regular,
        );
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= MARGIN_BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = PAGE_HEIGHT - MARGIN_TOP;
        self.draw_footer();
    }

    fn text_line(&mut self, text: &str, size: f32, leading: f32, indent: f32, font: &IndirectFontRef) {
        self.ensure_room(leading);
        self.y -= leading;
        self.layer.use_text(text, size, Mm(MARGIN_LEFT + indent), Mm(self.y), font);
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }
}

fn render_pdf(blocks: &[MarkdownBlock]) -> Result<Vec<u8>, WriterError> {
    let (doc, page1, layer1) =
        PdfDocument::new("Daily Paper Summary", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
        mono: doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?,
    };

    {
        let mut cursor = PageCursor {
            doc: &doc,
            layer: doc.get_page(page1).get_layer(layer1),
            fonts: &fonts,
            y: PAGE_HEIGHT - MARGIN_TOP,
            page: 1,
        };
        cursor.draw_footer();

        for block in blocks {
            match block {
                MarkdownBlock::Heading1(text) => {
                    for line in wrap_text(&inline_text(text), 55) {
                        cursor.text_line(&line, 18.0, 8.0, 0.0, &fonts.bold);
                    }
                    cursor.gap(4.0);
                }
                MarkdownBlock::Heading2(text) => {
                    for line in wrap_text(&inline_text(text), 70) {
                        cursor.text_line(&line, 14.0, 6.5, 0.0, &fonts.bold);
                    }
                    cursor.gap(2.5);
                }
                MarkdownBlock::Heading3(text) => {
                    for line in wrap_text(&inline_text(text), 85) {
                        cursor.text_line(&line, 12.0, 5.5, 0.0, &fonts.bold);
                    }
                    cursor.gap(1.5);
                }
                MarkdownBlock::ListItem(text) => {
                    for (i, line) in wrap_text(&inline_text(text), 90).iter().enumerate() {
                        let line = if i == 0 { format!("- {line}") } else { format!("  {line}") };
                        cursor.text_line(&line, 10.5, 5.0, 4.0, &fonts.regular);
                    }
                    cursor.gap(1.0);
                }
                MarkdownBlock::Paragraph(text) => {
                    for line in wrap_text(&inline_text(text), 95) {
                        cursor.text_line(&line, 10.5, 5.3, 0.0, &fonts.regular);
                    }
                    cursor.gap(3.0);
                }
                MarkdownBlock::Code(text) => {
                    for raw in text.lines() {
                        for line in wrap_text(raw, 95) {
                            cursor.text_line(&line, 9.0, 4.2, 2.0, &fonts.mono);
                        }
                    }
                    cursor.gap(3.0);
                }
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_error)?;
    buf.into_inner().map_err(pdf_error)
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, Summary};
    use crate::pipeline::render_markdown_digest;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 5).unwrap()
    }

    fn sample_summary(i: usize) -> Summary {
        Summary {
            external_id: format!("2602.0000{i}v1"),
            source: SourceKind::Arxiv,
            title: format!("Paper number {i}"),
            authors: vec!["Alice".into()],
            affiliations: vec![],
            link: format!("http://arxiv.org/abs/2602.0000{i}v1"),
            pdf_url: format!("http://arxiv.org/pdf/2602.0000{i}v1"),
            code_urls: vec![],
            problem: "A long problem statement. ".repeat(20),
            approach: "An approach.".into(),
            methodological_novelty: "Method.".into(),
            empirical_novelty: "Evidence.".into(),
            talk_track: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            relevance_score: 80.0,
            relevance_reason: "fits".into(),
        }
    }

    #[test]
    fn writes_markdown_named_by_run_date() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path().join("md"), dir.path().join("pdf"), false);

        let path = writer.write(date(), "# Hello\n").unwrap();

        assert_eq!(path, path_string(&dir.path().join("md").join("0205_papers.md")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Hello\n");
        assert!(!dir.path().join("pdf").exists());
    }

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("a").join("b").join("markdown");
        let writer = MarkdownWriter::new(&md, dir.path().join("pdf"), false);

        writer.write(date(), "text\n").unwrap();

        assert!(md.join("0205_papers.md").exists());
    }

    #[test]
    fn rewriting_same_date_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path(), dir.path(), false);

        writer.write(date(), "first\n").unwrap();
        let path = writer.write(date(), "second\n").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second\n");
    }

    #[test]
    fn pdf_rendition_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path().join("md"), dir.path().join("pdf"), true);
        let summaries: Vec<Summary> = (1..=6).map(sample_summary).collect();
        let text = render_markdown_digest(date(), &summaries);

        let path = writer.write(date(), &text).unwrap();

        assert!(path.ends_with("0205_papers.md"));
        let pdf = std::fs::read(dir.path().join("pdf").join("0205_papers.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn unwritable_markdown_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let writer = MarkdownWriter::new(blocker.join("md"), dir.path(), false);

        let err = writer.write(date(), "text").unwrap_err();
        assert!(matches!(err, WriterError::Io(_)));
    }

    #[test]
    fn failed_pdf_leaves_no_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let md = dir.path().join("md");
        let writer = MarkdownWriter::new(&md, blocker.join("pdf"), true);

        let err = writer.write(date(), "# Title\n").unwrap_err();

        assert!(matches!(err, WriterError::Io(_)));
        assert!(!md.join("0205_papers.md").exists());
    }

    #[test]
    fn parses_block_kinds() {
        let text = "\
# Title

## Paper 1: [X](http://x)
### Paper Information
- **Authors**: A
* star item
3. ordered item
Plain paragraph.
";
        let blocks = parse_markdown_blocks(text);
        assert_eq!(
            blocks,
            vec![
                MarkdownBlock::Heading1("Title".into()),
                MarkdownBlock::Heading2("Paper 1: [X](http://x)".into()),
                MarkdownBlock::Heading3("Paper Information".into()),
                MarkdownBlock::ListItem("**Authors**: A".into()),
                MarkdownBlock::ListItem("star item".into()),
                MarkdownBlock::ListItem("ordered item".into()),
                MarkdownBlock::Paragraph("Plain paragraph.".into()),
            ]
        );
    }

    #[test]
    fn parses_fenced_code() {
        let text = "before\n```rust\nfn main() {}\n    indented\n```\nafter";
        let blocks = parse_markdown_blocks(text);
        assert_eq!(
            blocks,
            vec![
                MarkdownBlock::Paragraph("before".into()),
                MarkdownBlock::Code("fn main() {}\n    indented".into()),
                MarkdownBlock::Paragraph("after".into()),
            ]
        );
    }

    #[test]
    fn unterminated_fence_keeps_code() {
        let blocks = parse_markdown_blocks("```\nline one\n");
        assert_eq!(blocks, vec![MarkdownBlock::Code("line one".into())]);
    }

    #[test]
    fn inline_links_and_code_flattened() {
        assert_eq!(inline_text("See [repo](https://github.com/a/b)."), "See repo (https://github.com/a/b).");
        assert_eq!(inline_text("Use `cargo` here"), "Use cargo here");
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("one two three four five six", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "one two three four five six");
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
