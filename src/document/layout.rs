//! Text measurement, cell styling and page flow
//!
//! Widths are estimated from an average glyph width of half an em, which is
//! close enough for the Times base font and keeps layout deterministic
//! without font metrics.
use super::model::{
    Align, CellStyle, Cell, Document, Element, FontStyle, MARGIN, PAGE_HEIGHT, Page, Rgb, Row,
    Table,
};

pub const PT_TO_MM: f32 = 25.4 / 72.0;
const LINE_HEIGHT_FACTOR: f32 = 1.15;
const CHAR_WIDTH_EM: f32 = 0.5;

pub fn char_width(size: f32) -> f32 {
    size * PT_TO_MM * CHAR_WIDTH_EM
}

pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * char_width(size)
}

pub fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_HEIGHT_FACTOR
}

/// Greedy word wrap to `max_width` millimetres at `size` points.
///
/// Explicit `\n` always breaks. Words longer than a whole line are split.
/// Always returns at least one (possibly empty) line.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / char_width(size)).floor() as usize).max(1);
    let mut lines = vec![];

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            let mut rest = &chars[..];

            while rest.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                lines.push(rest[..max_chars].iter().collect());
                rest = &rest[max_chars..];
            }
            if rest.is_empty() {
                continue;
            }

            let needed = if current_len == 0 {
                rest.len()
            } else {
                current_len + 1 + rest.len()
            };
            if needed <= max_chars {
                if current_len > 0 {
                    current.push(' ');
                }
                current.extend(rest);
                current_len = needed;
            } else {
                lines.push(std::mem::replace(&mut current, rest.iter().collect()));
                current_len = rest.len();
            }
        }
        lines.push(current);
    }
    lines
}

/// Partial cell style; set fields win over whatever they are applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverride {
    pub font_style: Option<FontStyle>,
    pub size: Option<f32>,
    pub halign: Option<Align>,
    pub text_color: Option<Rgb>,
    pub fill: Option<Rgb>,
    pub line_width: Option<f32>,
    pub padding: Option<f32>,
}

impl StyleOverride {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn bold(mut self) -> Self {
        self.font_style = Some(FontStyle::Bold);
        self
    }
    pub fn normal(mut self) -> Self {
        self.font_style = Some(FontStyle::Normal);
        self
    }
    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }
    pub fn align(mut self, align: Align) -> Self {
        self.halign = Some(align);
        self
    }
    pub fn color(mut self, color: Rgb) -> Self {
        self.text_color = Some(color);
        self
    }
    pub fn fill(mut self, fill: Rgb) -> Self {
        self.fill = Some(fill);
        self
    }
    pub fn line_width(mut self, width: f32) -> Self {
        self.line_width = Some(width);
        self
    }
    pub fn padding(mut self, padding: f32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn apply(&self, base: CellStyle) -> CellStyle {
        CellStyle {
            font_style: self.font_style.unwrap_or(base.font_style),
            size: self.size.unwrap_or(base.size),
            halign: self.halign.unwrap_or(base.halign),
            text_color: self.text_color.unwrap_or(base.text_color),
            fill: self.fill.or(base.fill),
            line_width: self.line_width.unwrap_or(base.line_width),
            padding: self.padding.unwrap_or(base.padding),
        }
    }
}

/// One unlaid cell: its text and an optional per-cell override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellInput {
    pub text: String,
    pub style: StyleOverride,
}

impl CellInput {
    pub fn styled(text: impl Into<String>, style: StyleOverride) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

impl From<&str> for CellInput {
    fn from(text: &str) -> Self {
        Self::styled(text, StyleOverride::default())
    }
}

impl From<String> for CellInput {
    fn from(text: String) -> Self {
        Self::styled(text, StyleOverride::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Head,
    Body,
    Foot,
}

/// Column geometry and the style cascade of one table. Styles resolve as
/// `base`, then the section style, then the column style (body rows only),
/// then the cell's own override.
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    pub x: f32,
    pub column_widths: Vec<f32>,
    pub base: CellStyle,
    pub head_style: StyleOverride,
    pub body_style: StyleOverride,
    pub foot_style: StyleOverride,
    pub column_styles: Vec<StyleOverride>,
}

impl TableSpec {
    pub fn new(x: f32, column_widths: Vec<f32>) -> Self {
        Self {
            x,
            column_widths,
            ..Self::default()
        }
    }

    pub fn width(&self) -> f32 {
        self.column_widths.iter().sum()
    }

    fn cell_style(&self, section: Section, column: usize, cell: &StyleOverride) -> CellStyle {
        let section_style = match section {
            Section::Head => &self.head_style,
            Section::Body => &self.body_style,
            Section::Foot => &self.foot_style,
        };
        let mut style = section_style.apply(self.base);
        if section == Section::Body {
            if let Some(column_style) = self.column_styles.get(column) {
                style = column_style.apply(style);
            }
        }
        cell.apply(style)
    }

    /// Wrap every cell to its column and size the row to its tallest cell.
    pub fn layout_row(&self, section: Section, cells: &[CellInput]) -> Row {
        let cells: Vec<Cell> = cells
            .iter()
            .enumerate()
            .map(|(column, input)| {
                let style = self.cell_style(section, column, &input.style);
                let width = self.column_widths.get(column).copied().unwrap_or(0.0);
                let lines = wrap_text(&input.text, width - 2.0 * style.padding, style.size);
                Cell { lines, style }
            })
            .collect();
        let height = cells
            .iter()
            .map(|cell| cell.lines.len() as f32 * line_height(cell.style.size) + 2.0 * cell.style.padding)
            .fold(0.0, f32::max);
        Row { cells, height }
    }
}

/// Vertical cursor over a growing list of pages.
#[derive(Debug, Clone)]
pub struct Flow {
    pages: Vec<Page>,
    pub y: f32,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl Flow {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN,
        }
    }

    pub fn bottom() -> f32 {
        PAGE_HEIGHT - MARGIN
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN;
    }

    /// Break to a new page unless `height` more millimetres fit below `y`.
    pub fn ensure_space(&mut self, height: f32) {
        if self.y + height > Self::bottom() {
            self.new_page();
        }
    }

    /// Lay a table out from `start_y`, continuing onto new pages as needed
    /// with the head repeated. Leaves `y` just below the table and returns it.
    pub fn table(
        &mut self,
        spec: &TableSpec,
        head: &[Vec<CellInput>],
        body: &[Vec<CellInput>],
        foot: &[Vec<CellInput>],
        start_y: f32,
    ) -> f32 {
        let head: Vec<Row> = head.iter().map(|r| spec.layout_row(Section::Head, r)).collect();
        let body: Vec<Row> = body.iter().map(|r| spec.layout_row(Section::Body, r)).collect();
        let foot: Vec<Row> = foot.iter().map(|r| spec.layout_row(Section::Foot, r)).collect();
        let head_height: f32 = head.iter().map(|row| row.height).sum();
        let foot_height: f32 = foot.iter().map(|row| row.height).sum();

        self.y = start_y;
        let first_row = body.first().map(|row| row.height).unwrap_or(foot_height);
        self.ensure_space(head_height + first_row);

        let slice = |y: f32| Table {
            x: spec.x,
            y,
            column_widths: spec.column_widths.clone(),
            head: head.clone(),
            body: vec![],
            foot: vec![],
        };
        let mut current = slice(self.y);
        let mut used = head_height;

        for row in body {
            if self.y + used + row.height > Self::bottom() && !current.body.is_empty() {
                self.push(Element::Table(std::mem::replace(&mut current, slice(MARGIN))));
                self.new_page();
                used = head_height;
            }
            used += row.height;
            current.body.push(row);
        }

        if self.y + used + foot_height > Self::bottom() && !current.body.is_empty() {
            self.push(Element::Table(std::mem::replace(&mut current, slice(MARGIN))));
            self.new_page();
            used = head_height;
        }
        used += foot_height;
        current.foot = foot;
        self.push(Element::Table(current));

        self.y += used;
        self.y
    }

    pub fn finish(self, file_name: String) -> Document {
        Document {
            file_name,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_word_boundaries() {
        // 10pt: ~1.76mm per glyph, 20mm holds 11 glyphs
        let lines = wrap_text("heavy machinery export", 20.0, 10.0);
        assert_eq!(lines, vec!["heavy", "machinery", "export"]);
        for line in &lines {
            assert!(text_width(line, 10.0) <= 20.0);
        }
    }

    #[test]
    fn explicit_newlines_break() {
        assert_eq!(wrap_text("1\nUnits", 100.0, 8.0), vec!["1", "Units"]);
        assert_eq!(wrap_text("", 100.0, 8.0), vec![""]);
    }

    #[test]
    fn long_words_are_split() {
        let lines = wrap_text("ABCDEFGHIJKLMNOPQRSTUVWXYZ", 10.0, 10.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn cell_override_beats_column_and_section() {
        let mut spec = TableSpec::new(15.0, vec![50.0, 50.0]);
        spec.body_style = StyleOverride::new().size(8.0);
        spec.column_styles = vec![StyleOverride::new().bold().align(Align::Center)];

        let green = Rgb(0, 100, 0);
        let row = spec.layout_row(
            Section::Body,
            &[
                CellInput::styled("+ 5,000", StyleOverride::new().color(green)),
                "plain".into(),
            ],
        );
        let first = row.cells[0].style;
        assert_eq!(first.size, 8.0);
        assert_eq!(first.font_style, FontStyle::Bold);
        assert_eq!(first.halign, Align::Center);
        assert_eq!(first.text_color, green);
        assert_eq!(row.cells[1].style.font_style, FontStyle::Normal);

        // column styles do not reach the head
        let head = spec.layout_row(Section::Head, &["A".into(), "B".into()]);
        assert_eq!(head.cells[0].style.font_style, FontStyle::Normal);
    }

    #[test]
    fn row_height_follows_tallest_cell() {
        let spec = TableSpec::new(15.0, vec![30.0, 30.0]);
        let one = spec.layout_row(Section::Body, &["a".into(), "b".into()]);
        let three = spec.layout_row(Section::Body, &["a\nb\nc".into(), "b".into()]);
        assert!(three.height > one.height * 2.0);
    }

    #[test]
    fn long_tables_continue_with_head_repeated() {
        let spec = TableSpec::new(15.0, vec![90.0, 90.0]);
        let head = vec![vec![CellInput::from("DATE"), CellInput::from("AMOUNT")]];
        let body: Vec<Vec<CellInput>> = (0..120)
            .map(|i| vec![CellInput::from(format!("row {i}")), CellInput::from("1")])
            .collect();
        let foot = vec![vec![CellInput::from("TOTAL"), CellInput::from("120")]];

        let mut flow = Flow::new();
        let end = flow.table(&spec, &head, &body, &foot, 90.0);
        assert!(flow.page_count() > 1);
        assert!(end <= Flow::bottom());

        let doc = flow.finish("t.pdf".into());
        let slices: Vec<&Table> = doc.tables().collect();
        assert_eq!(slices.len(), doc.pages.len());
        assert!(slices.iter().all(|t| t.head[0].texts() == vec!["DATE", "AMOUNT"]));
        assert_eq!(slices.iter().map(|t| t.body.len()).sum::<usize>(), 120);
        assert!(slices[..slices.len() - 1].iter().all(|t| t.foot.is_empty()));
        assert_eq!(slices[slices.len() - 1].foot.len(), 1);
        for table in &slices {
            assert!(table.y + table.height() <= Flow::bottom() + 0.001);
        }
    }
}
