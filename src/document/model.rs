//! Declarative page description handed to a PDF (or any 2-D) renderer
//!
//! All coordinates are millimetres from the top-left corner of an A4 portrait
//! page; font sizes are points. Tables arrive fully laid out: every row
//! carries its wrapped lines and final height, so a renderer only draws.

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 15.0;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cbor(array)]
pub struct Rgb(#[n(0)] pub u8, #[n(1)] pub u8, #[n(2)] pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn gray(level: u8) -> Self {
        Rgb(level, level, level)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[n(0)]
    #[default]
    Normal,
    #[n(1)]
    Bold,
    #[n(2)]
    Italic,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Align {
    #[n(0)]
    #[default]
    Left,
    #[n(1)]
    Center,
    #[n(2)]
    Right,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    #[n(0)]
    pub font_style: FontStyle,
    #[n(1)]
    pub size: f32,
    #[n(2)]
    pub align: Align,
    #[n(3)]
    pub color: Rgb,
}

impl TextStyle {
    pub fn normal(size: f32) -> Self {
        Self {
            font_style: FontStyle::Normal,
            size,
            align: Align::Left,
            color: Rgb::BLACK,
        }
    }
    pub fn bold(size: f32) -> Self {
        Self {
            font_style: FontStyle::Bold,
            ..Self::normal(size)
        }
    }
    pub fn italic(size: f32) -> Self {
        Self {
            font_style: FontStyle::Italic,
            ..Self::normal(size)
        }
    }
    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
    pub fn colored(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    #[n(0)]
    pub width: f32,
    #[n(1)]
    pub color: Rgb,
}

impl Stroke {
    pub fn black(width: f32) -> Self {
        Self {
            width,
            color: Rgb::BLACK,
        }
    }
}

/// Fully resolved style of one table cell.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    #[n(0)]
    pub font_style: FontStyle,
    #[n(1)]
    pub size: f32,
    #[n(2)]
    pub halign: Align,
    #[n(3)]
    pub text_color: Rgb,
    #[n(4)]
    pub fill: Option<Rgb>,
    #[n(5)]
    pub line_width: f32,
    #[n(6)]
    pub padding: f32,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            font_style: FontStyle::Normal,
            size: 10.0,
            halign: Align::Left,
            text_color: Rgb::BLACK,
            fill: None,
            line_width: 0.1,
            padding: 1.75,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Cell {
    #[n(0)]
    pub lines: Vec<String>,
    #[n(1)]
    pub style: CellStyle,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Row {
    #[n(0)]
    pub cells: Vec<Cell>,
    #[n(1)]
    pub height: f32,
}

impl Row {
    /// Text of each cell, lines joined with `\n`.
    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|cell| cell.lines.join("\n")).collect()
    }
}

/// The slice of a table that landed on one page.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Table {
    #[n(0)]
    pub x: f32,
    #[n(1)]
    pub y: f32,
    #[n(2)]
    pub column_widths: Vec<f32>,
    #[n(3)]
    pub head: Vec<Row>,
    #[n(4)]
    pub body: Vec<Row>,
    #[n(5)]
    pub foot: Vec<Row>,
}

impl Table {
    pub fn height(&self) -> f32 {
        self.head
            .iter()
            .chain(&self.body)
            .chain(&self.foot)
            .map(|row| row.height)
            .sum()
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub enum Element {
    #[n(0)]
    Text {
        #[n(0)]
        x: f32,
        #[n(1)]
        y: f32,
        #[n(2)]
        text: String,
        #[n(3)]
        style: TextStyle,
    },
    #[n(1)]
    Rect {
        #[n(0)]
        x: f32,
        #[n(1)]
        y: f32,
        #[n(2)]
        width: f32,
        #[n(3)]
        height: f32,
        #[n(4)]
        stroke: Stroke,
    },
    #[n(2)]
    Line {
        #[n(0)]
        from: (f32, f32),
        #[n(1)]
        to: (f32, f32),
        #[n(2)]
        stroke: Stroke,
    },
    #[n(3)]
    Image {
        #[n(0)]
        source: String, // path or url, resolved by the renderer
        #[n(1)]
        x: f32,
        #[n(2)]
        y: f32,
        #[n(3)]
        width: f32,
        #[n(4)]
        height: f32,
    },
    #[n(4)]
    Table(#[n(0)] Table),
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq)]
pub struct Page {
    #[n(0)]
    pub elements: Vec<Element>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Document {
    #[n(0)]
    pub file_name: String,
    #[n(1)]
    pub pages: Vec<Page>,
}

impl Document {
    pub fn to_cbor(&self) -> anyhow::Result<Vec<u8>> {
        Ok(minicbor::to_vec(self)?)
    }

    /// sha256 of the CBOR encoding. Equal documents have equal fingerprints.
    pub fn fingerprint(&self) -> anyhow::Result<String> {
        Ok(sha256::digest(&self.to_cbor()?))
    }

    /// Every text run on every page, in drawing order, table cells included.
    pub fn texts(&self) -> Vec<String> {
        let mut out = vec![];
        for element in self.pages.iter().flat_map(|page| &page.elements) {
            match element {
                Element::Text { text, .. } => out.push(text.clone()),
                Element::Table(table) => {
                    for row in table.head.iter().chain(&table.body).chain(&table.foot) {
                        out.extend(row.cells.iter().flat_map(|cell| cell.lines.iter().cloned()));
                    }
                }
                _ => {}
            }
        }
        out
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.pages
            .iter()
            .flat_map(|page| &page.elements)
            .filter_map(|element| match element {
                Element::Table(table) => Some(table),
                _ => None,
            })
    }
}
