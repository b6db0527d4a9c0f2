//! Domain types: the tabular source and the slide-deck text tree.

use serde::{Deserialize, Serialize};

/// The tabular source: one header row and the data rows below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Placeholder tokens, one per column, in column order.
    pub headers: Vec<String>,

    /// Data rows in sheet order.
    pub rows: Vec<DataRow>,
}

impl Table {
    /// Create a table with the given header row and no data.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row. Its sheet row number follows the previous row
    /// (the first data row is sheet row 2, right below the headers).
    pub fn push_row(&mut self, values: Vec<CellValue>) {
        let number = self
            .rows
            .last()
            .map(|r| r.number + 1)
            .unwrap_or(FIRST_DATA_ROW);
        self.rows.push(DataRow::new(number, values));
    }

    /// Number of header columns.
    pub fn width(&self) -> usize {
        self.headers.len()
    }
}

/// Sheet row number of the first data row (row 1 holds the headers).
pub const FIRST_DATA_ROW: usize = 2;

/// One data row, positionally aligned with the header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    /// 1-based sheet row number.
    pub number: usize,

    /// Cell values in column order.
    pub values: Vec<CellValue>,
}

impl DataRow {
    /// Create a row with the given sheet number.
    pub fn new(number: usize, values: Vec<CellValue>) -> Self {
        Self { number, values }
    }

    /// True if every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| matches!(v, CellValue::Empty))
    }
}

/// A scalar spreadsheet value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// No value in the cell.
    Empty,
    /// Text, used verbatim.
    Text(String),
    /// Any numeric cell (dates included, as serial numbers).
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Spreadsheet error value such as `#N/A`.
    Error(String),
}

impl CellValue {
    /// Coerce the value to replacement text.
    ///
    /// Integral numbers print without a fractional part, so `42.0` becomes
    /// `"42"`. Error cells have no text form and are rejected.
    pub fn to_text(&self) -> std::result::Result<String, String> {
        match self {
            CellValue::Empty => Ok(String::new()),
            CellValue::Text(s) => Ok(s.clone()),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(true) => Ok("TRUE".to_string()),
            CellValue::Bool(false) => Ok("FALSE".to_string()),
            CellValue::Error(code) => Err(format!("cell holds the error value {}", code)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Largest magnitude printed as a plain integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn format_number(n: f64) -> std::result::Result<String, String> {
    if !n.is_finite() {
        return Err(format!("non-finite number {}", n));
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        Ok(format!("{}", n as i64))
    } else {
        Ok(format!("{}", n))
    }
}

/// The text tree of a slide deck: slide → shape → paragraph → run.
///
/// Backends build this from their document format and write run text back
/// on save. The merge engine only ever changes `Run::text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Create a deck from slides.
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

/// A single slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create an empty slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// All runs of all text-bearing shapes, in document order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.shapes
            .iter()
            .filter_map(|s| s.text_frame.as_ref())
            .flat_map(|tf| tf.paragraphs.iter())
            .flat_map(|p| p.runs.iter())
    }

    /// Plain text of the slide: shapes' paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.shapes
            .iter()
            .filter_map(|s| s.text_frame.as_ref())
            .flat_map(|tf| tf.paragraphs.iter().map(Paragraph::text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A drawable shape. Only shapes with a text frame take part in merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Shape name from the document, if any.
    pub name: String,

    /// The text container, absent for pictures, connectors and the like.
    pub text_frame: Option<TextFrame>,
}

impl Shape {
    /// A shape without a text frame.
    pub fn without_text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text_frame: None,
        }
    }

    /// A shape whose text frame holds the given paragraphs.
    pub fn with_paragraphs(name: impl Into<String>, paragraphs: Vec<Paragraph>) -> Self {
        Self {
            name: name.into(),
            text_frame: Some(TextFrame { paragraphs }),
        }
    }
}

/// A shape's text container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFrame {
    /// Paragraphs in order.
    pub paragraphs: Vec<Paragraph>,
}

/// A paragraph made of formatting runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Runs in order.
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Build a paragraph with one run per fragment.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            runs: fragments.into_iter().map(Run::new).collect(),
        }
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// The smallest unit of literal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// The literal text fragment.
    pub text: String,
}

impl Run {
    /// Create a run.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Formats the converter accepts or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Slide deck template (Office Open XML).
    Pptx,
    /// Page-based output.
    Pdf,
}

impl DocumentFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect format from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}
