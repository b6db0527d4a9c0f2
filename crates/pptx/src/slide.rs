//! Slide XML ↔ text tree.
//!
//! Parsing and rewriting walk the XML with the same [`TreeWalker`], so the
//! n-th run found while parsing is the n-th run written back on save.

use mailmerge_core::{Error, Paragraph, Result, Run, Shape, Slide, TextFrame};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Elements that are shapes when they sit directly in `p:spTree`.
const SHAPE_ELEMENTS: &[&[u8]] = &[b"sp", b"pic", b"graphicFrame", b"grpSp", b"cxnSp", b"contentPart"];

/// What an element means for the text tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    /// Top-level shape.
    Shape,
    /// `p:cNvPr` of a top-level shape.
    ShapeName,
    /// `p:txBody` of a top-level `p:sp`.
    TextBody,
    /// `a:p`
    Paragraph,
    /// `a:r`
    Run,
    /// `a:t` of a run.
    RunText,
    Other,
}

/// Tracks the open elements and classifies each new one.
#[derive(Debug, Default)]
struct TreeWalker {
    stack: Vec<(Vec<u8>, Node)>,
}

impl TreeWalker {
    fn classify(&self, local: &[u8]) -> Node {
        let parent = self.stack.last();
        let parent_node = parent.map(|(_, n)| *n);
        let parent_name = parent.map(|(name, _)| name.as_slice());

        match local {
            _ if parent_name == Some(b"spTree".as_slice()) && SHAPE_ELEMENTS.contains(&local) => {
                Node::Shape
            }
            b"cNvPr" if self.grandparent() == Some(Node::Shape) => Node::ShapeName,
            b"txBody" if parent_node == Some(Node::Shape) && parent_name == Some(b"sp".as_slice()) => {
                Node::TextBody
            }
            b"p" if parent_node == Some(Node::TextBody) => Node::Paragraph,
            b"r" if parent_node == Some(Node::Paragraph) => Node::Run,
            b"t" if parent_node == Some(Node::Run) => Node::RunText,
            _ => Node::Other,
        }
    }

    fn grandparent(&self) -> Option<Node> {
        let len = self.stack.len();
        if len < 2 {
            return None;
        }
        Some(self.stack[len - 2].1)
    }

    fn push(&mut self, local: &[u8], node: Node) {
        self.stack.push((local.to_vec(), node));
    }

    fn pop(&mut self) -> Option<Node> {
        self.stack.pop().map(|(_, n)| n)
    }

    fn current(&self) -> Option<Node> {
        self.stack.last().map(|(_, n)| *n)
    }
}

/// Parse slide XML into a [`Slide`].
pub(crate) fn parse_slide(xml: &str, number: usize) -> Result<Slide> {
    let mut reader = Reader::from_str(xml);
    let mut walker = TreeWalker::default();
    let mut slide = Slide::new(number);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                let node = walker.classify(local);
                open_node(&mut slide, node, e);
                walker.push(local, node);
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let node = walker.classify(local_name(name.as_ref()));
                open_node(&mut slide, node, e);
            }
            Ok(Event::End(_)) => {
                walker.pop();
            }
            Ok(Event::Text(ref e)) if walker.current() == Some(Node::RunText) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Bad run text on slide {}: {}", number, e)))?;
                push_run_text(&mut slide, &text);
            }
            Ok(Event::CData(ref e)) if walker.current() == Some(Node::RunText) => {
                push_run_text(&mut slide, &String::from_utf8_lossy(e));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing slide {}: {}",
                    number, e
                )));
            }
            _ => {}
        }
    }

    Ok(slide)
}

fn open_node(slide: &mut Slide, node: Node, e: &BytesStart) {
    match node {
        Node::Shape => slide.add_shape(Shape::default()),
        Node::ShapeName => {
            if let Some(shape) = slide.shapes.last_mut() {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"name" {
                        shape.name = String::from_utf8_lossy(&attr.value).to_string();
                    }
                }
            }
        }
        Node::TextBody => {
            if let Some(shape) = slide.shapes.last_mut() {
                shape.text_frame = Some(TextFrame::default());
            }
        }
        Node::Paragraph => {
            if let Some(tf) = current_text_frame(slide) {
                tf.paragraphs.push(Paragraph::default());
            }
        }
        Node::Run => {
            if let Some(p) = current_text_frame(slide).and_then(|tf| tf.paragraphs.last_mut()) {
                p.runs.push(Run::default());
            }
        }
        Node::RunText | Node::Other => {}
    }
}

fn current_text_frame(slide: &mut Slide) -> Option<&mut TextFrame> {
    slide.shapes.last_mut().and_then(|s| s.text_frame.as_mut())
}

fn push_run_text(slide: &mut Slide, text: &str) {
    if let Some(run) = current_text_frame(slide)
        .and_then(|tf| tf.paragraphs.last_mut())
        .and_then(|p| p.runs.last_mut())
    {
        run.text.push_str(text);
    }
}

/// Write the run text of `slide` back into its original XML.
///
/// Everything except the content of run `a:t` elements is copied through
/// unchanged.
pub(crate) fn rewrite_slide(xml: &str, slide: &Slide) -> Result<String> {
    let mut runs = slide.runs();
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut walker = TreeWalker::default();
    let mut current: Option<&str> = None;

    let structure_changed = || {
        Error::PptxParseError(format!(
            "Slide {} no longer matches its XML run structure",
            slide.number
        ))
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error re-reading slide {}: {}", slide.number, e)))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let node = walker.classify(local_name(e.name().as_ref()));
                if node == Node::Run {
                    current = Some(runs.next().ok_or_else(structure_changed)?.text.as_str());
                }
                walker.push(local_name(e.name().as_ref()), node);
                write(&mut writer, Event::Start(e))?;
            }
            Event::Empty(e) => {
                let node = walker.classify(local_name(e.name().as_ref()));
                match node {
                    Node::Run => {
                        // an empty run still holds a slot in the tree
                        runs.next().ok_or_else(structure_changed)?;
                        write(&mut writer, Event::Empty(e))?;
                    }
                    Node::RunText if current.is_some_and(|t| !t.is_empty()) => {
                        let end = e.to_end().into_owned();
                        write(&mut writer, Event::Start(e))?;
                        write(&mut writer, Event::Text(BytesText::new(current.unwrap_or_default())))?;
                        write(&mut writer, Event::End(end))?;
                    }
                    _ => write(&mut writer, Event::Empty(e))?,
                }
            }
            Event::Text(_) | Event::CData(_) if walker.current() == Some(Node::RunText) => {}
            Event::End(e) => {
                match walker.pop() {
                    Some(Node::RunText) => {
                        let text = current.unwrap_or_default();
                        if !text.is_empty() {
                            write(&mut writer, Event::Text(BytesText::new(text)))?;
                        }
                    }
                    Some(Node::Run) => current = None,
                    _ => {}
                }
                write(&mut writer, Event::End(e))?;
            }
            other => write(&mut writer, other)?,
        }
    }

    if runs.next().is_some() {
        return Err(structure_changed());
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::XmlError(format!("Slide {} is not valid UTF-8: {}", slide.number, e)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("Failed to write slide XML: {}", e)))
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
