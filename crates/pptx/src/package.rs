//! PPTX package: read every part, expose the slides' text tree, write back.

use crate::slide::{local_name, parse_slide, rewrite_slide};
use mailmerge_core::{Deck, Error, Result, TemplateDocument};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// One entry of the ZIP package, kept verbatim.
#[derive(Debug, Clone)]
struct Part {
    name: String,
    is_dir: bool,
    data: Arc<[u8]>,
}

/// A slide part and the tree it parsed to.
#[derive(Debug, Clone)]
struct SlidePart {
    part_index: usize,
    xml: Arc<str>,
    original: mailmerge_core::Slide,
}

/// An opened `.pptx` template.
///
/// Cloning is cheap (part bytes are shared) and yields an independent
/// document: edits to one clone's text tree never show up in another.
#[derive(Debug, Clone)]
pub struct PptxDocument {
    parts: Vec<Part>,
    slides: Vec<SlidePart>,
    deck: Deck,
}

impl PptxDocument {
    /// Open a `.pptx` file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::template_read(path, e))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        Self::from_reader(BufReader::new(file), filename).map_err(|e| Error::template_read(path, e))
    }

    /// Read a `.pptx` package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R, filename: &str) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", file.name(), e)))?;
            parts.push(Part {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                data: data.into(),
            });
        }

        let slide_order = get_slide_order(&parts)?;
        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            let part_index = parts
                .iter()
                .position(|p| p.name == *slide_path)
                .ok_or_else(|| {
                    Error::PptxParseError(format!("Slide part missing from package: {}", slide_path))
                })?;
            let xml = part_text(&parts[part_index])?;
            let original = parse_slide(&xml, idx + 1)?;
            slides.push(SlidePart {
                part_index,
                xml: xml.into(),
                original,
            });
        }

        let deck = Deck::new(slides.iter().map(|s| s.original.clone()).collect());
        log::debug!("Parsed {} slides from {}", deck.slide_count(), filename);

        Ok(Self {
            parts,
            slides,
            deck,
        })
    }

    /// Raw bytes of a package part as loaded.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_ref())
    }

    /// Write the package, with current run text, to any seekable writer.
    ///
    /// Slides whose text is unchanged and all other parts are copied
    /// byte-for-byte.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut rewritten: HashMap<usize, Vec<u8>> = HashMap::new();
        for (slide_part, slide) in self.slides.iter().zip(&self.deck.slides) {
            if *slide != slide_part.original {
                let xml = rewrite_slide(&slide_part.xml, slide)?;
                rewritten.insert(slide_part.part_index, xml.into_bytes());
            }
        }
        log::trace!("{} slide(s) rewritten", rewritten.len());

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(writer);
        for (index, part) in self.parts.iter().enumerate() {
            if part.is_dir {
                zip.add_directory(part.name.clone(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
                continue;
            }
            zip.start_file(part.name.clone(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
            let data = rewritten
                .get(&index)
                .map(Vec::as_slice)
                .unwrap_or(part.data.as_ref());
            zip.write_all(data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish package: {}", e)))
    }
}

impl TemplateDocument for PptxDocument {
    fn deck(&self) -> &Deck {
        &self.deck
    }

    fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::save(path, e))?;
        let mut writer = self.write_to(BufWriter::new(file)).map_err(|e| Error::save(path, e))?;
        writer.flush().map_err(|e| Error::save(path, e))?;
        Ok(())
    }
}

fn part_text(part: &Part) -> Result<String> {
    let text = std::str::from_utf8(&part.data)
        .map_err(|e| Error::PptxParseError(format!("'{}' is not UTF-8: {}", part.name, e)))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn find_part<'a>(parts: &'a [Part], name: &str) -> Result<&'a Part> {
    parts
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", name)))
}

/// Get the ordered list of slide part paths.
///
/// The order is that of `p:sldIdLst` in `ppt/presentation.xml`. When the
/// list is absent the slide relationships are ordered by the number in
/// their id or target.
fn get_slide_order(parts: &[Part]) -> Result<Vec<String>> {
    let rels = parse_slide_relationships(&part_text(find_part(parts, PRESENTATION_RELS_PATH)?)?)?;
    let listed = match parts.iter().find(|p| p.name == PRESENTATION_PATH) {
        Some(part) => parse_slide_id_list(&part_text(part)?)?,
        None => Vec::new(),
    };

    if !listed.is_empty() {
        return listed
            .iter()
            .map(|rid| {
                rels.iter()
                    .find(|r| r.id == *rid)
                    .map(|r| r.path.clone())
                    .ok_or_else(|| {
                        Error::PptxParseError(format!("Slide relationship '{}' not found", rid))
                    })
            })
            .collect();
    }

    // Numbered relationships first, by number; the rest by target path.
    let mut slides: Vec<(Option<usize>, String)> = rels
        .into_iter()
        .map(|r| (trailing_number(&r.id).or_else(|| trailing_number(&r.path)), r.path))
        .collect();
    slides.sort_by(|(na, pa), (nb, pb)| {
        na.is_none()
            .cmp(&nb.is_none())
            .then(na.cmp(nb))
            .then_with(|| pa.cmp(pb))
    });
    Ok(slides.into_iter().map(|(_, path)| path).collect())
}

/// A slide relationship of the presentation part.
#[derive(Debug)]
struct SlideRel {
    id: String,
    path: String,
}

fn parse_slide_relationships(xml: &str) -> Result<Vec<SlideRel>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Type" => rel_type = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }

                if rel_type.ends_with("/slide") {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    rels.push(SlideRel { id, path });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids of `p:sldId` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    if key != b"id" && local_name(key) == b"id" {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// The number ending a relationship id (`rId12`) or part name
/// (`slides/slide12.xml`).
fn trailing_number(s: &str) -> Option<usize> {
    let stem = s.strip_suffix(".xml").unwrap_or(s);
    let digits = &stem[stem.trim_end_matches(|c: char| c.is_ascii_digit()).len()..];
    digits.parse().ok()
}
