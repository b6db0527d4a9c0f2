//! PDF page concatenation with lopdf.

use lopdf::{Dictionary, Document, Object, ObjectId};
use mailmerge_core::{Error, PageMerger, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its `Pages` ancestors.
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Appends the pages of several PDFs into one document.
#[derive(Debug, Clone, Default)]
pub struct LopdfMerger;

impl LopdfMerger {
    /// Create a new merger.
    pub fn new() -> Self {
        Self
    }
}

impl PageMerger for LopdfMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize> {
        let mut max_id = 1;
        let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        // Everything is loaded before anything is written.
        for input in inputs {
            let mut doc = Document::load(input).map_err(|e| Error::Consolidation {
                path: input.clone(),
                reason: e.to_string(),
            })?;
            doc.renumber_objects_with(max_id);
            max_id = doc.max_id + 1;

            let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
            log::debug!("{}: {} page(s)", input.display(), page_ids.len());
            for page_id in page_ids {
                let page = page_with_inherited(&doc, page_id).map_err(|reason| {
                    Error::Consolidation {
                        path: input.clone(),
                        reason,
                    }
                })?;
                pages.push((page_id, page));
            }
            objects.extend(doc.objects);
        }

        let mut document = Document::with_version("1.5");
        let mut catalog: Option<(ObjectId, Dictionary)> = None;
        let mut pages_root: Option<(ObjectId, Dictionary)> = None;

        for (object_id, object) in objects {
            let kind = object.type_name().unwrap_or_default().to_string();
            match kind.as_str() {
                "Catalog" => {
                    if catalog.is_none() {
                        if let Ok(dict) = object.as_dict() {
                            catalog = Some((object_id, dict.clone()));
                        }
                    }
                }
                "Pages" => {
                    if let Ok(dict) = object.as_dict() {
                        match pages_root.as_mut() {
                            Some((_, root)) => root.extend(dict),
                            None => pages_root = Some((object_id, dict.clone())),
                        }
                    }
                }
                "Page" | "Outlines" | "Outline" => {}
                _ => {
                    document.objects.insert(object_id, object);
                }
            }
        }

        let missing = |what: &str| Error::Consolidation {
            path: output.to_path_buf(),
            reason: format!("no {} object in the inputs", what),
        };
        let (catalog_id, mut catalog) = catalog.ok_or_else(|| missing("Catalog"))?;
        let (pages_id, mut pages_dict) = pages_root.ok_or_else(|| missing("Pages"))?;

        let page_count = pages.len();
        let mut kids = Vec::with_capacity(page_count);
        for (page_id, mut page) in pages {
            page.set("Parent", pages_id);
            document.objects.insert(page_id, Object::Dictionary(page));
            kids.push(Object::Reference(page_id));
        }

        pages_dict.set("Count", Object::Integer(page_count as i64));
        pages_dict.set("Kids", kids);
        for key in INHERITABLE {
            pages_dict.remove(key);
        }
        pages_dict.remove(b"Parent");
        document
            .objects
            .insert(pages_id, Object::Dictionary(pages_dict));

        catalog.set("Pages", pages_id);
        catalog.remove(b"Outlines");
        document
            .objects
            .insert(catalog_id, Object::Dictionary(catalog));

        document.trailer.set("Root", catalog_id);
        document.max_id = document.objects.len() as u32;
        document.renumber_objects();
        document.compress();

        document.save(output).map_err(|e| Error::Consolidation {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(page_count)
    }
}

/// A copy of the page dictionary with the attributes it inherits from its
/// ancestors made explicit, since its original `Pages` parents are dropped.
fn page_with_inherited(
    doc: &Document,
    page_id: ObjectId,
) -> std::result::Result<Dictionary, String> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| format!("page {:?}: {}", page_id, e))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = Vec::new();
    while let Some(parent_id) = parent {
        if visited.contains(&parent_id) {
            break;
        }
        visited.push(parent_id);

        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}
