//! Tree rebuilds driven by per-path decisions
//!
//! Passes evaluate their criteria against the input snapshot and record
//! decisions keyed by positional path; this module owns the single rebuild
//! recursion that applies them. Keeping evaluation and mutation in separate
//! phases gives every pass the required snapshot semantics: nothing a pass
//! adds or removes is re-visited by the same pass.

use std::collections::{BTreeMap, HashMap, HashSet};

use scraper_tree::elements::{
    BlockElement, BulletItem, Common, DocContent, Document, InlineElement, Paragraph, PathStep,
    Section,
};

pub type Path = Vec<PathStep>;

/// A rendered tag update for one element.
#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    pub add: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

impl TagPatch {
    pub fn apply(&self, tags: &mut BTreeMap<String, String>) {
        if self.remove.iter().any(|key| key == "*") {
            tags.clear();
        } else {
            for key in &self.remove {
                tags.remove(key);
            }
        }
        for (key, value) in &self.add {
            tags.insert(key.clone(), value.clone());
        }
    }
}

/// Decisions collected by a pass's match phase.
#[derive(Debug, Clone, Default)]
pub struct Edits {
    pub tags: HashMap<Path, TagPatch>,
    pub drops: HashSet<Path>,
    pub texts: HashMap<Path, String>,
    pub splits: HashMap<Path, Vec<InlineElement>>,
    pub inline_lists: HashMap<Path, Vec<InlineElement>>,
}

impl Edits {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.drops.is_empty()
            && self.texts.is_empty()
            && self.splits.is_empty()
            && self.inline_lists.is_empty()
    }
}

/// True when the path ends in a slot elements can be removed from. Table
/// cells and the document body are structural and never dropped.
pub fn is_droppable(path: &Path) -> bool {
    matches!(
        path.last(),
        Some(PathStep::Child(_)) | Some(PathStep::Nested(_)) | Some(PathStep::Heading)
    )
}

/// Rebuild a document, applying all recorded edits.
pub fn apply(mut doc: Document, edits: &Edits) -> Document {
    let mut path = Vec::new();
    patch_common(&mut doc.common, edits, &path);
    path.push(PathStep::Content);
    doc.content = rebuild_content(doc.content, edits, &mut path);
    path.pop();
    doc
}

fn patch_common(common: &mut Common, edits: &Edits, path: &Path) {
    if let Some(patch) = edits.tags.get(path) {
        patch.apply(&mut common.tags);
    }
}

fn rebuild_content(mut content: DocContent, edits: &Edits, path: &mut Path) -> DocContent {
    patch_common(&mut content.common, edits, path);
    content.elements = rebuild_blocks(content.elements, edits, path);
    content
}

fn rebuild_blocks(
    blocks: Vec<BlockElement>,
    edits: &Edits,
    path: &mut Path,
) -> Vec<BlockElement> {
    let mut rebuilt = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.into_iter().enumerate() {
        path.push(PathStep::Child(index));
        if !edits.drops.contains(path) {
            rebuilt.push(rebuild_block(block, edits, path));
        }
        path.pop();
    }
    rebuilt
}

fn rebuild_block(block: BlockElement, edits: &Edits, path: &mut Path) -> BlockElement {
    match block {
        BlockElement::Paragraph(paragraph) => {
            BlockElement::Paragraph(rebuild_paragraph(paragraph, edits, path))
        }
        BlockElement::BulletItem(item) => {
            BlockElement::BulletItem(rebuild_bullet_item(item, edits, path))
        }
        BlockElement::BulletList(mut list) => {
            patch_common(&mut list.common, edits, path);
            let mut items = Vec::with_capacity(list.items.len());
            for (index, item) in list.items.into_iter().enumerate() {
                path.push(PathStep::Child(index));
                if !edits.drops.contains(path) {
                    items.push(rebuild_bullet_item(item, edits, path));
                }
                path.pop();
            }
            list.items = items;
            BlockElement::BulletList(list)
        }
        BlockElement::Table(mut table) => {
            patch_common(&mut table.common, edits, path);
            let cols = table.cols().max(1);
            let mut cell_index = 0;
            let table = table.map_cells(|cell| {
                let coords = (cell_index / cols, cell_index % cols);
                cell_index += 1;
                path.push(PathStep::Cell(coords.0, coords.1));
                let cell = rebuild_content(cell, edits, path);
                path.pop();
                cell
            });
            BlockElement::Table(table)
        }
        BlockElement::Section(mut section) => {
            patch_common(&mut section.common, edits, path);
            section.heading = section.heading.and_then(|heading| {
                path.push(PathStep::Heading);
                let kept = if edits.drops.contains(path) {
                    None
                } else {
                    Some(rebuild_paragraph(heading, edits, path))
                };
                path.pop();
                kept
            });
            section.content = rebuild_blocks(section.content, edits, path);
            BlockElement::Section(section)
        }
    }
}

fn rebuild_paragraph(mut paragraph: Paragraph, edits: &Edits, path: &mut Path) -> Paragraph {
    patch_common(&mut paragraph.common, edits, path);
    if let Some(replacement) = edits.inline_lists.get(path) {
        paragraph.elements = replacement.clone();
        return paragraph;
    }
    paragraph.elements = rebuild_inlines(paragraph.elements, edits, path);
    paragraph
}

fn rebuild_bullet_item(mut item: BulletItem, edits: &Edits, path: &mut Path) -> BulletItem {
    patch_common(&mut item.common, edits, path);
    if let Some(replacement) = edits.inline_lists.get(path) {
        item.elements = replacement.clone();
    } else {
        item.elements = rebuild_inlines(item.elements, edits, path);
    }
    let mut nested = Vec::with_capacity(item.nested.len());
    for (index, child) in item.nested.into_iter().enumerate() {
        path.push(PathStep::Nested(index));
        if !edits.drops.contains(path) {
            nested.push(rebuild_bullet_item(child, edits, path));
        }
        path.pop();
    }
    item.nested = nested;
    item
}

fn rebuild_inlines(
    inlines: Vec<InlineElement>,
    edits: &Edits,
    path: &mut Path,
) -> Vec<InlineElement> {
    let mut rebuilt = Vec::with_capacity(inlines.len());
    for (index, mut inline) in inlines.into_iter().enumerate() {
        path.push(PathStep::Child(index));
        if edits.drops.contains(path) {
            path.pop();
            continue;
        }
        if let Some(pieces) = edits.splits.get(path) {
            rebuilt.extend(pieces.iter().cloned());
            path.pop();
            continue;
        }
        patch_common(inline.common_mut(), edits, path);
        if let Some(text) = edits.texts.get(path) {
            inline.set_text(text.clone());
        }
        rebuilt.push(inline);
        path.pop();
    }
    rebuilt
}

/// Visit every element's attribute record, table cells included. Used by
/// passes that rewrite attributes without touching structure.
pub fn for_each_common(doc: &mut Document, f: &mut impl FnMut(&mut Common)) {
    f(&mut doc.common);
    content_commons(&mut doc.content, f);
}

fn content_commons(content: &mut DocContent, f: &mut impl FnMut(&mut Common)) {
    f(&mut content.common);
    for block in &mut content.elements {
        block_commons(block, f);
    }
}

fn bullet_commons(item: &mut BulletItem, f: &mut impl FnMut(&mut Common)) {
    f(&mut item.common);
    for inline in &mut item.elements {
        f(inline.common_mut());
    }
    for nested in &mut item.nested {
        bullet_commons(nested, f);
    }
}

fn block_commons(block: &mut BlockElement, f: &mut impl FnMut(&mut Common)) {
    match block {
        BlockElement::Paragraph(paragraph) => {
            f(&mut paragraph.common);
            for inline in &mut paragraph.elements {
                f(inline.common_mut());
            }
        }
        BlockElement::BulletItem(item) => bullet_commons(item, f),
        BlockElement::BulletList(list) => {
            f(&mut list.common);
            for item in &mut list.items {
                bullet_commons(item, f);
            }
        }
        BlockElement::Table(table) => {
            f(&mut table.common);
            for cell in table.cells_mut() {
                content_commons(cell, f);
            }
        }
        BlockElement::Section(section) => {
            f(&mut section.common);
            if let Some(heading) = &mut section.heading {
                f(&mut heading.common);
                for inline in &mut heading.elements {
                    f(inline.common_mut());
                }
            }
            for block in &mut section.content {
                block_commons(block, f);
            }
        }
    }
}
