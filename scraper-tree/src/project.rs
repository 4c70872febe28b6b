//! JSON projection and tree-exchange parsing
//!
//! The projection is the JSON view of the tree consumed by the query engine
//! and emitted by sinks: every element becomes an object with a `type` key
//! holding the variant name, its scalar fields, the three attribute maps
//! (omitted when empty) and its children under the variant's field name.
//! Tables project their cells as row-major row arrays with `row`/`col`
//! injected on each cell.
//!
//! `parse_document` is the inverse direction and doubles as the contract a
//! source parser has to meet: any document it delivers must parse from the
//! same shape this module produces.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::elements::{
    BlockElement, BulletItem, BulletList, Chips, Common, DocContent, Document, ElementRef,
    InlineElement, Paragraph, Section, SharedData, Table, TextRun,
};
use crate::error::StructuralError;

/// Project any element subtree into its JSON view.
pub fn project_element(element: ElementRef<'_>) -> Value {
    match element {
        ElementRef::TextRun(run) => project_leaf("TextRun", &run.common, &run.text, &run.url),
        ElementRef::Chips(chips) => project_leaf("Chips", &chips.common, &chips.text, &chips.url),
        ElementRef::Paragraph(paragraph) => project_paragraph(paragraph),
        ElementRef::BulletItem(item) => project_bullet_item(item),
        ElementRef::BulletList(list) => {
            let mut map = base("BulletList", &list.common);
            map.insert(
                "items".to_string(),
                Value::Array(list.items.iter().map(project_bullet_item_value).collect()),
            );
            Value::Object(map)
        }
        ElementRef::Table(table) => project_table(table),
        ElementRef::DocContent(content) => project_content(content),
        ElementRef::Section(section) => {
            let mut map = base("Section", &section.common);
            map.insert("level".to_string(), json!(section.level));
            if let Some(heading) = &section.heading {
                map.insert(
                    "heading".to_string(),
                    project_element(ElementRef::Paragraph(heading)),
                );
            }
            map.insert(
                "content".to_string(),
                Value::Array(
                    section
                        .content
                        .iter()
                        .map(|el| project_element(el.as_ref()))
                        .collect(),
                ),
            );
            Value::Object(map)
        }
        ElementRef::Document(doc) => {
            let mut map = base("Document", &doc.common);
            let mut shared = Map::new();
            shared.insert("type".to_string(), json!("SharedData"));
            if !doc.shared_data.style_rules.is_empty() {
                shared.insert(
                    "style_rules".to_string(),
                    json!(doc.shared_data.style_rules),
                );
            }
            map.insert("shared_data".to_string(), Value::Object(shared));
            map.insert("content".to_string(), project_content(&doc.content));
            Value::Object(map)
        }
    }
}

/// Project a whole document.
pub fn project_document(doc: &Document) -> Value {
    project_element(ElementRef::Document(doc))
}

fn base(type_name: &str, common: &Common) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".to_string(), json!(type_name));
    if !common.attribs.is_empty() {
        map.insert("attribs".to_string(), json!(common.attribs));
    }
    if !common.style.is_empty() {
        map.insert("style".to_string(), json!(common.style));
    }
    if !common.tags.is_empty() {
        map.insert("tags".to_string(), json!(common.tags));
    }
    map
}

fn project_leaf(type_name: &str, common: &Common, text: &str, url: &Option<String>) -> Value {
    let mut map = base(type_name, common);
    map.insert("text".to_string(), json!(text));
    if let Some(url) = url {
        map.insert("url".to_string(), json!(url));
    }
    Value::Object(map)
}

fn project_inline(inline: &InlineElement) -> Value {
    project_element(inline.as_ref())
}

fn project_paragraph(paragraph: &Paragraph) -> Value {
    let mut map = base("Paragraph", &paragraph.common);
    if let Some(level) = paragraph.heading_level {
        map.insert("level".to_string(), json!(level));
    }
    map.insert(
        "elements".to_string(),
        Value::Array(paragraph.elements.iter().map(project_inline).collect()),
    );
    Value::Object(map)
}

fn project_bullet_item_value(item: &BulletItem) -> Value {
    project_bullet_item(item)
}

fn project_bullet_item(item: &BulletItem) -> Value {
    let mut map = base("BulletItem", &item.common);
    map.insert("level".to_string(), json!(item.level));
    map.insert("list_type".to_string(), json!(item.list_type));
    map.insert(
        "elements".to_string(),
        Value::Array(item.elements.iter().map(project_inline).collect()),
    );
    if !item.nested.is_empty() {
        map.insert(
            "nested".to_string(),
            Value::Array(item.nested.iter().map(project_bullet_item_value).collect()),
        );
    }
    Value::Object(map)
}

fn project_content(content: &DocContent) -> Value {
    let mut map = base("DocContent", &content.common);
    map.insert(
        "elements".to_string(),
        Value::Array(
            content
                .elements
                .iter()
                .map(|el| project_element(el.as_ref()))
                .collect(),
        ),
    );
    Value::Object(map)
}

fn project_table(table: &Table) -> Value {
    let mut map = base("Table", &table.common);
    map.insert("rows".to_string(), json!(table.rows()));
    map.insert("cols".to_string(), json!(table.cols()));
    let mut rows = Vec::with_capacity(table.rows());
    for row in 0..table.rows() {
        let mut cells = Vec::with_capacity(table.cols());
        for col in 0..table.cols() {
            if let Some(cell) = table.cell(row, col) {
                let mut cell_map = match project_content(cell) {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                cell_map.insert("row".to_string(), json!(row));
                cell_map.insert("col".to_string(), json!(col));
                cells.push(Value::Object(cell_map));
            }
        }
        rows.push(Value::Array(cells));
    }
    map.insert("elements".to_string(), Value::Array(rows));
    Value::Object(map)
}

// ---------------------------------------------------------------------------
// Tree-exchange parsing
// ---------------------------------------------------------------------------

/// Rebuild a document from its projection JSON.
pub fn parse_document(value: &Value) -> Result<Document, StructuralError> {
    let obj = as_object(value, "document")?;
    expect_type(obj, "Document")?;
    let shared_data = match obj.get("shared_data") {
        Some(shared) => {
            let shared_obj = as_object(shared, "shared_data")?;
            SharedData {
                style_rules: parse_rule_map(shared_obj.get("style_rules"))?,
            }
        }
        None => SharedData::default(),
    };
    let content = match obj.get("content") {
        Some(content) => parse_content(content)?,
        None => DocContent::default(),
    };
    Ok(Document {
        common: parse_common(obj),
        shared_data,
        content,
    })
}

fn parse_content(value: &Value) -> Result<DocContent, StructuralError> {
    let obj = as_object(value, "doc content")?;
    expect_type(obj, "DocContent")?;
    let mut elements = Vec::new();
    for element in list_field(obj, "elements") {
        elements.push(parse_block(element)?);
    }
    Ok(DocContent {
        common: parse_common(obj),
        elements,
    })
}

fn parse_block(value: &Value) -> Result<BlockElement, StructuralError> {
    let obj = as_object(value, "block element")?;
    let type_name = type_name(obj)?;
    match type_name {
        "Paragraph" => Ok(BlockElement::Paragraph(parse_paragraph(obj)?)),
        "BulletItem" => Ok(BlockElement::BulletItem(parse_bullet_item(obj)?)),
        "BulletList" => {
            let mut items = Vec::new();
            for item in list_field(obj, "items") {
                items.push(parse_bullet_item(as_object(item, "bullet item")?)?);
            }
            Ok(BlockElement::BulletList(BulletList {
                common: parse_common(obj),
                items,
            }))
        }
        "Table" => Ok(BlockElement::Table(parse_table(obj)?)),
        "Section" => {
            let heading = match obj.get("heading") {
                Some(heading) => Some(parse_paragraph(as_object(heading, "heading")?)?),
                None => None,
            };
            let mut content = Vec::new();
            for element in list_field(obj, "content") {
                content.push(parse_block(element)?);
            }
            Ok(BlockElement::Section(Section {
                common: parse_common(obj),
                level: int_field(obj, "level")? as u8,
                heading,
                content,
            }))
        }
        other => Err(StructuralError::exchange(format!(
            "unexpected block element type {:?}",
            other
        ))),
    }
}

fn parse_paragraph(obj: &Map<String, Value>) -> Result<Paragraph, StructuralError> {
    expect_type(obj, "Paragraph")?;
    let mut elements = Vec::new();
    for element in list_field(obj, "elements") {
        elements.push(parse_inline(element)?);
    }
    let heading_level = match obj.get("level") {
        Some(level) => Some(
            level
                .as_u64()
                .ok_or_else(|| StructuralError::exchange("non-integer heading level"))?
                as u8,
        ),
        None => None,
    };
    Ok(Paragraph {
        common: parse_common(obj),
        heading_level,
        elements,
    })
}

fn parse_bullet_item(obj: &Map<String, Value>) -> Result<BulletItem, StructuralError> {
    expect_type(obj, "BulletItem")?;
    let mut elements = Vec::new();
    for element in list_field(obj, "elements") {
        elements.push(parse_inline(element)?);
    }
    let mut nested = Vec::new();
    for item in list_field(obj, "nested") {
        nested.push(parse_bullet_item(as_object(item, "nested bullet item")?)?);
    }
    Ok(BulletItem {
        common: parse_common(obj),
        elements,
        level: int_field(obj, "level")? as u8,
        list_type: str_field(obj, "list_type").unwrap_or_else(|| "ul".to_string()),
        nested,
    })
}

fn parse_table(obj: &Map<String, Value>) -> Result<Table, StructuralError> {
    let mut parsed_rows = Vec::new();
    for row in list_field(obj, "elements") {
        let row_list = row
            .as_array()
            .ok_or_else(|| StructuralError::exchange("table rows must be arrays"))?;
        let mut cells = Vec::new();
        for cell in row_list {
            cells.push(parse_content(cell)?);
        }
        parsed_rows.push(cells);
    }
    let row_count = parsed_rows.len();
    let col_count = parsed_rows.first().map(Vec::len).unwrap_or(0);
    if let Some(declared) = obj.get("rows").and_then(Value::as_u64) {
        if declared as usize != row_count {
            return Err(StructuralError::exchange(format!(
                "table declares {} rows but holds {}",
                declared, row_count
            )));
        }
    }
    let mut cells = Vec::with_capacity(row_count * col_count);
    for row in parsed_rows {
        if row.len() != col_count {
            return Err(StructuralError::CellCountMismatch {
                rows: row_count,
                cols: col_count,
                cells: row.len(),
            });
        }
        cells.extend(row);
    }
    Table::new(parse_common(obj), row_count, col_count, cells)
}

fn parse_inline(value: &Value) -> Result<InlineElement, StructuralError> {
    let obj = as_object(value, "inline element")?;
    let text = str_field(obj, "text").unwrap_or_default();
    let url = str_field(obj, "url");
    match type_name(obj)? {
        "TextRun" => Ok(InlineElement::TextRun(TextRun {
            common: parse_common(obj),
            text,
            url,
        })),
        "Chips" => Ok(InlineElement::Chips(Chips {
            common: parse_common(obj),
            text,
            url,
        })),
        other => Err(StructuralError::exchange(format!(
            "unexpected inline element type {:?}",
            other
        ))),
    }
}

fn parse_common(obj: &Map<String, Value>) -> Common {
    Common {
        attribs: parse_str_map(obj.get("attribs")),
        style: parse_str_map(obj.get("style")),
        tags: parse_str_map(obj.get("tags")),
    }
}

fn parse_str_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(Value::Object(entries)) = value {
        for (key, entry) in entries {
            if let Some(text) = entry.as_str() {
                map.insert(key.clone(), text.to_string());
            }
        }
    }
    map
}

fn parse_rule_map(
    value: Option<&Value>,
) -> Result<BTreeMap<String, BTreeMap<String, String>>, StructuralError> {
    let mut rules = BTreeMap::new();
    if let Some(value) = value {
        let obj = as_object(value, "style_rules")?;
        for (selector, rule) in obj {
            rules.insert(selector.clone(), parse_str_map(Some(rule)));
        }
    }
    Ok(rules)
}

fn as_object<'v>(
    value: &'v Value,
    what: &str,
) -> Result<&'v Map<String, Value>, StructuralError> {
    value
        .as_object()
        .ok_or_else(|| StructuralError::exchange(format!("{} must be an object", what)))
}

fn type_name(obj: &Map<String, Value>) -> Result<&str, StructuralError> {
    obj.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| StructuralError::exchange("missing type key"))
}

fn expect_type(obj: &Map<String, Value>, expected: &str) -> Result<(), StructuralError> {
    let found = type_name(obj)?;
    if found != expected {
        return Err(StructuralError::exchange(format!(
            "expected type {:?}, found {:?}",
            expected, found
        )));
    }
    Ok(())
}

fn list_field<'v>(obj: &'v Map<String, Value>, key: &str) -> &'v [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|text| text.to_string())
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Result<u64, StructuralError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| StructuralError::exchange(format!("missing integer field {:?}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BulletItem, Common};

    fn cell(text: &str) -> DocContent {
        DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text(text))])
    }

    fn sample_doc() -> Document {
        let table = Table::from_rows(vec![
            vec![cell("a"), cell("b")],
            vec![cell("c"), cell("d")],
        ])
        .expect("valid geometry");
        let mut bullet = BulletItem::from_text(0, "Name: value");
        bullet.nested.push(BulletItem::from_text(1, "Field1: v1"));
        let section = Section::new(
            1,
            Some(Paragraph::heading(1, "Head")),
            vec![
                BlockElement::Table(table),
                BlockElement::BulletList(BulletList::new(vec![bullet])),
            ],
        );
        Document::new(DocContent::new(vec![BlockElement::Section(section)]))
            .with_common(Common::new().with_attrib("name", "sample"))
    }

    #[test]
    fn projection_emits_type_names() {
        let value = project_document(&sample_doc());
        assert_eq!(value["type"], "Document");
        assert_eq!(value["content"]["type"], "DocContent");
        assert_eq!(value["content"]["elements"][0]["type"], "Section");
    }

    #[test]
    fn table_cells_carry_coordinates() {
        let value = project_document(&sample_doc());
        let table = &value["content"]["elements"][0]["content"][0];
        assert_eq!(table["type"], "Table");
        assert_eq!(table["rows"], 2);
        assert_eq!(table["elements"][1][0]["row"], 1);
        assert_eq!(table["elements"][1][0]["col"], 0);
        assert_eq!(table["elements"][0][1]["elements"][0]["elements"][0]["text"], "b");
    }

    #[test]
    fn empty_maps_are_omitted() {
        let run = TextRun::new("x");
        let value = project_element(ElementRef::TextRun(&run));
        assert!(value.get("tags").is_none());
        assert!(value.get("style").is_none());
        assert!(value.get("url").is_none());
    }

    #[test]
    fn exchange_round_trips() {
        let doc = sample_doc();
        let parsed = parse_document(&project_document(&doc)).expect("parse projection");
        assert_eq!(parsed, doc);
    }

    #[test]
    fn ragged_tables_are_rejected() {
        let value = serde_json::json!({
            "type": "Document",
            "content": {
                "type": "DocContent",
                "elements": [{
                    "type": "Table",
                    "rows": 2,
                    "cols": 2,
                    "elements": [
                        [{"type": "DocContent", "elements": []}],
                        [{"type": "DocContent", "elements": []},
                         {"type": "DocContent", "elements": []}]
                    ]
                }]
            }
        });
        assert!(parse_document(&value).is_err());
    }
}
