//! # Datagrid Layout
//!
//! A datagrid iterates a list from the data store. Each entry becomes one
//! row of cells, one per `column` child. Around the data rows:
//!
//! - a header row of column labels, repeated on every continuation page;
//! - a footer row, present when any column declares a `footer`. `=sum` and
//!   `=count` aggregate over the *whole* list, so the footer is the same no
//!   matter how many pages the grid spans.
//!
//! The last data row is kept on the same page as the footer.

use crate::data::{DataValue, Record};
use crate::error::ReportError;
use crate::model::props::{ColumnProps, DatagridProps};
use crate::model::{ElementId, Properties};
use crate::style::loose::format_number;
use crate::style::{Color, FontStyle};

use super::{resolve_widths, Block, CellSpec, LayoutEngine};

/// A parsed column `footer` property.
#[derive(Debug, Clone, PartialEq)]
pub enum FooterExpr {
    /// Numeric sum of the column's values.
    Sum,
    /// Number of data rows.
    Count,
    /// Literal or bound text.
    Text(String),
}

impl FooterExpr {
    /// `None` for an empty footer.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.to_ascii_lowercase().as_str() {
            "=sum" => FooterExpr::Sum,
            "=count" => FooterExpr::Count,
            _ => FooterExpr::Text(value.to_string()),
        })
    }
}

/// Parse a cell value as a number. Whitespace (including thousands
/// separators written as spaces) is ignored.
pub fn parse_number(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    compact.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Sum of `field` over `rows`. Values that are not numbers count as zero.
pub fn column_sum(rows: &[Record], field: &str) -> f64 {
    let sum: f64 = rows
        .iter()
        .filter_map(|row| {
            let raw = row.get(field)?;
            let value = parse_number(raw);
            if value.is_none() && !raw.trim().is_empty() {
                log::debug!("`{raw}` in column `{field}` is not a number, not summed");
            }
            value
        })
        .sum();
    // drop float noise such as 0.30000000000000004
    (sum * 1e9).round() / 1e9
}

pub(crate) fn grid_blocks(
    engine: &LayoutEngine<'_>,
    id: ElementId,
    props: &DatagridProps,
) -> Result<Vec<Block>, ReportError> {
    let tree = engine.tree();
    let columns: Vec<&ColumnProps> = tree
        .children(id)
        .iter()
        .filter_map(|&c| match &tree.get(c)?.props {
            Properties::Column(column) => Some(column),
            _ => None,
        })
        .collect();
    if columns.is_empty() {
        log::debug!("datagrid `{}` has no columns, skipped", props.name);
        return Ok(Vec::new());
    }

    let rows = bound_rows(engine, props)?;

    let dims: Vec<_> = columns.iter().map(|c| c.width).collect();
    let widths = resolve_widths(&dims, engine.content_width(), 0.0);

    let base = CellSpec {
        text: String::new(),
        font: engine.font(FontStyle::default(), props.font_size),
        color: props.color.unwrap_or(Color::BLACK),
        underline: false,
        align: Default::default(),
        borders: props.border,
        border_color: props.border_color.unwrap_or(Color::BLACK),
        fill: props.background_color,
        multiline: true,
        min_height: 0.0,
    };
    let bold = engine.font(FontStyle::BOLD, props.font_size);

    let mut blocks = Vec::with_capacity(rows.len() + 2);

    if props.show_header() {
        let cells: Vec<CellSpec> = columns
            .iter()
            .map(|column| CellSpec {
                text: engine.data().bound_text(&column.label, None),
                font: bold,
                align: column.header_align.or(column.align).unwrap_or_default(),
                fill: props.header_background.or(props.background_color),
                ..base.clone()
            })
            .collect();
        let mut header = engine.cell_row(&cells, &widths);
        header.repeat_on_break = true;
        header.keep_with_next = true;
        blocks.push(header);
    }

    for row in rows {
        let cells: Vec<CellSpec> = columns
            .iter()
            .map(|column| CellSpec {
                text: row.get(column.fieldname.trim()).cloned().unwrap_or_default(),
                align: column.align.unwrap_or_default(),
                ..base.clone()
            })
            .collect();
        blocks.push(engine.cell_row(&cells, &widths));
    }

    let footers: Vec<Option<FooterExpr>> =
        columns.iter().map(|c| FooterExpr::parse(&c.footer)).collect();
    if footers.iter().any(Option::is_some) {
        let cells: Vec<CellSpec> = columns
            .iter()
            .zip(&footers)
            .map(|(column, expr)| {
                let text = match expr {
                    None => String::new(),
                    Some(FooterExpr::Sum) => format_number(column_sum(rows, column.fieldname.trim())),
                    Some(FooterExpr::Count) => rows.len().to_string(),
                    Some(FooterExpr::Text(text)) => engine.data().bound_text(text, None),
                };
                CellSpec {
                    text,
                    font: bold,
                    align: column.footer_align.or(column.align).unwrap_or_default(),
                    fill: props.footer_background.or(props.background_color),
                    ..base.clone()
                }
            })
            .collect();
        if let Some(last) = blocks.last_mut() {
            last.keep_with_next = true;
        }
        blocks.push(engine.cell_row(&cells, &widths));
    }

    Ok(blocks)
}

/// The list a grid iterates. A missing key is an empty list; anything but a
/// list is an error.
fn bound_rows<'e>(
    engine: &'e LayoutEngine<'_>,
    props: &DatagridProps,
) -> Result<&'e [Record], ReportError> {
    let key = props.databind.trim();
    if key.is_empty() {
        log::warn!("datagrid `{}` has no databind, rendering no rows", props.name);
        return Ok(&[]);
    }
    match engine.data().get(key) {
        None => {
            log::warn!(
                "datagrid `{}` is bound to `{key}`, which is not set; rendering no rows",
                props.name
            );
            Ok(&[])
        }
        Some(DataValue::List(rows)) => Ok(rows),
        Some(other) => Err(ReportError::layout(format!(
            "datagrid `{}` is bound to `{key}`, which holds {} instead of a list",
            props.name,
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataStore;
    use crate::layout::tests::{props, small_page, texts};
    use crate::layout::DrawCommand;
    use crate::model::{ElementKind, ElementTree, ReportConfig, Section};
    use serde_json::json;

    fn grid_tree(footer: &str) -> ElementTree {
        let mut tree = ElementTree::new();
        let grid = tree
            .append(
                Section::Details,
                ElementKind::Datagrid,
                &props(json!({"name": "items", "databind": "items", "border": "1"})),
            )
            .unwrap();
        tree.append(
            grid,
            ElementKind::Column,
            &props(json!({"fieldname": "product", "label": "labels.product", "footer": "Total"})),
        )
        .unwrap();
        tree.append(
            grid,
            ElementKind::Column,
            &props(json!({"fieldname": "amount", "label": "Amount", "width": "30%",
                          "align": "right", "footer": footer})),
        )
        .unwrap();
        tree
    }

    fn items(n: usize) -> serde_json::Value {
        json!((1..=n)
            .map(|i| json!({"product": format!("item {i}"), "amount": format!("{}", i * 10)}))
            .collect::<Vec<_>>())
    }

    #[test]
    fn test_footer_expr_parse() {
        assert_eq!(FooterExpr::parse(" =SUM "), Some(FooterExpr::Sum));
        assert_eq!(FooterExpr::parse("=count"), Some(FooterExpr::Count));
        assert_eq!(
            FooterExpr::parse("labels.total"),
            Some(FooterExpr::Text("labels.total".to_string()))
        );
        assert_eq!(FooterExpr::parse("  "), None);
    }

    #[test]
    fn test_parse_number_ignores_spaces() {
        assert_eq!(parse_number("123 456"), Some(123456.0));
        assert_eq!(parse_number("-1.5"), Some(-1.5));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_column_sum_skips_non_numbers() {
        let rows: Vec<Record> = ["1.1", "2.2", "x", ""]
            .iter()
            .map(|v| Record::from([("n".to_string(), v.to_string())]))
            .collect();
        assert_eq!(column_sum(&rows, "n"), 3.3);
    }

    #[test]
    fn test_grid_sum_spans_pages() {
        let tree = grid_tree("=sum");
        let mut data = DataStore::new();
        data.set("items", &items(12)).unwrap();
        data.set("labels", &json!({"product": "Product"})).unwrap();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert!(pages.len() > 1);

        // header repeated on every page
        for page in &pages {
            assert!(texts(page).contains(&"Product".to_string()));
        }
        let last = texts(pages.last().unwrap());
        assert!(last.contains(&"780".to_string()));
        assert!(last.contains(&"item 12".to_string()));
        assert!(last.contains(&"Total".to_string()));
        let total_pages = pages
            .iter()
            .filter(|p| texts(p).contains(&"780".to_string()))
            .count();
        assert_eq!(total_pages, 1);
    }

    #[test]
    fn test_grid_count_footer() {
        let tree = grid_tree("=count");
        let mut data = DataStore::new();
        data.set("items", &items(3)).unwrap();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert!(texts(&pages[0]).contains(&"3".to_string()));
    }

    #[test]
    fn test_empty_grid_has_header_and_zero_footer() {
        let tree = grid_tree("=sum");
        let mut data = DataStore::new();
        data.set_list("items", Vec::new()).unwrap();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            texts(&pages[0]),
            vec!["labels.product", "Amount", "Total", "0"]
        );
    }

    #[test]
    fn test_missing_binding_renders_no_rows() {
        let tree = grid_tree("=sum");
        let data = DataStore::new();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert!(texts(&pages[0]).contains(&"0".to_string()));
    }

    #[test]
    fn test_grid_bound_to_text_fails() {
        let tree = grid_tree("=sum");
        let mut data = DataStore::new();
        data.set_text("items", "not a list").unwrap();
        let config = ReportConfig::default();
        let err = LayoutEngine::new(&tree, &data, &config).layout().unwrap_err();
        assert!(matches!(err, ReportError::Layout { source: None, .. }));
    }

    #[test]
    fn test_hidden_header_and_column_widths() {
        let mut tree = ElementTree::new();
        let grid = tree
            .append(
                Section::Details,
                ElementKind::Datagrid,
                &props(json!({"databind": "items", "header": false, "border": "1"})),
            )
            .unwrap();
        tree.append(grid, ElementKind::Column, &props(json!({"fieldname": "product", "width": 40})))
            .unwrap();
        tree.append(grid, ElementKind::Column, &props(json!({"fieldname": "amount"})))
            .unwrap();
        let mut data = DataStore::new();
        data.set("items", &items(1)).unwrap();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(texts(&pages[0]), vec!["item 1", "10"]);
        let widths: Vec<f64> = pages[0]
            .elements
            .iter()
            .filter(|e| matches!(e.draw, DrawCommand::Rect { .. }))
            .map(|e| e.width)
            .collect();
        assert_eq!(widths, vec![40.0, 150.0]);
    }
}
