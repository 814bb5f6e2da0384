//! Renders a period's records and summaries as markdown tables, JSON or CSV.

use crate::error::Res;
use crate::model::{
    Reais, Record, ACCOUNT, CATEGORY, DESCRIPTION, FINANCIAL_CATEGORY, ID, OPERATION_TYPE, PERIOD,
    SUPPLIER, VALUE,
};
use crate::summary::{self, Summaries, SummaryRow};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{Debug, Display, Formatter};

/// Shown in place of the detail table when the period has no records.
pub const NO_DATA: &str = "No data found for the selected period.";

/// Which part of the period view to show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Tab {
    /// Every record of the period.
    Detail,
    /// Totals by operation type.
    Type,
    /// Totals by operation type and financial category.
    FinancialCategory,
    /// Totals by operation type and accounting account.
    Account,
    /// All of the above.
    #[default]
    All,
}

serde_plain::derive_display_from_serialize!(Tab);
serde_plain::derive_fromstr_from_deserialize!(Tab);

/// The output format of the period view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Markdown tables with amounts formatted as Brazilian Reais.
    #[default]
    Table,
    /// A JSON object with the records and the numeric totals.
    Json,
    /// CSV with raw numeric amounts. Tables are separated by a blank line.
    Csv,
}

serde_plain::derive_display_from_serialize!(Format);
serde_plain::derive_fromstr_from_deserialize!(Format);

/// The rendered period view.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    Json(Value),
    /// Markdown tables as a single string.
    Table(String),
    /// CSV data as a single string.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

/// A titled grid of cells.
#[derive(Debug, Clone, PartialEq)]
struct Grid {
    title: &'static str,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

const DETAIL: &str = "Detail";

const DETAIL_COLUMNS: [&str; 9] = [
    ID,
    PERIOD,
    OPERATION_TYPE,
    CATEGORY,
    SUPPLIER,
    DESCRIPTION,
    FINANCIAL_CATEGORY,
    ACCOUNT,
    VALUE,
];

/// Renders the records of one period. `view` must already be filtered to `period`.
pub fn render(period: &str, view: &[&Record], tab: Tab, format: Format) -> Res<Rows> {
    match format {
        Format::Table => Ok(Rows::Table(markdown(period, view, tab))),
        Format::Json => Ok(Rows::Json(to_json(period, view, tab))),
        Format::Csv => Ok(Rows::Csv(to_csv(view, tab)?)),
    }
}

fn markdown(period: &str, view: &[&Record], tab: Tab) -> String {
    let mut out = format!("# {period}\n");
    if matches!(tab, Tab::Detail | Tab::All) && view.is_empty() {
        out.push_str(&format!("\n## {DETAIL}\n\n{NO_DATA}\n"));
    }
    for grid in grids(view, tab, Reais) {
        if grid.title == DETAIL && view.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n\n", grid.title));
        out.push_str(&markdown_table(&grid));
    }
    if matches!(tab, Tab::Detail | Tab::All) && !view.is_empty() {
        out.push_str(&format!("\nTotal: {}\n", Reais(summary::total(view))));
    }
    out
}

fn to_csv(view: &[&Record], tab: Tab) -> Res<String> {
    let mut sections = Vec::new();
    for grid in grids(view, tab, |n| n) {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(&grid.headers)
            .context("Unable to write CSV headers")?;
        for row in &grid.rows {
            writer.write_record(row).context("Unable to write a CSV row")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Unable to finish writing CSV: {e}"))?;
        sections.push(String::from_utf8(bytes).context("CSV output is not UTF-8")?);
    }
    Ok(sections.join("\n"))
}

fn to_json(period: &str, view: &[&Record], tab: Tab) -> Value {
    let summaries = Summaries::new(view);
    let mut out = Map::new();
    out.insert("period".to_string(), json!(period));
    if matches!(tab, Tab::Detail | Tab::All) {
        out.insert("records".to_string(), json!(view));
        out.insert("total".to_string(), json!(summary::total(view)));
    }
    if matches!(tab, Tab::Type | Tab::All) {
        let rows = summary_json(&[OPERATION_TYPE], &summaries.by_type);
        out.insert("by_type".to_string(), rows);
    }
    if matches!(tab, Tab::FinancialCategory | Tab::All) {
        let keys = [OPERATION_TYPE, FINANCIAL_CATEGORY];
        let rows = summary_json(&keys, &summaries.by_type_and_financial_category);
        out.insert("by_type_and_financial_category".to_string(), rows);
    }
    if matches!(tab, Tab::Account | Tab::All) {
        let keys = [OPERATION_TYPE, ACCOUNT];
        let rows = summary_json(&keys, &summaries.by_type_and_account);
        out.insert("by_type_and_account".to_string(), rows);
    }
    Value::Object(out)
}

/// Each summary row becomes an object keyed by the document's column names.
fn summary_json(key_names: &[&str], rows: &[SummaryRow]) -> Value {
    let objects = rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (name, key) in key_names.iter().zip(&row.keys) {
                object.insert(name.to_string(), json!(key));
            }
            object.insert(VALUE.to_string(), json!(row.total));
            Value::Object(object)
        })
        .collect();
    Value::Array(objects)
}

/// Builds the grids for `tab`. `amount` decides how totals and values are written into cells.
fn grids<A: Display>(view: &[&Record], tab: Tab, amount: impl Fn(f64) -> A) -> Vec<Grid> {
    let mut grids = Vec::new();
    if matches!(tab, Tab::Detail | Tab::All) {
        grids.push(Grid {
            title: DETAIL,
            headers: DETAIL_COLUMNS.to_vec(),
            rows: view.iter().map(|r| detail_row(r, &amount)).collect(),
        });
    }
    if matches!(tab, Tab::Type | Tab::All) {
        grids.push(summary_grid(
            "By operation type",
            vec![OPERATION_TYPE],
            summary::by_type(view),
            &amount,
        ));
    }
    if matches!(tab, Tab::FinancialCategory | Tab::All) {
        grids.push(summary_grid(
            "By operation type and financial category",
            vec![OPERATION_TYPE, FINANCIAL_CATEGORY],
            summary::by_type_and_financial_category(view),
            &amount,
        ));
    }
    if matches!(tab, Tab::Account | Tab::All) {
        grids.push(summary_grid(
            "By operation type and account",
            vec![OPERATION_TYPE, ACCOUNT],
            summary::by_type_and_account(view),
            &amount,
        ));
    }
    grids
}

fn detail_row<A: Display>(record: &Record, amount: &impl Fn(f64) -> A) -> Vec<String> {
    vec![
        record.id().map(|id| id.to_string()).unwrap_or_default(),
        record.period().to_string(),
        record.operation_type().to_string(),
        record.category().to_string(),
        record.supplier().to_string(),
        record.description().to_string(),
        record.financial_category().to_string(),
        record.account().to_string(),
        amount(record.value()).to_string(),
    ]
}

fn summary_grid<A: Display>(
    title: &'static str,
    mut headers: Vec<&'static str>,
    rows: Vec<SummaryRow>,
    amount: &impl Fn(f64) -> A,
) -> Grid {
    headers.push(VALUE);
    let rows = rows
        .into_iter()
        .map(|row| {
            let mut cells = row.keys;
            cells.push(amount(row.total).to_string());
            cells
        })
        .collect();
    Grid {
        title,
        headers,
        rows,
    }
}

/// Renders a grid as a markdown table with padded columns.
fn markdown_table(grid: &Grid) -> String {
    let header: Vec<String> = grid.headers.iter().map(|h| escape(h)).collect();
    let rows: Vec<Vec<String>> = grid
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| escape(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| width(h).max(3)).collect();
    for row in &rows {
        for (ix, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(ix) {
                *w = (*w).max(width(cell));
            }
        }
    }

    let mut out = markdown_row(&header, &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&markdown_row(&separator, &widths));
    for row in &rows {
        out.push_str(&markdown_row(row, &widths));
    }
    out
}

fn markdown_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell}{}", " ".repeat(w.saturating_sub(width(cell)))))
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn width(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordSet;

    const DOC: &str = r#"[
        {"id": 1, "Mês/Ano": "2024-01", "TipoOperacao": "Receita", "Categoria Financeira": "Vendas",
         "Conta Contábil": "1.1", "Descrição": "a | b", "Valor": 1234.5},
        {"id": 2, "Mês/Ano": "2024-01", "TipoOperacao": "Despesa", "Categoria Financeira": "Aluguel",
         "Conta Contábil": "2.1", "Valor": "40"},
        {"id": 3, "Mês/Ano": "2024-02", "TipoOperacao": "Despesa", "Valor": 10}
    ]"#;

    fn set() -> RecordSet {
        RecordSet::parse(DOC.as_bytes()).unwrap()
    }

    #[test]
    fn test_markdown_all() {
        let set = set();
        let view = set.filter_by_period("2024-01");
        let rows = render("2024-01", &view, Tab::All, Format::Table).unwrap();
        let text = rows.to_string();
        assert!(text.starts_with("# 2024-01\n"), "{text}");
        assert!(text.contains("## Detail"), "{text}");
        assert!(text.contains("R$ 1.234,50"), "{text}");
        assert!(text.contains("a \\| b"), "{text}");
        assert!(text.contains("## By operation type\n"), "{text}");
        assert!(text.contains("## By operation type and financial category"), "{text}");
        assert!(text.contains("## By operation type and account"), "{text}");
        assert!(text.contains("Total: R$ 1.274,50"), "{text}");
        assert!(!text.contains("2024-02"), "{text}");
    }

    #[test]
    fn test_markdown_table_layout() {
        let grid = Grid {
            title: "t",
            headers: vec!["a", "bb"],
            rows: vec![vec!["xyzw".to_string(), "1".to_string()]],
        };
        let expected = "| a    | bb  |\n| ---- | --- |\n| xyzw | 1   |\n";
        assert_eq!(markdown_table(&grid), expected);
    }

    #[test]
    fn test_summary_order_in_table() {
        let set = set();
        let view = set.filter_by_period("2024-01");
        let text = render("2024-01", &view, Tab::Type, Format::Table)
            .unwrap()
            .to_string();
        let receita = text.find("Receita").unwrap();
        let despesa = text.find("Despesa").unwrap();
        assert!(receita < despesa, "{text}");
        assert!(!text.contains("## Detail"), "{text}");
    }

    #[test]
    fn test_empty_period() {
        let set = set();
        let view = set.filter_by_period("1999-12");
        let text = render("1999-12", &view, Tab::All, Format::Table)
            .unwrap()
            .to_string();
        assert!(text.contains(NO_DATA), "{text}");
        assert!(!text.contains("Total:"), "{text}");

        let Rows::Json(json) = render("1999-12", &view, Tab::All, Format::Json).unwrap() else {
            panic!("expected JSON");
        };
        assert_eq!(json["records"], json!([]));
        assert_eq!(json["by_type"], json!([]));
        assert_eq!(json["total"], 0.0);
    }

    #[test]
    fn test_json() {
        let set = set();
        let view = set.filter_by_period("2024-01");
        let Rows::Json(json) = render("2024-01", &view, Tab::All, Format::Json).unwrap() else {
            panic!("expected JSON");
        };
        assert_eq!(json["period"], "2024-01");
        assert_eq!(json["records"].as_array().unwrap().len(), 2);
        assert_eq!(json["records"][1]["Valor"], "40");
        assert_eq!(json["total"], 1274.5);
        assert_eq!(
            json["by_type"],
            json!([
                {"TipoOperacao": "Receita", "Valor": 1234.5},
                {"TipoOperacao": "Despesa", "Valor": 40.0}
            ])
        );
        assert_eq!(
            json["by_type_and_account"][1],
            json!({"TipoOperacao": "Despesa", "Conta Contábil": "2.1", "Valor": 40.0})
        );
    }

    #[test]
    fn test_json_single_tab() {
        let set = set();
        let view = set.filter_by_period("2024-02");
        let Rows::Json(json) = render("2024-02", &view, Tab::Account, Format::Json).unwrap()
        else {
            panic!("expected JSON");
        };
        assert!(json.get("records").is_none());
        assert!(json.get("by_type").is_none());
        assert_eq!(
            json["by_type_and_account"],
            json!([{"TipoOperacao": "Despesa", "Conta Contábil": "", "Valor": 10.0}])
        );
    }

    #[test]
    fn test_csv() {
        let set = set();
        let view = set.filter_by_period("2024-01");
        let text = render("2024-01", &view, Tab::Detail, Format::Csv)
            .unwrap()
            .to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,Mês/Ano,TipoOperacao,Categoria,Fornecedor,Descrição,Categoria Financeira,\
            Conta Contábil,Valor"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,2024-01,Receita,,,a | b,Vendas,1.1,1234.5"
        );
        assert_eq!(lines.next().unwrap(), "2,2024-01,Despesa,,,,Aluguel,2.1,40");
    }

    #[test]
    fn test_csv_all_sections() {
        let set = set();
        let view = set.filter_by_period("2024-01");
        let text = render("2024-01", &view, Tab::All, Format::Csv)
            .unwrap()
            .to_string();
        let sections: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(sections.len(), 4, "{text}");
        assert!(sections[1].starts_with("TipoOperacao,Valor\n"), "{text}");
    }

    #[test]
    fn test_tab_and_format_names() {
        assert_eq!(Tab::FinancialCategory.to_string(), "financial-category");
        assert_eq!("account".parse::<Tab>().unwrap(), Tab::Account);
        assert_eq!(Format::Csv.to_string(), "csv");
        assert_eq!(Tab::default(), Tab::All);
    }
}
