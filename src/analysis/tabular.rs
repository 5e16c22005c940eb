use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::chart;
use crate::model::analysis::AnalysisResult;

pub const PREVIEW_ROWS: usize = 10;

/// Header plus data rows, every cell already rendered as text and every row
/// padded to the header width.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    fn from_records(header: Vec<String>, records: Vec<Vec<String>>) -> Result<Self> {
        if header.is_empty() {
            return Err(anyhow!("no header row"));
        }

        let columns: Vec<String> = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let name = name.trim().to_string();
                if name.is_empty() {
                    format!("Unnamed: {i}")
                } else {
                    name
                }
            })
            .collect();

        let width = columns.len();
        let rows = records
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Values of every column holding at least one finite number, limited to
    /// the preview rows.
    pub fn numeric_series(&self) -> Vec<(String, Vec<Option<f64>>)> {
        (0..self.columns.len())
            .filter(|&col| self.rows.iter().any(|row| parse_number(&row[col]).is_some()))
            .map(|col| {
                let values = self
                    .rows
                    .iter()
                    .take(PREVIEW_ROWS)
                    .map(|row| parse_number(&row[col]))
                    .collect();
                (self.columns[col].clone(), values)
            })
            .collect()
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn read_csv(bytes: &[u8]) -> Result<Grid> {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let header = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Grid::from_records(header, records)
}

pub fn read_excel(bytes: Vec<u8>) -> Result<Grid> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("failed to open workbook")?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&first)
        .with_context(|| format!("failed to read sheet `{first}`"))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
    let header = rows.next().ok_or_else(|| anyhow!("sheet `{first}` is empty"))?;

    Grid::from_records(header, rows.collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Data::Error(e) => format!("#ERR:{:?}", e),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Preview table, plus a bar chart when any column is numeric.
pub fn summarize(grid: Grid, filename: &str) -> Result<AnalysisResult> {
    let series = grid.numeric_series();
    let rows: Vec<Vec<String>> = grid.rows.into_iter().take(PREVIEW_ROWS).collect();

    if series.is_empty() {
        return Ok(AnalysisResult::Table {
            columns: grid.columns,
            rows,
            insight: format!(
                "Preview of first {PREVIEW_ROWS} rows from {filename}. No numeric columns detected."
            ),
        });
    }

    let png = chart::bar_chart_png(&series).context("failed to render chart")?;
    Ok(AnalysisResult::Chart {
        image: chart::data_uri(&png),
        columns: grid.columns,
        rows,
        insight: format!(
            "Extracted numeric trends from {filename}. Showing first {PREVIEW_ROWS} rows."
        ),
    })
}
