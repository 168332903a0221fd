use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use log::info;

use crate::error::{Error, Result};
use crate::store::{iso_to_serial, Cell, Sheet};

/// Reads every worksheet of an `.xlsx` workbook into grids, in tab order.
///
/// Each grid is anchored at A1 even when the used range starts further
/// in, so grid positions match sheet row numbers. Formula cells keep
/// their formula text next to the cached value. A worksheet that cannot
/// be parsed fails the load.
pub fn load_excel(path: &Path) -> Result<Vec<Sheet>> {
    let mut excel: Xlsx<_> = open_workbook(path)?;

    let names = excel.sheet_names().to_vec();
    if names.is_empty() {
        return Err(Error::SchemaMissing {
            path: path.to_path_buf(),
            reason: "workbook has no worksheet".to_string(),
        });
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = excel.worksheet_range(&name)?;
        let formulas = excel.worksheet_formula(&name)?;

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        if let Some((start_row, start_col)) = range.start() {
            for (r, c, data) in range.used_cells() {
                place(&mut rows, start_row as usize + r, start_col as usize + c, cell_from_data(data));
            }
        }
        if let Some((start_row, start_col)) = formulas.start() {
            for (r, c, formula) in formulas.used_cells() {
                let (row, col) = (start_row as usize + r, start_col as usize + c);
                let value = take(&mut rows, row, col);
                place(&mut rows, row, col, Cell::Formula { formula: formula.clone(), value: Box::new(value) });
            }
        }
        sheets.push(Sheet { name, rows });
    }

    info!("Loaded {} rows from worksheet '{}' in {:?}", sheets[0].rows.len(), sheets[0].name, path);
    Ok(sheets)
}

fn place(rows: &mut Vec<Vec<Cell>>, row: usize, col: usize, cell: Cell) {
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, Cell::Empty);
    }
    cells[col] = cell;
}

fn take(rows: &mut [Vec<Cell>], row: usize, col: usize) -> Cell {
    rows.get_mut(row)
        .and_then(|cells| cells.get_mut(col))
        .map(|cell| std::mem::replace(cell, Cell::Empty))
        .unwrap_or(Cell::Empty)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) => iso_to_serial(s).map_or_else(|| Cell::Text(s.clone()), Cell::DateTime),
        // ISO 8601 durations ("PT1H30M") have no serial form in the file.
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Reads a headed CSV file into a grid. Rows may have differing widths.
pub fn load_csv(path: &Path) -> Result<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Cell::Empty } else { Cell::Text(field.to_string()) })
                .collect(),
        );
    }

    info!("Loaded {} rows from CSV {:?}", rows.len(), path);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());
    Ok(Sheet { name, rows })
}
