//! Tabular contact storage.
//!
//! The list has a fixed five-column layout (sequence, name, phone,
//! message, status) with a header in sheet row 1 and data from row 2.
//! Status writes are held in memory until `flush`, which rewrites the
//! whole file through a temp file and an atomic rename.

use std::fmt;
use std::fs::{self, File};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use rust_xlsxwriter::{Format as XlsxFormat, Formula, Workbook, Worksheet};

use crate::contact::{ContactRecord, Status};
use crate::error::{Error, Result};
use crate::input_loader;

pub const HEADER_ROW: usize = 1;
pub const FIRST_DATA_ROW: usize = 2;
pub const STATUS_COLUMN: usize = 4;
const SCHEMA_COLUMNS: usize = 5;

pub trait ContactStore {
    /// Sheet row numbers holding data, in file order.
    fn data_rows(&self) -> RangeInclusive<usize>;
    fn read_record(&self, row: usize) -> Result<ContactRecord>;
    fn write_status(&mut self, row: usize, status: Status) -> Result<()>;
    /// Persists every pending write to durable storage.
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    /// Date or date-time as a spreadsheet serial (days since 1899-12-30).
    DateTime(f64),
    /// Elapsed time in days.
    Duration(f64),
    /// Formula text (without the leading `=`) and its cached value.
    Formula { formula: String, value: Box<Cell> },
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) if serial.fract() == 0.0 => write!(f, "{}", dt.format("%Y-%m-%d")),
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", serial),
            },
            Cell::Duration(days) => {
                let secs = (days * 86_400.0).round() as i64;
                write!(f, "{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
            }
            Cell::Formula { value, .. } => write!(f, "{}", value),
        }
    }
}

fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let millis = (serial * 86_400_000.0).round() as i64;
    excel_epoch()?.checked_add_signed(chrono::Duration::milliseconds(millis))
}

/// Spreadsheet serial for an ISO 8601 date or date-time.
pub fn iso_to_serial(iso: &str) -> Option<f64> {
    let dt = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)))?;
    let elapsed = dt.signed_duration_since(excel_epoch()?);
    Some(elapsed.num_milliseconds() as f64 / 86_400_000.0)
}

/// In-memory grid of one worksheet. `rows[0]` is sheet row 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn data_rows(&self) -> RangeInclusive<usize> {
        FIRST_DATA_ROW..=self.rows.len()
    }

    pub fn cell_text(&self, row: usize, col: usize) -> String {
        row.checked_sub(1)
            .and_then(|r| self.rows.get(r))
            .and_then(|cells| cells.get(col))
            .map(|c| c.to_string())
            .unwrap_or_default()
    }

    pub fn record(&self, row: usize) -> Result<ContactRecord> {
        if !self.data_rows().contains(&row) {
            return Err(Error::RowOutOfRange(row));
        }
        let cells: Vec<String> = (0..SCHEMA_COLUMNS).map(|col| self.cell_text(row, col)).collect();
        Ok(ContactRecord::from_cells(
            row,
            [
                cells[0].as_str(),
                cells[1].as_str(),
                cells[2].as_str(),
                cells[3].as_str(),
                cells[4].as_str(),
            ],
        ))
    }

    pub fn set_status(&mut self, row: usize, status: Status) -> Result<()> {
        if !self.data_rows().contains(&row) {
            return Err(Error::RowOutOfRange(row));
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < SCHEMA_COLUMNS {
            cells.resize(SCHEMA_COLUMNS, Cell::Empty);
        }
        cells[STATUS_COLUMN] = Cell::Text(status.as_cell().to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Workbook,
    Csv,
}

impl Format {
    /// Only plain `.xlsx` and `.csv` are rewritten; a macro workbook
    /// (`.xlsm`) or legacy `.xls` would lose content on rewrite.
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(Format::Workbook),
            "csv" => Ok(Format::Csv),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A contact list backed by an `.xlsx` workbook or a CSV file.
///
/// Only the first worksheet holds contacts; the others are written back
/// unchanged on flush.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    format: Format,
    sheet: Sheet,
    others: Vec<Sheet>,
}

/// Opens the contact list at `path`. A missing file or a file without a
/// header row is fatal.
pub fn open_store<P: AsRef<Path>>(path: P) -> Result<FileStore> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::StoreNotFound(path.to_path_buf()));
    }

    let format = Format::detect(path)?;
    let (sheet, others) = match format {
        Format::Workbook => {
            let mut sheets = input_loader::load_excel(path)?.into_iter();
            let first = sheets.next().ok_or_else(|| Error::SchemaMissing {
                path: path.to_path_buf(),
                reason: "workbook has no worksheet".to_string(),
            })?;
            (first, sheets.collect())
        }
        Format::Csv => (input_loader::load_csv(path)?, Vec::new()),
    };

    if sheet.rows.len() < HEADER_ROW {
        return Err(Error::SchemaMissing {
            path: path.to_path_buf(),
            reason: "header row missing".to_string(),
        });
    }

    Ok(FileStore { path: path.to_path_buf(), format, sheet, others })
}

impl FileStore {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Number of data rows, empty ones included.
    pub fn row_count(&self) -> usize {
        self.sheet.rows.len().saturating_sub(HEADER_ROW)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }

    fn write_workbook(&self, target: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        for sheet in std::iter::once(&self.sheet).chain(&self.others) {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name.as_str())?;

            for (r, cells) in sheet.rows.iter().enumerate() {
                for (c, cell) in cells.iter().enumerate() {
                    write_cell(worksheet, r as u32, c as u16, cell)?;
                }
            }
        }

        workbook.save(target)?;
        Ok(())
    }

    fn write_csv(&self, target: &Path) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(target)?;
        for cells in &self.sheet.rows {
            wtr.write_record(cells.iter().map(|c| c.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Number format that keeps date and duration cells readable as such.
fn number_format(cell: &Cell) -> Option<XlsxFormat> {
    let pattern = match cell {
        Cell::DateTime(serial) if serial.fract() == 0.0 => "yyyy-mm-dd",
        Cell::DateTime(_) => "yyyy-mm-dd hh:mm:ss",
        Cell::Duration(_) => "[h]:mm:ss",
        _ => return None,
    };
    Some(XlsxFormat::new().set_num_format(pattern))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            worksheet.write_string(row, col, s.as_str())?;
        }
        Cell::Int(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Cell::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Cell::DateTime(serial) | Cell::Duration(serial) => match number_format(cell) {
            Some(format) => {
                worksheet.write_number_with_format(row, col, *serial, &format)?;
            }
            None => {
                worksheet.write_number(row, col, *serial)?;
            }
        },
        Cell::Formula { formula, value } => {
            let formula = Formula::new(formula.as_str()).set_result(value.to_string());
            match number_format(value) {
                Some(format) => {
                    worksheet.write_formula_with_format(row, col, formula, &format)?;
                }
                None => {
                    worksheet.write_formula(row, col, formula)?;
                }
            }
        }
    }
    Ok(())
}

/// Writes `path` through `tmp`: the new content is written and synced,
/// renamed over `path`, and the directory entry synced. On a failed
/// write the temp file is removed and `path` is left as it was.
fn replace_atomically<F>(path: &Path, tmp: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let written = write(tmp).and_then(|()| {
        File::open(tmp)?.sync_all()?;
        Ok(())
    });
    if let Err(e) = written {
        if tmp.exists() {
            if let Err(cleanup) = fs::remove_file(tmp) {
                warn!("Could not remove temp file {:?}: {}", tmp, cleanup);
            }
        }
        return Err(e);
    }

    fs::rename(tmp, path)?;
    sync_parent_dir(path)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

impl ContactStore for FileStore {
    fn data_rows(&self) -> RangeInclusive<usize> {
        self.sheet.data_rows()
    }

    fn read_record(&self, row: usize) -> Result<ContactRecord> {
        self.sheet.record(row)
    }

    fn write_status(&mut self, row: usize, status: Status) -> Result<()> {
        self.sheet.set_status(row, status)
    }

    fn flush(&mut self) -> Result<()> {
        let tmp = self.temp_path();
        replace_atomically(&self.path, &tmp, |target| match self.format {
            Format::Workbook => self.write_workbook(target),
            Format::Csv => self.write_csv(target),
        })?;
        debug!("Flushed {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bulk-sender-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    fn write_contacts_csv(path: &Path) {
        fs::write(
            path,
            "Sr No,Name,Contact No,Message,Status\n\
             1,Asha,+911111111111,Hello Asha,\n\
             2,Bo,,Hello Bo,\n\
             3,Cy,+913333333333,Hello Cy,✅Done\n",
        )
        .unwrap();
    }

    #[test]
    fn test_missing_store_is_fatal() {
        let err = open_store(temp_file("xlsx")).unwrap_err();
        assert!(matches!(err, Error::StoreNotFound(_)));
    }

    #[test]
    fn test_format_detect() {
        assert_eq!(Format::detect(Path::new("db/wp-contact.xlsx")).unwrap(), Format::Workbook);
        assert_eq!(Format::detect(Path::new("LIST.XLSX")).unwrap(), Format::Workbook);
        assert_eq!(Format::detect(Path::new("list.csv")).unwrap(), Format::Csv);
        assert!(matches!(Format::detect(Path::new("macros.xlsm")), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(Format::detect(Path::new("old.xls")), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(Format::detect(Path::new("contacts")), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_macro_workbook_is_not_opened() {
        let path = temp_file("xlsm");
        fs::write(&path, b"PK").unwrap();
        assert!(matches!(open_store(&path), Err(Error::UnsupportedFormat(_))));
        assert_eq!(fs::read(&path).unwrap(), b"PK");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_xlsx_dates_and_formulas_survive_flush() {
        let path = temp_file("xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, header) in ["Sr No", "Name", "Contact No", "Message", "Status", "Joined", "Window"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        worksheet.write_number(1, 0, 1.0).unwrap();
        worksheet.write_string(1, 1, "Asha").unwrap();
        worksheet.write_string(1, 2, "+911111111111").unwrap();
        worksheet.write_string(1, 3, "Hello").unwrap();
        let date = XlsxFormat::new().set_num_format("yyyy-mm-dd");
        worksheet.write_number_with_format(1, 5, 45366.0, &date).unwrap();
        let span = XlsxFormat::new().set_num_format("[h]:mm:ss");
        worksheet.write_number_with_format(1, 6, 0.0625, &span).unwrap();
        worksheet.write_formula(2, 0, Formula::new("=A2+1").set_result("2")).unwrap();
        workbook.save(&path).unwrap();

        let mut store = open_store(&path).unwrap();
        assert_eq!(store.sheet().rows[1][5], Cell::DateTime(45366.0));
        store.write_status(2, Status::Done).unwrap();
        store.flush().unwrap();

        let reopened = open_store(&path).unwrap();
        let rows = &reopened.sheet().rows;
        assert_eq!(rows[1][5], Cell::DateTime(45366.0));
        assert_eq!(reopened.sheet().cell_text(2, 5), "2024-03-15");
        assert_eq!(rows[1][6], Cell::Duration(0.0625));
        assert_eq!(reopened.sheet().cell_text(2, 6), "1:30:00");
        match &rows[2][0] {
            Cell::Formula { formula, value } => {
                assert_eq!(formula, "A2+1");
                assert_eq!(value.to_string(), "2");
            }
            other => panic!("formula lost: {:?}", other),
        }
        assert_eq!(reopened.read_record(2).unwrap().status, Status::Done);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_original_and_no_temp() {
        let path = temp_file("csv");
        write_contacts_csv(&path);
        let before = fs::read(&path).unwrap();
        let tmp = path.with_extension("csv.tmp");

        let result = replace_atomically(&path, &tmp, |target| {
            fs::write(target, "half a row")?;
            Err(Error::Config("disk full".to_string()))
        });

        assert!(matches!(result, Err(Error::Config(_))));
        assert!(!tmp.exists());
        assert_eq!(fs::read(&path).unwrap(), before);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_replace_atomically_swaps_content() {
        let path = temp_file("csv");
        fs::write(&path, "old").unwrap();
        let tmp = path.with_extension("csv.tmp");

        replace_atomically(&path, &tmp, |target| {
            fs::write(target, "new")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!tmp.exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_date_cell_display() {
        assert_eq!(Cell::DateTime(45366.0).to_string(), "2024-03-15");
        assert_eq!(Cell::DateTime(45366.5).to_string(), "2024-03-15 12:00:00");
        assert_eq!(iso_to_serial("2024-03-15"), Some(45366.0));
        assert_eq!(iso_to_serial("not a date"), None);
    }

    #[test]
    fn test_csv_read_records() {
        let path = temp_file("csv");
        write_contacts_csv(&path);

        let store = open_store(&path).unwrap();
        assert_eq!(store.data_rows(), 2..=4);
        assert_eq!(store.row_count(), 3);

        let first = store.read_record(2).unwrap();
        assert_eq!(first.name, "Asha");
        assert_eq!(first.status, Status::Unset);
        assert!(!store.read_record(3).unwrap().is_eligible());
        assert_eq!(store.read_record(4).unwrap().status, Status::Done);
        assert!(matches!(store.read_record(5), Err(Error::RowOutOfRange(5))));
        assert!(matches!(store.read_record(1), Err(Error::RowOutOfRange(1))));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_csv_status_survives_reopen() {
        let path = temp_file("csv");
        write_contacts_csv(&path);

        let mut store = open_store(&path).unwrap();
        store.write_status(2, Status::Failed).unwrap();
        store.flush().unwrap();

        let reopened = open_store(&path).unwrap();
        assert_eq!(reopened.read_record(2).unwrap().status, Status::Failed);
        assert_eq!(reopened.read_record(4).unwrap().status, Status::Done);
        assert_eq!(reopened.sheet().cell_text(HEADER_ROW, 2), "Contact No");
        assert!(!store.temp_path().exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_xlsx_status_survives_reopen() {
        let path = temp_file("xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Contacts").unwrap();
        for (col, header) in ["Sr No", "Name", "Contact No", "Message", "Status"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        worksheet.write_number(1, 0, 1.0).unwrap();
        worksheet.write_string(1, 1, "Asha").unwrap();
        worksheet.write_number(1, 2, 911111111111.0).unwrap();
        worksheet.write_string(1, 3, "Hello Asha").unwrap();
        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "keep me").unwrap();
        workbook.save(&path).unwrap();

        let mut store = open_store(&path).unwrap();
        let record = store.read_record(2).unwrap();
        assert_eq!(record.phone, "911111111111");
        assert_eq!(record.sequence, "1");

        store.write_status(2, Status::Done).unwrap();
        store.flush().unwrap();

        let reopened = open_store(&path).unwrap();
        assert_eq!(reopened.sheet().name, "Contacts");
        let record = reopened.read_record(2).unwrap();
        assert_eq!(record.status, Status::Done);
        assert_eq!(record.phone, "911111111111");
        assert_eq!(reopened.others.len(), 1);
        assert_eq!(reopened.others[0].name, "Notes");
        assert_eq!(reopened.others[0].cell_text(1, 0), "keep me");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_set_status_pads_short_row() {
        let mut sheet = Sheet {
            name: "s".to_string(),
            rows: vec![
                vec![Cell::Text("h".to_string())],
                vec![Cell::Text("1".to_string()), Cell::Text("A".to_string())],
            ],
        };
        sheet.set_status(2, Status::Done).unwrap();
        assert_eq!(sheet.rows[1].len(), 5);
        assert_eq!(sheet.cell_text(2, STATUS_COLUMN), "✅Done");
    }
}
