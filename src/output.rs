//! Result rows and the CSV file they are written to.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Result, TileError};
use crate::raster::GeoBounds;
use crate::tile::Tile;

/// Leading columns shared by every operation.
pub const BASE_COLUMNS: [&str; 3] = ["tile_id", "date", "bounds"];

/// One tile's result: id, `YYYY-MM-DD` date, bounds, then the analytic values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    timestamp: i64,
    fields: Vec<String>,
}

impl OutputRow {
    pub fn assemble(tile: &Tile, bounds: &GeoBounds, values: &[f64]) -> Self {
        let mut fields = Vec::with_capacity(BASE_COLUMNS.len() + values.len());
        fields.push(tile.id.clone());
        fields.push(tile.formatted_date());
        fields.push(bounds.to_string());
        fields.extend(values.iter().map(|&v| format_value(v)));
        Self {
            timestamp: tile.timestamp,
            fields,
        }
    }

    pub fn tile_id(&self) -> &str {
        &self.fields[0]
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Shortest decimal string that reads back as the same f64.
pub fn format_value(value: f64) -> String {
    value.to_string()
}

/// Header row for an operation with the given value columns.
pub fn header(value_names: &[String]) -> Vec<String> {
    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(value_names.iter().cloned())
        .collect()
}

/// Orders rows by tile id, then acquisition time.
pub fn sort_rows(rows: &mut [OutputRow]) {
    rows.sort_by(|a, b| {
        a.tile_id()
            .cmp(b.tile_id())
            .then(a.timestamp.cmp(&b.timestamp))
    });
}

/// CSV writer over any sink.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Creates `path`, and its parent directory when missing.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                TileError::Output(format!(
                    "failed to create output directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        let file = File::create(path).map_err(|e| {
            TileError::Output(format!("failed to create csv file {}: {e}", path.display()))
        })?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(true).from_writer(inner),
        }
    }

    pub fn write_header(&mut self, value_names: &[String]) -> Result<()> {
        self.writer.write_record(header(value_names))?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        self.writer.write_record(row.fields())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| TileError::Output(format!("failed to flush csv output: {}", e.error())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, date: &str) -> Tile {
        Tile {
            id: id.to_string(),
            date: date.to_string(),
            timestamp: crate::tile::parse_date_token(date).unwrap(),
        }
    }

    fn bounds() -> GeoBounds {
        GeoBounds {
            min_lon: -1.5,
            min_lat: 0.0,
            max_lon: 1.0,
            max_lat: 2.25,
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.3), "0.3");
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.0 / 3.0), "0.3333333333333333");
        assert_eq!(format_value(1e-7), "0.0000001");
    }

    #[test]
    fn test_assemble() {
        let row = OutputRow::assemble(&tile("9q8y", "20200315T101010"), &bounds(), &[0.5, 12.0]);
        assert_eq!(row.tile_id(), "9q8y");
        assert_eq!(
            row.fields(),
            &[
                "9q8y",
                "2020-03-15",
                "-1.500000,0.000000,1.000000,0.000000,1.000000,2.250000,-1.500000,2.250000",
                "0.5",
                "12",
            ]
        );
    }

    #[test]
    fn test_sort_rows() {
        let mut rows = vec![
            OutputRow::assemble(&tile("B", "20200101T000000"), &bounds(), &[1.0]),
            OutputRow::assemble(&tile("A", "20200301T000000"), &bounds(), &[2.0]),
            OutputRow::assemble(&tile("A", "20200201T000000"), &bounds(), &[3.0]),
        ];
        sort_rows(&mut rows);
        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.tile_id(), r.fields()[1].as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("A", "2020-02-01"), ("A", "2020-03-01"), ("B", "2020-01-01")]
        );
    }

    #[test]
    fn test_csv_output() {
        let mut sink = CsvSink::from_writer(Vec::new());
        sink.write_header(&["water".to_string(), "forest".to_string()])
            .unwrap();
        sink.write_row(&OutputRow::assemble(
            &tile("A1", "20200101T000000"),
            &bounds(),
            &[2.0, 1.0],
        ))
        .unwrap();
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("tile_id,date,bounds,water,forest"));
        let bounds = "-1.500000,0.000000,1.000000,0.000000,1.000000,2.250000,-1.500000,2.250000";
        assert_eq!(
            lines.next(),
            Some(format!("A1,2020-01-01,\"{bounds}\",2,1").as_str())
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_create_makes_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.write_header(&["mean_ndvi".to_string()]).unwrap();
        sink.finish().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "tile_id,date,bounds,mean_ndvi\n"
        );
    }
}
