//! Tile discovery: turns a flat directory of `<id>_<date>_<band>.<ext>` files
//! into per-location, time-ordered tile series.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::METADATA_FILE_NAME;
use crate::error::CatalogError;

const NAME_DELIMITER: char = '_';
const DATE_TOKEN_FORMAT: &str = "%Y%m%dT%H%M%S";

/// One acquisition at one location and date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    pub id: String,
    /// Date as it appears in the file name; used to rebuild per-band file names.
    pub date: String,
    /// Seconds since the epoch, ordering only.
    pub timestamp: i64,
}

impl Tile {
    /// Path of the file holding `band` for this tile.
    pub fn band_path(&self, tile_dir: &Path, band: &str, extension: &str) -> PathBuf {
        tile_dir.join(format!("{}_{}_{}.{}", self.id, self.date, band, extension))
    }

    /// Acquisition date as `YYYY-MM-DD`.
    pub fn formatted_date(&self) -> String {
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Parses a date token such as `20200101T000000` into UTC epoch seconds.
pub fn parse_date_token(token: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(token, DATE_TOKEN_FORMAT)
        .ok()
        .map(|date| date.and_utc().timestamp())
}

/// Counts of directory entries that did not become tiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub entries: usize,
    pub malformed_names: usize,
    pub bad_dates: usize,
    pub duplicates: usize,
}

/// Location id -> tiles ordered by ascending timestamp.
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    series: HashMap<String, Vec<Tile>>,
    seen: HashSet<(String, String)>,
    stats: ScanStats,
}

impl TileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `dir` (non-recursively), skipping the metadata document and any
    /// entry whose name does not parse. Only an unreadable directory is fatal.
    pub fn scan(dir: &Path) -> Result<Self, CatalogError> {
        info!(dir = %dir.display(), "scanning directory");

        let dir_err = |source| CatalogError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(dir_err)? {
            let entry = entry.map_err(dir_err)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        // read_dir order is platform dependent; a sorted listing keeps first-seen-wins reproducible
        names.sort();

        info!("processing {} entries", names.len());
        let mut catalog = Self::new();
        for name in &names {
            catalog.add_file_name(name);
        }
        info!(
            locations = catalog.series.len(),
            tiles = catalog.tile_count(),
            "tile catalog built"
        );
        Ok(catalog)
    }

    /// Registers a single file name. Returns true when it produced a new tile.
    pub fn add_file_name(&mut self, name: &str) -> bool {
        if name == METADATA_FILE_NAME {
            return false;
        }
        self.stats.entries += 1;

        let mut parts = name.split(NAME_DELIMITER);
        let (Some(id), Some(date)) = (parts.next(), parts.next()) else {
            warn!("improperly formatted file name {}", name);
            self.stats.malformed_names += 1;
            return false;
        };

        let Some(timestamp) = parse_date_token(date) else {
            warn!("cannot parse date {} in {}", date, name);
            self.stats.bad_dates += 1;
            return false;
        };

        // one tile per id/date pair, whatever the number of band files
        if !self.seen.insert((id.to_string(), date.to_string())) {
            self.stats.duplicates += 1;
            return false;
        }

        self.insert(Tile {
            id: id.to_string(),
            date: date.to_string(),
            timestamp,
        });
        true
    }

    fn insert(&mut self, tile: Tile) {
        let tiles = self.series.entry(tile.id.clone()).or_default();
        let index = tiles.partition_point(|t| t.timestamp <= tile.timestamp);
        debug!(id = %tile.id, date = %tile.date, index, "inserting tile");
        tiles.insert(index, tile);
    }

    pub fn series(&self, id: &str) -> Option<&[Tile]> {
        self.series.get(id).map(Vec::as_slice)
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn tile_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Every tile, location by location in catalog iteration order.
    pub fn flatten(&self) -> Vec<Tile> {
        self.series.values().flatten().cloned().collect()
    }
}
