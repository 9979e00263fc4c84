//! CSV reader for batch site descriptions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use stratus_energy::Site;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Required header columns, matched by name in any order.
pub const SITE_COLUMNS: [&str; 7] = [
    "location_name",
    "latitude",
    "longitude",
    "waterfall_height_m",
    "waterfall_flow_m3s",
    "geo_temp_c",
    "depth_km",
];

/// Reads site descriptions from a CSV file.
///
/// Expected CSV format:
/// - Header row naming every column of [`SITE_COLUMNS`]; extra columns are ignored
/// - One row per site, unique `location_name`
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Numeric cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidSite`] | Empty name or a negative height, flow or depth |
/// | [`IoError::DuplicateSite`] | Same `location_name` appears twice |
pub struct SiteReader {
    path: PathBuf,
}

impl SiteReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<Site>, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        let mut index = [0usize; SITE_COLUMNS.len()];
        for (slot, column) in index.iter_mut().zip(SITE_COLUMNS) {
            *slot = header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or_else(|| IoError::MissingColumn {
                    path: self.path.clone(),
                    column: column.to_string(),
                })?;
        }
        debug!(expected_cols, "read CSV header");

        let mut sites = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let name = record.get(index[0]).unwrap_or("").trim().to_string();
            if name.is_empty() {
                return Err(IoError::InvalidSite {
                    path: self.path.clone(),
                    row_index,
                    reason: "empty location_name".to_string(),
                });
            }
            if let Some(&first_row) = seen.get(&name) {
                return Err(IoError::DuplicateSite {
                    path: self.path.clone(),
                    name,
                    first_row,
                    second_row: row_index,
                });
            }

            let mut numbers = [0.0; SITE_COLUMNS.len() - 1];
            for (value, (&col, column)) in numbers
                .iter_mut()
                .zip(index.iter().zip(SITE_COLUMNS).skip(1))
            {
                let raw = record.get(col).unwrap_or("").trim();
                *value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: column.to_string(),
                        raw: raw.to_string(),
                    })?;
            }
            let [latitude, longitude, height, flow, geo_temp, depth] = numbers;
            for (column, value) in [
                ("waterfall_height_m", height),
                ("waterfall_flow_m3s", flow),
                ("depth_km", depth),
            ] {
                if value < 0.0 {
                    return Err(IoError::InvalidSite {
                        path: self.path.clone(),
                        row_index,
                        reason: format!("{column} is negative ({value})"),
                    });
                }
            }

            seen.insert(name.clone(), row_index);
            sites.push(Site {
                location_name: name,
                latitude,
                longitude,
                waterfall_height_m: height,
                waterfall_flow_m3s: flow,
                geo_temp_c: geo_temp,
                depth_km: depth,
            });
        }

        if sites.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        info!(n_sites = sites.len(), "sites loaded");
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "location_name,latitude,longitude,waterfall_height_m,waterfall_flow_m3s,geo_temp_c,depth_km\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn read(rows: &str) -> Result<Vec<Site>, IoError> {
        let f = write_csv(&format!("{HEADER}{rows}"));
        SiteReader::new(f.path()).read()
    }

    #[test]
    fn read_three_sites() {
        let sites = read(
            "Chittagong Hills,22.3569,91.7832,45,8.5,180,2.8\n\
             Sylhet Valley,24.8949,91.8687,30,12.0,150,2.5\n\
             Khulna Region,22.8456,89.5403,0,0,200,3.5\n",
        )
        .unwrap();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[1].location_name, "Sylhet Valley");
        assert_eq!(sites[1].waterfall_flow_m3s, 12.0);
        assert!(!sites[2].has_waterfall());
        assert!(sites[2].has_geothermal());
    }

    #[test]
    fn columns_matched_by_name() {
        let f = write_csv(
            "depth_km,location_name,notes,geo_temp_c,waterfall_flow_m3s,waterfall_height_m,longitude,latitude\n\
             2.0,Madhabkunda,tall,150,8.5,45,92.22,24.64\n",
        );
        let sites = SiteReader::new(f.path()).read().unwrap();
        assert_eq!(sites[0].latitude, 24.64);
        assert_eq!(sites[0].depth_km, 2.0);
        assert_eq!(sites[0].waterfall_height_m, 45.0);
    }

    #[test]
    fn error_missing_column() {
        let f = write_csv("location_name,latitude\nA,1.0\n");
        assert!(matches!(
            SiteReader::new(f.path()).read(),
            Err(IoError::MissingColumn { ref column, .. }) if column == "longitude"
        ));
    }

    #[test]
    fn error_empty_dataset() {
        assert!(matches!(read(""), Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_negative_flow() {
        assert!(matches!(
            read("A,1,1,45,-2,150,2\n"),
            Err(IoError::InvalidSite { row_index: 0, .. })
        ));
    }

    #[test]
    fn error_unparseable_number() {
        assert!(matches!(
            read("A,1,1,45,deep,150,2\n"),
            Err(IoError::NonFiniteValue { ref column, .. }) if column == "waterfall_flow_m3s"
        ));
    }

    #[test]
    fn error_duplicate_site() {
        assert!(matches!(
            read("A,1,1,45,2,150,2\nB,1,1,45,2,150,2\nA,2,2,45,2,150,2\n"),
            Err(IoError::DuplicateSite { first_row: 0, second_row: 2, .. })
        ));
    }
}
