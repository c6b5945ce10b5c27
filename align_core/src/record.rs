//! Append-only scan record: one `index x y local_dbm remote_dbm` line per
//! completed scan point.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::WrapErr;

use crate::types::{Position, ScanSample};

pub struct ScanRecord {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl core::fmt::Debug for ScanRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanRecord").field("path", &self.path).finish()
    }
}

impl ScanRecord {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .wrap_err_with(|| format!("open scan record {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line and flush it.
    pub fn append(&mut self, sample: &ScanSample) -> eyre::Result<()> {
        self.writer
            .write_record([
                sample.index.to_string(),
                sample.position.x.to_string(),
                sample.position.y.to_string(),
                format!("{:.6}", sample.local_dbm),
                format!("{:.6}", sample.remote_dbm),
            ])
            .map_err(|e| eyre::eyre!("write scan record {}: {}", self.path.display(), e))?;
        self.writer
            .flush()
            .wrap_err_with(|| format!("flush scan record {}", self.path.display()))
    }
}

fn field<T: std::str::FromStr>(rec: &csv::StringRecord, i: usize, line: u64) -> eyre::Result<T> {
    rec.get(i)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| eyre::eyre!("scan record line {line}: bad field {}", i + 1))
}

/// Parse a scan record. Blank fields from trailing whitespace are ignored and
/// coordinates written as decimals are rounded.
pub fn read_scan_record(path: &Path) -> eyre::Result<Vec<ScanSample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open scan record {:?}: {}", path, e))?;

    let mut out = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx as u64 + 1;
        let rec = rec.map_err(|e| eyre::eyre!("invalid scan record line {line}: {e}"))?;
        let rec: csv::StringRecord = rec.iter().filter(|f| !f.is_empty()).collect();
        if rec.is_empty() {
            continue;
        }
        if rec.len() != 5 {
            eyre::bail!("scan record line {line}: expected 5 fields, got {}", rec.len());
        }
        let x: f64 = field(&rec, 1, line)?;
        let y: f64 = field(&rec, 2, line)?;
        out.push(ScanSample {
            index: field(&rec, 0, line)?,
            position: Position::new(x.round() as i32, y.round() as i32),
            local_dbm: field(&rec, 3, line)?,
            remote_dbm: field(&rec, 4, line)?,
        });
    }
    Ok(out)
}

/// Sample with the highest remote power; the first one wins ties.
pub fn best_sample(samples: &[ScanSample]) -> Option<&ScanSample> {
    samples
        .iter()
        .fold(None, |best: Option<&ScanSample>, s| match best {
            Some(b) if b.remote_dbm >= s.remote_dbm => Some(b),
            _ => Some(s),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: usize, x: i32, remote_dbm: f64) -> ScanSample {
        ScanSample {
            index,
            position: Position::new(x, -x),
            local_dbm: -12.5,
            remote_dbm,
        }
    }

    #[test]
    fn appends_space_separated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan_output.txt");
        {
            let mut rec = ScanRecord::open(&path).unwrap();
            rec.append(&sample(0, 130, -20.0)).unwrap();
        }
        {
            let mut rec = ScanRecord::open(&path).unwrap();
            rec.append(&sample(1, 80, -18.25)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "0 130 -130 -12.500000 -20.000000\n1 80 -80 -12.500000 -18.250000\n"
        );
        let back = read_scan_record(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(best_sample(&back).map(|s| s.index), Some(1));
    }

    #[test]
    fn reads_legacy_float_coordinates_and_trailing_space() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.txt");
        std::fs::write(&path, "3 230.000000 30.000000 -9.100000 -11.400000 \n").unwrap();
        let rows = read_scan_record(&path).unwrap();
        assert_eq!(rows[0].index, 3);
        assert_eq!(rows[0].position, Position::new(230, 30));
        assert!((rows[0].remote_dbm + 11.4).abs() < 1e-9);
    }

    #[test]
    fn rejects_short_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "1 2 3\n").unwrap();
        let err = read_scan_record(&path).unwrap_err();
        assert!(format!("{err}").contains("expected 5 fields"));
    }
}
