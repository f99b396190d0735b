//! CSV file data adapter.
//!
//! Two layouts are supported:
//! - [`DataType::CryptoDataDownload`]: a single file with a `Symbol` column,
//!   optionally preceded by a banner line such as the provider URL.
//! - [`DataType::Directory`]: one `<SYMBOL>.csv` per ticker with columns
//!   `date,open,high,low,close,volume`.
//!
//! The whole file set is parsed once; queries go through [`MemoryAdapter`].

use crate::adapters::memory_adapter::MemoryAdapter;
use crate::domain::error::BacktestError;
use crate::domain::observation::{parse_timestamp, Observation};
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use log::info;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    CryptoDataDownload,
    Directory,
}

impl FromStr for DataType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cryptodatadownload" | "cdd" => Ok(DataType::CryptoDataDownload),
            "directory" | "dir" => Ok(DataType::Directory),
            other => Err(BacktestError::ConfigInvalid {
                section: "data".into(),
                key: "type".into(),
                reason: format!("unknown data type `{other}` (expected cryptodatadownload or directory)"),
            }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::CryptoDataDownload => f.write_str("cryptodatadownload"),
            DataType::Directory => f.write_str("directory"),
        }
    }
}

pub struct CsvAdapter {
    source: PathBuf,
    store: MemoryAdapter,
}

impl CsvAdapter {
    pub fn open(source: impl Into<PathBuf>, data_type: DataType) -> Result<Self, BacktestError> {
        let source = source.into();
        let observations = match data_type {
            DataType::CryptoDataDownload => read_cryptodatadownload(&source)?,
            DataType::Directory => read_directory(&source)?,
        };
        info!(
            "read {} rows from {} ({})",
            observations.len(),
            source.display(),
            data_type
        );
        let store = MemoryAdapter::new(observations)?;
        Ok(Self { source, store })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl DataPort for CsvAdapter {
    fn tickers(&self) -> Vec<String> {
        self.store.tickers()
    }

    fn range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Observation>, BacktestError> {
        self.store.range(start, end)
    }

    fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime, usize)> {
        self.store.span()
    }
}

struct Columns {
    date: usize,
    symbol: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Self, BacktestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| BacktestError::DataLoad {
                reason: format!("{}: missing {} column", path.display(), name),
            })
        };
        Ok(Columns {
            date: required("date")?,
            symbol: find("symbol"),
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: required("close")?,
            volume: headers
                .iter()
                .position(|h| h.trim().to_lowercase().starts_with("volume")),
        })
    }
}

fn read_cryptodatadownload(path: &Path) -> Result<Vec<Observation>, BacktestError> {
    let content = read_file(path)?;

    // Skip any banner line preceding the header row.
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let is_header = line
            .split(',')
            .any(|field| field.trim().eq_ignore_ascii_case("date"));
        if is_header {
            break;
        }
        offset += line.len();
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content[offset..].as_bytes());
    let headers = rdr.headers().map_err(|e| csv_error(path, e))?.clone();
    let columns = Columns::locate(&headers, path)?;
    if columns.symbol.is_none() {
        return Err(BacktestError::DataLoad {
            reason: format!("{}: missing symbol column", path.display()),
        });
    }

    let mut observations = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        observations.push(parse_row(&record, &columns, None, path, row + 1)?);
    }
    Ok(observations)
}

fn read_directory(dir: &Path) -> Result<Vec<Observation>, BacktestError> {
    let entries = fs::read_dir(dir).map_err(|e| BacktestError::DataLoad {
        reason: format!("failed to read directory {}: {}", dir.display(), e),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BacktestError::DataLoad {
            reason: format!("directory entry error: {}", e),
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut observations = Vec::new();
    for path in &paths {
        let Some(symbol) = path.file_stem().map(|s| s.to_string_lossy().to_uppercase()) else {
            continue;
        };
        let content = read_file(path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| csv_error(path, e))?.clone();
        let columns = Columns::locate(&headers, path)?;
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(path, e))?;
            observations.push(parse_row(&record, &columns, Some(&symbol), path, row + 1)?);
        }
    }
    Ok(observations)
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &Columns,
    symbol: Option<&str>,
    path: &Path,
    row: usize,
) -> Result<Observation, BacktestError> {
    let field = |idx: usize, name: &str| {
        record.get(idx).ok_or_else(|| BacktestError::DataLoad {
            reason: format!("{}:{}: missing {} value", path.display(), row, name),
        })
    };
    let number = |idx: usize, name: &str| -> Result<f64, BacktestError> {
        field(idx, name)?
            .trim()
            .parse::<f64>()
            .map_err(|e| BacktestError::DataLoad {
                reason: format!("{}:{}: invalid {} value: {}", path.display(), row, name, e),
            })
    };
    let optional = |idx: Option<usize>, name: &str| -> Result<Option<f64>, BacktestError> {
        match idx {
            Some(i) if record.get(i).is_some_and(|v| !v.trim().is_empty()) => {
                number(i, name).map(Some)
            }
            _ => Ok(None),
        }
    };

    let raw_date = field(columns.date, "date")?;
    let timestamp = parse_timestamp(raw_date).ok_or_else(|| BacktestError::DataLoad {
        reason: format!("{}:{}: invalid date `{}`", path.display(), row, raw_date),
    })?;

    let symbol = match (symbol, columns.symbol) {
        (Some(s), _) => s.to_string(),
        (None, Some(idx)) => field(idx, "symbol")?.trim().to_string(),
        (None, None) => {
            return Err(BacktestError::DataLoad {
                reason: format!("{}: missing symbol column", path.display()),
            });
        }
    };

    Ok(Observation {
        symbol,
        timestamp,
        close: number(columns.close, "close")?,
        open: optional(columns.open, "open")?,
        high: optional(columns.high, "high")?,
        low: optional(columns.low, "low")?,
        volume: optional(columns.volume, "volume")?,
    })
}

fn read_file(path: &Path) -> Result<String, BacktestError> {
    fs::read_to_string(path).map_err(|e| BacktestError::DataLoad {
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

fn csv_error(path: &Path, e: csv::Error) -> BacktestError {
    BacktestError::DataLoad {
        reason: format!("{}: CSV parse error: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const CDD: &str = "https://www.CryptoDataDownload.com\n\
        Unix,Date,Symbol,Open,High,Low,Close,Volume BTC,Volume USDT,tradecount\n\
        1684191600000,2023-05-15 23:00:00,BTCUSDT,27100.0,27200.0,27000.0,27150.5,310.2,8420000.0,9000\n\
        1684188000000,2023-05-15 22:00:00,BTCUSDT,27000.0,27120.0,26990.0,27100.0,250.0,6770000.0,8000\n\
        1684184400000,2023-05-15 21:00:00,BTCUSDT,26900.0,27010.0,26880.0,27000.0,199.5,5380000.0,7000\n";

    fn write_cdd(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Binance_BTCUSDT_1h.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn data_type_parsing() {
        assert_eq!("CryptoDataDownload".parse::<DataType>().unwrap(), DataType::CryptoDataDownload);
        assert_eq!("dir".parse::<DataType>().unwrap(), DataType::Directory);
        assert!("parquet".parse::<DataType>().is_err());
    }

    #[test]
    fn cryptodatadownload_skips_banner_and_sorts_ascending() {
        let (_dir, path) = write_cdd(CDD);
        let adapter = CsvAdapter::open(&path, DataType::CryptoDataDownload).unwrap();

        let bars = adapter.range(None, None).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, at(15, 21));
        assert_eq!(bars[2].timestamp, at(15, 23));
        assert_eq!(bars[2].close, 27150.5);
        assert_eq!(bars[2].open, Some(27100.0));
        assert_eq!(bars[2].volume, Some(310.2));
        assert_eq!(adapter.tickers(), vec!["BTCUSDT"]);
        assert_eq!(adapter.source(), path.as_path());
    }

    #[test]
    fn cryptodatadownload_without_banner() {
        let content = "Date,Symbol,Close\n2023-05-15,ETHUSDT,1800.0\n2023-05-16,ETHUSDT,1810.0\n";
        let (_dir, path) = write_cdd(content);
        let adapter = CsvAdapter::open(&path, DataType::CryptoDataDownload).unwrap();
        assert_eq!(adapter.span(), Some((at(15, 0), at(16, 0), 2)));
        let bars = adapter.range(None, None).unwrap();
        assert!(bars[0].open.is_none());
    }

    #[test]
    fn missing_symbol_column_is_an_error() {
        let (_dir, path) = write_cdd("Date,Close\n2023-05-15,1.0\n");
        let err = CsvAdapter::open(&path, DataType::CryptoDataDownload).err().unwrap();
        assert!(matches!(err, BacktestError::DataLoad { .. }));
    }

    #[test]
    fn invalid_close_is_an_error() {
        let (_dir, path) = write_cdd("Date,Symbol,Close\n2023-05-15,X,abc\n");
        assert!(CsvAdapter::open(&path, DataType::CryptoDataDownload).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = CsvAdapter::open("/nonexistent/data.csv", DataType::CryptoDataDownload);
        assert!(matches!(result, Err(BacktestError::DataLoad { .. })));
    }

    #[test]
    fn directory_layout_uses_file_stem_as_symbol() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bhp.csv"),
            "date,open,high,low,close,volume\n\
             2023-05-16,100.0,110.0,90.0,105.0,50000\n\
             2023-05-15,95.0,101.0,94.0,100.0,40000\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("CBA.csv"),
            "date,open,high,low,close,volume\n2023-05-15,50.0,51.0,49.0,50.5,1000\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let adapter = CsvAdapter::open(dir.path(), DataType::Directory).unwrap();
        assert_eq!(adapter.tickers(), vec!["BHP", "CBA"]);

        let bars = adapter.range(None, None).unwrap();
        let order: Vec<(&str, f64)> = bars.iter().map(|b| (b.symbol.as_str(), b.close)).collect();
        assert_eq!(order, vec![("BHP", 100.0), ("CBA", 50.5), ("BHP", 105.0)]);
    }
}
