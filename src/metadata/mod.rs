use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::tree::highlight::TipClass;

/// One row of the sample metadata table.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    pub strain: String,
    pub date: Option<String>,
    pub region: Option<String>,
}

impl SampleRecord {
    /// Sampling year, if the date string carries one.
    pub fn year(&self) -> Option<i32> {
        self.date.as_deref().and_then(extract_year)
    }

    /// Sampling date as a decimal year, if the date string parses.
    pub fn decimal_year(&self) -> Option<f64> {
        self.date.as_deref().and_then(date_to_decimal_year)
    }
}

/// Tab-separated sample metadata with `strain`, `date` and `Region` columns.
#[derive(Debug, Clone)]
pub struct SampleTable {
    pub records: Vec<SampleRecord>,
}

impl SampleTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open metadata file: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse metadata file: {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => bail!("metadata table is empty"),
            }
        };

        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let strain_col = column_index(&columns, "strain")?;
        let date_col = column_index(&columns, "date")?;
        let region_col = column_index(&columns, "Region")?;

        let mut records = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let Some(strain) = field(&fields, strain_col) else {
                continue;
            };

            records.push(SampleRecord {
                strain: strain.to_string(),
                date: field(&fields, date_col).map(str::to_string),
                region: field(&fields, region_col).map(str::to_string),
            });
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Strain name to decimal sampling year, for rows that have a parseable
    /// date. Duplicate strains keep the last row.
    pub fn tip_dates(&self) -> HashMap<String, f64> {
        let mut dates = HashMap::new();
        for record in &self.records {
            if let Some(year) = record.decimal_year() {
                dates.insert(record.strain.clone(), year);
            }
        }
        dates
    }

    /// Classify every strain with a region: the category is the region, and
    /// the highlight flag is set when the region belongs to `regions` and the
    /// sampling year matches `year`.
    pub fn classify(&self, regions: &[String], year: i32) -> HashMap<String, TipClass> {
        let mut classes = HashMap::new();
        for record in &self.records {
            let Some(region) = &record.region else {
                continue;
            };

            let highlighted =
                regions.iter().any(|name| name == region) && record.year() == Some(year);
            classes.insert(
                record.strain.clone(),
                TipClass {
                    category: region.clone(),
                    highlighted,
                },
            );
        }
        classes
    }
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|column| *column == name)
        .with_context(|| format!("metadata table is missing the '{name}' column"))
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields
        .get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Leading four-digit year of a date string, if present.
pub fn extract_year(date: &str) -> Option<i32> {
    let prefix = date.trim().get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Convert a `YYYY-MM-DD` date string to a decimal year.
///
/// Partially-masked dates use mid-range stand-ins: `XX` month means June,
/// `XX` day the 15th. A string with fewer than three parts reports the bare
/// year; anything unparseable falls back to [`extract_year`].
pub fn date_to_decimal_year(date: &str) -> Option<f64> {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.len() >= 3 {
        decimal_year_from_parts(&parts).or_else(|| extract_year(trimmed).map(f64::from))
    } else {
        parts[0]
            .parse::<i32>()
            .ok()
            .map(f64::from)
            .or_else(|| extract_year(trimmed).map(f64::from))
    }
}

fn decimal_year_from_parts(parts: &[&str]) -> Option<f64> {
    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = if parts[1] == "XX" {
        6
    } else {
        parts[1].parse().ok()?
    };
    let day: u32 = if parts[2] == "XX" {
        15
    } else {
        parts[2].parse().ok()?
    };

    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
        return None;
    }

    let day_of_year = days_before_month(year, month) + day;
    let year_length = if is_leap_year(year) { 366.0 } else { 365.0 };
    Some(f64::from(year) + f64::from(day_of_year - 1) / year_length)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

fn days_before_month(year: i32, month: u32) -> u32 {
    (1..month).map(|m| days_in_month(year, m)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "strain\tdate\tRegion\n\
        WNV/NE/001\t2023-07-04\tNE_Central\n\
        WNV/NE/002\t2023-XX-XX\tNE_West\n\
        WNV/TX/003\t2023-05-01\tTX_South\n\
        WNV/NE/004\t2019-08-20\tNE_Central\n\
        WNV/NE/005\t\tNE_East\n";

    fn table() -> SampleTable {
        SampleTable::from_reader(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn parses_header_indexed_columns() {
        let table = table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.records[0].strain, "WNV/NE/001");
        assert_eq!(table.records[0].region.as_deref(), Some("NE_Central"));
        assert!(table.records[4].date.is_none());
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = SampleTable::from_reader("strain\tdate\na\t2020\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Region"));
    }

    #[test]
    fn extracts_leading_years() {
        assert_eq!(extract_year("2023-07-04"), Some(2023));
        assert_eq!(extract_year("2021-XX-XX"), Some(2021));
        assert_eq!(extract_year("2019"), Some(2019));
        assert_eq!(extract_year("unknown"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn converts_full_dates_to_decimal_years() {
        let value = date_to_decimal_year("2023-07-04").unwrap();
        assert!((value - (2023.0 + 184.0 / 365.0)).abs() < 1e-9);

        // Leap year: March 1st is day 61 of 366.
        let leap = date_to_decimal_year("2024-03-01").unwrap();
        assert!((leap - (2024.0 + 60.0 / 366.0)).abs() < 1e-9);
    }

    #[test]
    fn masked_dates_use_mid_range_defaults() {
        // XX month -> June, XX day -> 15th.
        let value = date_to_decimal_year("2021-XX-XX").unwrap();
        assert!((value - (2021.0 + 165.0 / 365.0)).abs() < 1e-9);
    }

    #[test]
    fn short_and_bad_dates_degrade_to_the_year() {
        assert_eq!(date_to_decimal_year("2019"), Some(2019.0));
        assert_eq!(date_to_decimal_year("2020-05"), Some(2020.0));
        // Impossible day falls back to the year.
        assert_eq!(date_to_decimal_year("2023-13-40"), Some(2023.0));
        assert_eq!(date_to_decimal_year("unknown"), None);
    }

    #[test]
    fn tip_dates_skip_undated_rows() {
        let dates = table().tip_dates();
        assert_eq!(dates.len(), 4);
        assert!(!dates.contains_key("WNV/NE/005"));
        assert!((dates["WNV/NE/001"] - (2023.0 + 184.0 / 365.0)).abs() < 1e-9);
    }

    #[test]
    fn classification_filters_by_region_and_year() {
        let regions = vec!["NE_Central".to_string(), "NE_West".to_string()];
        let classes = table().classify(&regions, 2023);

        assert!(classes["WNV/NE/001"].highlighted);
        assert!(classes["WNV/NE/002"].highlighted);
        // Right year, wrong region.
        assert!(!classes["WNV/TX/003"].highlighted);
        // Right region, wrong year.
        assert!(!classes["WNV/NE/004"].highlighted);
        // No date at all.
        assert!(!classes["WNV/NE/005"].highlighted);
        assert_eq!(classes["WNV/TX/003"].category, "TX_South");
    }
}
