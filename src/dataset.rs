use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::error::{AtlasError, Result};

/// Jeden wiersz szeregu czasowego: podmiot, kod ISO, rok, wartość.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub entity: String,
    pub code: String,
    pub year: i32,
    pub value: f64,
}

impl Record {
    pub fn new(entity: impl Into<String>, code: impl Into<String>, year: i32, value: f64) -> Self {
        Self { entity: entity.into(), code: code.into(), year, value }
    }
}

/// Kod w postaci kanonicznej: bez białych znaków, wielkimi literami.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Kody kontynentów, grup dochodowych itp. nie mają trzech znaków.
fn is_entity_code(code: &str) -> bool {
    code.chars().count() == 3
}

/// Indeks zbudowany raz z rekordów wejściowych; po zbudowaniu tylko do odczytu.
#[derive(Debug)]
pub struct DatasetIndex {
    by_code: HashMap<String, Vec<Record>>,
    by_year: BTreeMap<i32, Vec<Record>>,
    code_to_name: HashMap<String, String>,
    years: Vec<i32>,
    wide: BTreeMap<i32, HashMap<String, f64>>,
}

impl DatasetIndex {
    /// Buduje indeks. Wiersze z niepoprawnym kodem są pomijane bez błędu;
    /// błędem jest tylko puste źródło albo brak jakiegokolwiek poprawnego wiersza.
    pub fn build<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut by_code: HashMap<String, Vec<Record>> = HashMap::new();
        let mut by_year: BTreeMap<i32, Vec<Record>> = BTreeMap::new();
        let mut code_to_name = HashMap::new();
        let mut wide: BTreeMap<i32, HashMap<String, f64>> = BTreeMap::new();
        let (mut seen, mut dropped) = (0usize, 0usize);

        for mut record in records {
            seen += 1;
            record.code = normalize_code(&record.code);
            if !is_entity_code(&record.code) {
                dropped += 1;
                continue;
            }
            if !record.value.is_finite() || record.value < 0.0 {
                record.value = 0.0;
            }

            code_to_name
                .entry(record.code.clone())
                .or_insert_with(|| record.entity.clone());
            // przy powtórzonej parze (kod, rok) wygrywa ostatni wiersz
            wide.entry(record.year)
                .or_default()
                .insert(record.code.clone(), record.value);
            by_year.entry(record.year).or_default().push(record.clone());
            by_code.entry(record.code.clone()).or_default().push(record);
        }

        if seen == 0 {
            return Err(AtlasError::EmptySource("rekordy szeregu czasowego"));
        }
        if wide.is_empty() {
            return Err(AtlasError::NoUsableRecords);
        }

        let years: Vec<i32> = wide.keys().copied().collect();
        debug!(dropped, "pominięto wiersze bez kodu ISO");
        info!(
            codes = code_to_name.len(),
            years = years.len(),
            first = years[0],
            last = years[years.len() - 1],
            "zbudowano indeks danych"
        );

        Ok(Self { by_code, by_year, code_to_name, years, wide })
    }

    /// Lata rosnąco, bez powtórzeń. Nigdy nie jest puste.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn year_range(&self) -> (i32, i32) {
        (self.years[0], self.years[self.years.len() - 1])
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.wide.contains_key(&year)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.code_to_name.contains_key(code)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.code_to_name.get(code).map(String::as_str)
    }

    pub fn entity_count(&self) -> usize {
        self.code_to_name.len()
    }

    pub fn by_code(&self, code: &str) -> &[Record] {
        self.by_code.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_year(&self, year: i32) -> &[Record] {
        self.by_year.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Wartości jednego podmiotu w porządku chronologicznym.
    pub fn series(&self, code: &str) -> Vec<(i32, f64)> {
        let mut points: Vec<(i32, f64)> =
            self.by_code(code).iter().map(|r| (r.year, r.value)).collect();
        points.sort_by_key(|&(year, _)| year);
        points
    }

    /// Wartość z tabeli szerokiej; brak wpisu liczy się jako 0.
    pub fn value(&self, year: i32, code: &str) -> f64 {
        self.wide
            .get(&year)
            .and_then(|row| row.get(code))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("Alpha", "AAA", 2001, 20.0),
            Record::new("Alpha", "AAA", 2000, 10.0),
            Record::new("Beta", "BBB", 2000, 5.0),
            Record::new("Beta", "BBB", 2001, 5.0),
        ]
    }

    #[test]
    fn years_are_sorted_and_distinct() {
        let index = DatasetIndex::build(sample()).unwrap();
        assert_eq!(index.years(), &[2000, 2001]);
        assert_eq!(index.year_range(), (2000, 2001));
    }

    #[test]
    fn code_is_trimmed_and_uppercased() {
        let index = DatasetIndex::build(vec![Record::new("United States", "usa ", 2000, 1.0)]).unwrap();
        assert!(index.contains("USA"));
        assert_eq!(index.value(2000, "USA"), 1.0);
        assert_eq!(index.name("USA"), Some("United States"));
    }

    #[test]
    fn aggregate_rows_are_dropped() {
        let index = DatasetIndex::build(vec![
            Record::new("World", "OWID_WRL", 2000, 100.0),
            Record::new("Africa", "", 2000, 50.0),
            Record::new("Chile", "CHL", 2000, 3.0),
        ])
        .unwrap();
        assert_eq!(index.entity_count(), 1);
        assert_eq!(index.by_year(2000).len(), 1);
    }

    #[test]
    fn duplicate_pair_last_write_wins() {
        let index = DatasetIndex::build(vec![
            Record::new("Peru", "PER", 2000, 1.0),
            Record::new("Peru (alt)", "PER", 2000, 7.0),
        ])
        .unwrap();
        assert_eq!(index.value(2000, "PER"), 7.0);
        // nazwa: pierwsza widziana
        assert_eq!(index.name("PER"), Some("Peru"));
    }

    #[test]
    fn series_is_chronological() {
        let index = DatasetIndex::build(sample()).unwrap();
        assert_eq!(index.series("AAA"), vec![(2000, 10.0), (2001, 20.0)]);
        assert!(index.series("ZZZ").is_empty());
    }

    #[test]
    fn missing_value_reads_as_zero() {
        let index = DatasetIndex::build(sample()).unwrap();
        assert_eq!(index.value(1999, "AAA"), 0.0);
        assert_eq!(index.value(2000, "ZZZ"), 0.0);
    }

    #[test]
    fn negative_and_nan_values_clamp_to_zero() {
        let index = DatasetIndex::build(vec![
            Record::new("Peru", "PER", 2000, -4.0),
            Record::new("Peru", "PER", 2001, f64::NAN),
        ])
        .unwrap();
        assert_eq!(index.value(2000, "PER"), 0.0);
        assert_eq!(index.value(2001, "PER"), 0.0);
    }

    #[test]
    fn empty_source_is_an_error() {
        let err = DatasetIndex::build(Vec::new()).unwrap_err();
        assert!(matches!(err, AtlasError::EmptySource(_)));
    }

    #[test]
    fn all_rows_filtered_is_an_error() {
        let err = DatasetIndex::build(vec![Record::new("World", "OWID_WRL", 2000, 1.0)]).unwrap_err();
        assert!(matches!(err, AtlasError::NoUsableRecords));
    }
}
