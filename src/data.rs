use std::{fs, path::Path, str::FromStr, thread};

use geojson::GeoJson;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{
    dataset::{DatasetIndex, Record},
    error::{AtlasError, Result},
};

/// Stałe kolumny pliku CSV; kolumna wartości jest konfigurowalna.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Entity", default)]
    entity: String,
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Year", default)]
    year: String,
}

/// Brak albo niepoprawna liczba daje 0.
fn parse_value(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Wczytuje rekordy z CSV. Wiersze bez poprawnego roku są pomijane;
/// filtrowanie kodów należy do indeksu.
pub fn load_records(path: &Path, value_column: &str) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    for required in ["Entity", "Code", "Year"] {
        if !headers.iter().any(|h| h == required) {
            return Err(AtlasError::MissingColumn(required.to_string()));
        }
    }
    let value_idx = headers
        .iter()
        .position(|h| h == value_column)
        .ok_or_else(|| AtlasError::MissingColumn(value_column.to_string()))?;

    let mut records = Vec::new();
    let (mut bad_year, mut malformed) = (0usize, 0usize);
    for row in reader.byte_records() {
        // pola spoza UTF-8 (np. nazwy w Latin-1) dekodujemy stratnie
        let row = csv::StringRecord::from_byte_record_lossy(row?);
        let Ok(parsed) = row.deserialize::<CsvRow>(Some(&headers)) else {
            malformed += 1;
            continue;
        };
        let Ok(year) = parsed.year.trim().parse::<i32>() else {
            bad_year += 1;
            continue;
        };
        records.push(Record::new(parsed.entity, parsed.code, year, parse_value(row.get(value_idx))));
    }
    debug!(bad_year, malformed, "pominięto wiersze bez roku lub nieczytelne");
    info!(rows = records.len(), path = %path.display(), "wczytano rekordy");
    Ok(records)
}

pub fn load_geojson(path: &Path) -> Result<GeoJson> {
    let txt = fs::read_to_string(path)
        .map_err(|source| AtlasError::Io { path: path.to_path_buf(), source })?;
    let gj = GeoJson::from_str(&txt)?;
    match &gj {
        GeoJson::FeatureCollection(fc) if fc.features.is_empty() => {
            return Err(AtlasError::EmptySource("obiekty mapy"));
        }
        GeoJson::FeatureCollection(fc) => {
            info!(features = fc.features.len(), path = %path.display(), "wczytano mapę");
        }
        _ => return Err(AtlasError::NotFeatureCollection),
    }
    Ok(gj)
}

/// Oba źródła ładowane równolegle; dalej idziemy tylko, gdy oba się udały.
pub fn load_inputs(data: &Path, world: &Path, value_column: &str) -> Result<(DatasetIndex, GeoJson)> {
    let (records, geo) = thread::scope(|s| {
        let records = s.spawn(|| load_records(data, value_column));
        let geo = s.spawn(|| load_geojson(world));
        (join(records.join()), join(geo.join()))
    });
    let (records, geo) = match (records, geo) {
        (Ok(r), Ok(g)) => (r, g),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "nie udało się wczytać danych wejściowych");
            return Err(e);
        }
    };
    Ok((DatasetIndex::build(records)?, geo))
}

fn join<T>(res: thread::Result<Result<T>>) -> Result<T> {
    res.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALUE: &str = "Capture fisheries production (metric tons)";

    fn csv_file(body: &str) -> NamedTempFile {
        csv_bytes(body.as_bytes())
    }

    fn csv_bytes(body: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "Entity,Code,Year,{VALUE}\n").unwrap();
        f.write_all(body).unwrap();
        f
    }

    fn world_file(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{json}").unwrap();
        f
    }

    const ONE_FEATURE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","id":"CHL","properties":{"name":"Chile"},
         "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#;

    #[test]
    fn reads_rows_and_defaults_values() {
        let f = csv_file("Chile,CHL,2000,4300000\nPeru,per ,2000,\nWorld,OWID_WRL,2000,n/a\n");
        let records = load_records(f.path(), VALUE).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::new("Chile", "CHL", 2000, 4_300_000.0));
        assert_eq!(records[1].value, 0.0);
        assert_eq!(records[2].value, 0.0);

        let index = DatasetIndex::build(records).unwrap();
        assert!(index.contains("PER"));
        assert!(!index.contains("OWID_WRL"));
    }

    #[test]
    fn row_with_bad_year_is_skipped() {
        let f = csv_file("Chile,CHL,abc,1\nChile,CHL,2001,2\n");
        let records = load_records(f.path(), VALUE).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2001);
    }

    #[test]
    fn non_utf8_row_does_not_abort_load() {
        let f = csv_bytes(b"Chile,CHL,2000,5\nC\xf4te d'Ivoire,CIV,2000,7\nPeru,PER,2000,9\n");
        let records = load_records(f.path(), VALUE).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::new("Chile", "CHL", 2000, 5.0));
        assert_eq!(records[2], Record::new("Peru", "PER", 2000, 9.0));
        assert_eq!(records[1].code, "CIV");
        assert!(records[1].entity.ends_with("te d'Ivoire"));
    }

    #[test]
    fn missing_value_column_is_an_error() {
        let f = csv_file("Chile,CHL,2000,1\n");
        let err = load_records(f.path(), "GDP").unwrap_err();
        assert!(matches!(err, AtlasError::MissingColumn(c) if c == "GDP"));
    }

    #[test]
    fn missing_file_fails_joint_load() {
        let f = csv_file("Chile,CHL,2000,1\n");
        let err = load_inputs(f.path(), Path::new("/nonexistent/world.geojson"), VALUE).unwrap_err();
        assert!(matches!(err, AtlasError::Io { .. }));
    }

    #[test]
    fn joint_load_builds_index() {
        let data = csv_file("Chile,CHL,2000,1\n");
        let world = world_file(ONE_FEATURE);
        let (index, geo) = load_inputs(data.path(), world.path(), VALUE).unwrap();
        assert_eq!(index.years(), &[2000]);
        assert!(matches!(geo, GeoJson::FeatureCollection(_)));
    }

    #[test]
    fn map_must_be_a_non_empty_collection() {
        let data = csv_file("Chile,CHL,2000,1\n");
        let single = world_file(r#"{"type":"Feature","properties":null,"geometry":null}"#);
        let err = load_inputs(data.path(), single.path(), VALUE).unwrap_err();
        assert!(matches!(err, AtlasError::NotFeatureCollection));

        let empty = world_file(r#"{"type":"FeatureCollection","features":[]}"#);
        let err = load_inputs(data.path(), empty.path(), VALUE).unwrap_err();
        assert!(matches!(err, AtlasError::EmptySource(_)));
    }
}
