use std::path::PathBuf;
use thiserror::Error;

/// Błędy ładowania danych wejściowych i budowy indeksu.
///
/// Każdy z nich kończy inicjalizację: panel nie jest rysowany częściowo.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("nie można odczytać {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("błąd CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("błąd GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("brak kolumny `{0}` w nagłówku CSV")]
    MissingColumn(String),

    #[error("plik mapy nie jest kolekcją obiektów (FeatureCollection)")]
    NotFeatureCollection,

    #[error("puste źródło danych: {0}")]
    EmptySource(&'static str),

    #[error("żaden wiersz nie ma poprawnego kodu i roku")]
    NoUsableRecords,
}

pub type Result<T> = std::result::Result<T, AtlasError>;
