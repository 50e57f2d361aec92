use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_VALUE_COLUMN: &str = "Capture fisheries production (metric tons)";

/// Mapa kartogramowa i wykres warstwowy wskaźnika rocznego w terminalu.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Plik CSV z kolumnami Entity, Code, Year i kolumną wartości
    #[arg(long, default_value = "data/proj.csv")]
    pub data: PathBuf,

    /// Plik GeoJSON (FeatureCollection) z granicami państw
    #[arg(long, default_value = "data/world.geojson")]
    pub world: PathBuf,

    /// Nazwa kolumny z wartością; także opis osi Y
    #[arg(long, default_value = DEFAULT_VALUE_COLUMN)]
    pub value_column: String,

    /// Rok początkowy (domyślnie ostatni rok w danych)
    #[arg(long)]
    pub year: Option<i32>,

    /// Plik dziennika (terminal jest zajęty przez interfejs)
    #[arg(long, default_value = "atlas.log")]
    pub log_file: PathBuf,

    /// Filtr poziomu logowania; RUST_LOG ma pierwszeństwo
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Rok startowy: podany, jeśli mieści się w zakresie, w przeciwnym razie ostatni.
pub fn initial_year(requested: Option<i32>, (min, max): (i32, i32)) -> i32 {
    requested.filter(|y| (min..=max).contains(y)).unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["atlas"]);
        assert_eq!(args.value_column, DEFAULT_VALUE_COLUMN);
        assert_eq!(args.data, PathBuf::from("data/proj.csv"));
        assert!(args.year.is_none());
    }

    #[test]
    fn overrides() {
        let args = Args::parse_from(["atlas", "--year", "1990", "--value-column", "GDP"]);
        assert_eq!(args.year, Some(1990));
        assert_eq!(args.value_column, "GDP");
    }

    #[test]
    fn initial_year_falls_back_to_max() {
        assert_eq!(initial_year(None, (1960, 2020)), 2020);
        assert_eq!(initial_year(Some(1990), (1960, 2020)), 1990);
        assert_eq!(initial_year(Some(1900), (1960, 2020)), 2020);
    }
}
