use geo::{Coord, Geometry, MapCoords, MultiPolygon};
use geojson::{Feature, feature::Id};
use serde_json::Value;

use crate::dataset::normalize_code;

/// Skąd brać identyfikator obiektu mapy; próbowane po kolei.
#[derive(Clone, Copy, Debug)]
enum CodeSource {
    Id,
    Property(&'static str),
}

const CODE_SOURCES: [CodeSource; 5] = [
    CodeSource::Id,
    CodeSource::Property("iso_a3"),
    CodeSource::Property("ISO_A3"),
    CodeSource::Property("adm0_a3"),
    CodeSource::Property("ADM0_A3"),
];

const NAME_KEYS: [&str; 3] = ["name", "NAME", "ADMIN"];

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property(feature: &Feature, key: &str) -> Option<String> {
    feature.properties.as_ref()?.get(key).and_then(value_text)
}

impl CodeSource {
    fn extract(self, feature: &Feature) -> Option<String> {
        match self {
            CodeSource::Id => match feature.id.as_ref()? {
                Id::String(s) => Some(s.clone()),
                Id::Number(n) => Some(n.to_string()),
            },
            CodeSource::Property(key) => property(feature, key),
        }
    }
}

/// Kod obiektu mapy: pierwszy niepusty kandydat, znormalizowany.
/// Pusty napis, gdy żaden kandydat nie istnieje.
pub fn feature_code(feature: &Feature) -> String {
    CODE_SOURCES
        .iter()
        .filter_map(|source| source.extract(feature))
        .map(|raw| normalize_code(&raw))
        .find(|code| !code.is_empty())
        .unwrap_or_default()
}

/// Nazwa z właściwości obiektu, jeśli jest.
pub fn feature_name(feature: &Feature) -> Option<String> {
    NAME_KEYS
        .iter()
        .filter_map(|key| property(feature, key))
        .find(|name| !name.trim().is_empty())
}

/// Geometria powierzchniowa obiektu; inne typy geometrii dają pusty wielokąt.
pub fn feature_polygons(feature: &Feature) -> Result<MultiPolygon<f64>, geojson::Error> {
    let Some(gj) = feature.geometry.clone() else {
        return Ok(MultiPolygon(Vec::new()));
    };
    let geom: Geometry<f64> = gj.value.try_into()?;
    Ok(match geom {
        Geometry::Polygon(p) => p.into(),
        Geometry::MultiPolygon(m) => m,
        _ => MultiPolygon(Vec::new()),
    })
}

/// Odwzorowanie Natural Earth I (stopnie → jednostki płaszczyzny mapy).
pub fn natural_earth(c: Coord<f64>) -> Coord<f64> {
    let lambda = c.x.to_radians();
    let phi = c.y.to_radians();
    let phi2 = phi * phi;
    let phi4 = phi2 * phi2;
    Coord {
        x: lambda * (0.8707 - 0.131979 * phi2 + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
        y: phi * (1.007226 + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
    }
}

pub fn project(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.map_coords(natural_earth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(id: Option<&str>, props: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: id.map(|s| Id::String(s.to_string())),
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn id_wins_over_properties() {
        let f = feature(Some("fra"), json!({ "iso_a3": "DEU" }));
        assert_eq!(feature_code(&f), "FRA");
    }

    #[test]
    fn falls_back_through_property_keys() {
        let f = feature(None, json!({ "ADM0_A3": " nor " }));
        assert_eq!(feature_code(&f), "NOR");
        let f = feature(Some("  "), json!({ "ISO_A3": "swe", "adm0_a3": "XXX" }));
        assert_eq!(feature_code(&f), "SWE");
    }

    #[test]
    fn no_identifier_gives_empty_code() {
        let f = feature(None, json!({ "name": "Atlantis" }));
        assert_eq!(feature_code(&f), "");
        assert_eq!(feature_name(&f).as_deref(), Some("Atlantis"));
    }

    #[test]
    fn missing_geometry_is_empty() {
        let f = feature(Some("FRA"), json!({}));
        assert!(feature_polygons(&f).unwrap().0.is_empty());
    }

    #[test]
    fn projection_keeps_origin_and_orientation() {
        let origin = natural_earth(Coord { x: 0.0, y: 0.0 });
        assert_eq!(origin, Coord { x: 0.0, y: 0.0 });
        let ne = natural_earth(Coord { x: 30.0, y: 45.0 });
        assert!(ne.x > 0.0 && ne.y > 0.0);
    }
}
