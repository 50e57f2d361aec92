use std::time::{Duration, Instant};

use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};
use geojson::GeoJson;
use ratatui::{
    layout::Rect as TuiRect,
    style::Color,
    symbols::Marker,
    widgets::canvas::{Canvas, Line},
    Frame,
};
use tracing::{debug, warn};

use crate::{
    canvas::{FilledRegion, PixelGrid},
    color::{ColorScale, NO_DATA, Rgb},
    dataset::DatasetIndex,
    error::{AtlasError, Result},
    feature::{feature_code, feature_name, feature_polygons, project},
    selection::SelectionState,
};

/// Wspólny czas przejścia kolorów po zmianie roku.
pub const TRANSITION: Duration = Duration::from_millis(400);
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 8.0;

const SELECTED_OUTLINE: Color = Color::Red;

/// Jeden kształt na obiekt mapy.
#[derive(Debug)]
pub struct MapShape {
    pub code: String,
    pub name: Option<String>,
    /// Czy kod ma wpis w indeksie danych (tylko takie można zaznaczać).
    pub known: bool,
    pub selected: bool,
    fill: Rgb,
    polygons: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

/// Jedno przejście dla wszystkich kształtów naraz.
#[derive(Debug)]
struct Transition {
    from: Vec<Rgb>,
    started: Instant,
}

impl Transition {
    fn progress(&self, now: Instant) -> f64 {
        let t = now.saturating_duration_since(self.started).as_secs_f64() / TRANSITION.as_secs_f64();
        ease_cubic_in_out(t.clamp(0.0, 1.0))
    }
}

fn ease_cubic_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Widok: powiększenie `k` i środek okna w układzie odwzorowania.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub k: f64,
    pub center: Coord<f64>,
}

/// Przygotowanie geometrii, kolorowanie i rysowanie mapy
pub struct MapView {
    shapes: Vec<MapShape>,
    extent: Rect<f64>,
    view: ViewTransform,
    transition: Option<Transition>,
}

impl MapView {
    pub fn new(raw: GeoJson, index: &DatasetIndex) -> Result<Self> {
        let GeoJson::FeatureCollection(fc) = raw else {
            return Err(AtlasError::NotFeatureCollection);
        };
        if fc.features.is_empty() {
            return Err(AtlasError::EmptySource("obiekty mapy"));
        }

        let mut shapes = Vec::with_capacity(fc.features.len());
        for feature in &fc.features {
            let code = feature_code(feature);
            let polygons = project(&feature_polygons(feature)?);
            let known = index.contains(&code);
            if !known {
                debug!(code = %code, "obiekt mapy bez danych");
            }
            shapes.push(MapShape {
                name: feature_name(feature),
                known,
                selected: false,
                fill: NO_DATA,
                bbox: polygons.bounding_rect(),
                polygons,
                code,
            });
        }

        // Ustal zakresy współrzędnych
        let extent = shapes
            .iter()
            .filter_map(|s| s.bbox)
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
            .unwrap_or_else(|| {
                warn!("mapa bez geometrii powierzchniowej");
                Rect::new(Coord { x: -1.0, y: -1.0 }, Coord { x: 1.0, y: 1.0 })
            });

        Ok(Self {
            shapes,
            view: ViewTransform { k: MIN_ZOOM, center: extent.center() },
            extent,
            transition: None,
        })
    }

    /// Liczba obiektów (np. krajów)
    pub fn feature_count(&self) -> usize {
        self.shapes.len()
    }

    #[cfg(test)]
    pub fn shapes(&self) -> &[MapShape] {
        &self.shapes
    }

    pub fn shape(&self, i: usize) -> Option<&MapShape> {
        self.shapes.get(i)
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Przemalowuje wszystkie kształty na kolory danego roku, jednym przejściem
    /// startującym z kolorów aktualnie widocznych.
    pub fn recolor(&mut self, year: i32, index: &DatasetIndex, now: Instant) {
        let records = index.by_year(year);
        let scale = ColorScale::for_year(records);
        let from = self.fills_at(now);
        for shape in &mut self.shapes {
            shape.fill = scale.color(index.value(year, &shape.code));
        }
        self.transition = Some(Transition { from, started: now });
        debug!(year, records = records.len(), max_log = scale.domain().1, "przemalowano mapę");
    }

    /// Kolory w chwili `now` (w trakcie przejścia interpolowane).
    pub fn fills_at(&self, now: Instant) -> Vec<Rgb> {
        match &self.transition {
            Some(tr) => {
                let t = tr.progress(now);
                tr.from
                    .iter()
                    .zip(&self.shapes)
                    .map(|(from, shape)| from.lerp(shape.fill, t))
                    .collect()
            }
            None => self.shapes.iter().map(|s| s.fill).collect(),
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.transition
            .as_ref()
            .is_some_and(|tr| now.saturating_duration_since(tr.started) < TRANSITION)
    }

    /// Kończy przejście, jeśli minął jego czas.
    pub fn tick(&mut self, now: Instant) {
        if !self.is_animating(now) {
            self.transition = None;
        }
    }

    /// Nakłada klasę "zaznaczony" na podstawie zbioru wybranego przez wywołującego.
    pub fn apply_selection(&mut self, selection: &SelectionState) {
        for shape in &mut self.shapes {
            shape.selected = shape.known && selection.contains(&shape.code);
        }
    }

    /// Okno widoku dopasowane do proporcji obszaru (piksele półbloków są kwadratowe).
    pub fn grid(&self, area: TuiRect) -> PixelGrid {
        let k = self.view.k;
        let (mut w, mut h) = (self.extent.width() / k, self.extent.height() / k);
        if w <= 0.0 || h <= 0.0 {
            w = w.max(1e-9);
            h = h.max(1e-9);
        }
        let target = area.width.max(1) as f64 / (area.height.max(1) as f64 * 2.0);
        if w / h < target {
            w = h * target;
        } else {
            h = w / target;
        }
        let c = self.view.center;
        PixelGrid::half_block(area, [c.x - w / 2.0, c.x + w / 2.0], [c.y - h / 2.0, c.y + h / 2.0])
    }

    /// Indeks kształtu pod komórką terminala, z uwzględnieniem bieżącego widoku.
    pub fn hit(&self, area: TuiRect, col: u16, row: u16) -> Option<usize> {
        let p = self.grid(area).cell_to_world(area, col, row)?;
        let point = Point::from(p);
        self.shapes.iter().rposition(|shape| {
            shape.bbox.is_some_and(|b| b.contains(&point)) && shape.polygons.contains(&point)
        })
    }

    /// Kod klikniętego obiektu, o ile jest znany. O zaznaczeniu decyduje wywołujący.
    pub fn click(&self, area: TuiRect, col: u16, row: u16) -> Option<&str> {
        let shape = &self.shapes[self.hit(area, col, row)?];
        shape.known.then_some(shape.code.as_str())
    }

    /// Powiększenie względem punktu pod kursorem (albo środka okna).
    pub fn zoom_at(&mut self, area: TuiRect, anchor: Option<(u16, u16)>, factor: f64) {
        let k = (self.view.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let pivot = anchor
            .and_then(|(col, row)| self.grid(area).cell_to_world(area, col, row))
            .unwrap_or(self.view.center);
        let r = self.view.k / k;
        let c = self.view.center;
        self.view = ViewTransform {
            k,
            center: Coord { x: pivot.x + (c.x - pivot.x) * r, y: pivot.y + (c.y - pivot.y) * r },
        };
        self.clamp_center();
    }

    /// Przesunięcie o wektor w komórkach (przeciąganie myszą).
    pub fn pan(&mut self, area: TuiRect, dcol: i32, drow: i32) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let grid = self.grid(area);
        let cell_w = (grid.x[1] - grid.x[0]) / area.width as f64;
        let cell_h = (grid.y[1] - grid.y[0]) / area.height as f64;
        self.view.center.x -= dcol as f64 * cell_w;
        self.view.center.y += drow as f64 * cell_h;
        self.clamp_center();
    }

    pub fn reset_view(&mut self) {
        self.view = ViewTransform { k: MIN_ZOOM, center: self.extent.center() };
    }

    fn clamp_center(&mut self) {
        let (min, max) = (self.extent.min(), self.extent.max());
        self.view.center.x = self.view.center.x.clamp(min.x, max.x);
        self.view.center.y = self.view.center.y.clamp(min.y, max.y);
    }

    /// Rysuje wypełnienia, a na nich obrysy zaznaczonych obiektów
    pub fn render(&self, f: &mut Frame, area: TuiRect, now: Instant) {
        let grid = self.grid(area);
        let fills = self.fills_at(now);
        let canvas = Canvas::default()
            .marker(Marker::HalfBlock)
            .x_bounds(grid.x)
            .y_bounds(grid.y)
            .paint(|ctx| {
                for (shape, fill) in self.shapes.iter().zip(&fills) {
                    ctx.draw(&FilledRegion { polygons: &shape.polygons, grid, color: fill.to_tui() });
                }
                for shape in self.shapes.iter().filter(|s| s.selected) {
                    for poly in &shape.polygons.0 {
                        for window in poly.exterior().0.windows(2) {
                            let a = window[0];
                            let b = window[1];
                            ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color: SELECTED_OUTLINE });
                        }
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::Record;
    use std::str::FromStr;

    /// Dwa kwadraty obok siebie i jeden obiekt bez danych.
    pub(crate) fn world() -> GeoJson {
        GeoJson::from_str(
            r#"{"type":"FeatureCollection","features":[
              {"type":"Feature","id":"AAA","properties":{"name":"Alpha"},
               "geometry":{"type":"Polygon","coordinates":[[[-40,-20],[-5,-20],[-5,20],[-40,20],[-40,-20]]]}},
              {"type":"Feature","properties":{"iso_a3":"bbb"},
               "geometry":{"type":"Polygon","coordinates":[[[5,-20],[40,-20],[40,20],[5,20],[5,-20]]]}},
              {"type":"Feature","properties":{"ADM0_A3":"ZZZ","name":"Nowhere"},
               "geometry":{"type":"Polygon","coordinates":[[[-40,30],[40,30],[40,40],[-40,40],[-40,30]]]}}
            ]}"#,
        )
        .unwrap()
    }

    pub(crate) fn index() -> DatasetIndex {
        DatasetIndex::build(vec![
            Record::new("Alpha", "AAA", 2000, 10.0),
            Record::new("Alpha", "AAA", 2001, 20.0),
            Record::new("Beta", "BBB", 2000, 5.0),
            Record::new("Beta", "BBB", 2001, 5.0),
        ])
        .unwrap()
    }

    const AREA: TuiRect = TuiRect { x: 0, y: 0, width: 40, height: 10 };

    fn cell_of(map: &MapView, code: &str) -> (u16, u16) {
        for row in 0..AREA.height {
            for col in 0..AREA.width {
                if let Some(i) = map.hit(AREA, col, row) {
                    if map.shapes[i].code == code {
                        return (col, row);
                    }
                }
            }
        }
        panic!("{code} not visible");
    }

    #[test]
    fn shapes_start_as_no_data() {
        let map = MapView::new(world(), &index()).unwrap();
        assert_eq!(map.feature_count(), 3);
        assert!(map.fills_at(Instant::now()).iter().all(|&c| c == NO_DATA));
        assert_eq!(map.shapes()[1].code, "BBB");
        assert!(!map.shapes()[2].known);
    }

    #[test]
    fn recolor_uses_year_values() {
        let idx = index();
        let mut map = MapView::new(world(), &idx).unwrap();
        let start = Instant::now();
        map.recolor(2001, &idx, start);
        assert!(map.is_animating(start));
        // w chwili startu widać jeszcze stare kolory
        assert!(map.fills_at(start).iter().all(|&c| c == NO_DATA));
        let done = start + TRANSITION;
        let fills = map.fills_at(done);
        let scale = ColorScale::for_year(idx.by_year(2001));
        assert_eq!(fills[0], scale.color(20.0));
        assert_eq!(fills[1], scale.color(5.0));
        assert_eq!(fills[2], NO_DATA);
        map.tick(done);
        assert!(!map.is_animating(done));
    }

    #[test]
    fn click_returns_known_code_only() {
        let map = MapView::new(world(), &index()).unwrap();
        let (col, row) = cell_of(&map, "AAA");
        assert_eq!(map.click(AREA, col, row), Some("AAA"));
        let (col, row) = cell_of(&map, "ZZZ");
        assert_eq!(map.click(AREA, col, row), None);
    }

    #[test]
    fn selection_class_follows_state() {
        let mut map = MapView::new(world(), &index()).unwrap();
        let mut selection = SelectionState::new();
        selection.toggle("BBB");
        selection.toggle("ZZZ");
        map.apply_selection(&selection);
        let flags: Vec<bool> = map.shapes().iter().map(|s| s.selected).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn hit_testing_follows_zoom() {
        let mut map = MapView::new(world(), &index()).unwrap();
        let (col, row) = cell_of(&map, "BBB");
        map.zoom_at(AREA, Some((col, row)), 4.0);
        // punkt pod kursorem zostaje na miejscu
        assert_eq!(map.hit(AREA, col, row).map(|i| map.shapes[i].code.as_str()), Some("BBB"));
        assert_eq!(map.view().k, 4.0);
        map.zoom_at(AREA, None, 100.0);
        assert_eq!(map.view().k, MAX_ZOOM);
        map.reset_view();
        assert_eq!(map.view().k, MIN_ZOOM);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let mut map = MapView::new(world(), &index()).unwrap();
        map.zoom_at(AREA, None, 2.0);
        let before = map.view().center;
        map.pan(AREA, 3, 0);
        assert!(map.view().center.x < before.x);
    }

    #[test]
    fn rejects_non_collection() {
        let raw = GeoJson::from_str(r#"{"type":"Point","coordinates":[0,0]}"#).unwrap();
        assert!(matches!(MapView::new(raw, &index()), Err(AtlasError::NotFeatureCollection)));
    }
}
