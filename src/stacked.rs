use std::collections::{BTreeMap, btree_map::Entry};

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    widgets::canvas::{Canvas, Painter, Shape},
    Frame,
};
use tracing::debug;

use crate::{
    canvas::{PixelGrid, contains},
    color::{OrdinalPalette, Rgb},
    dataset::DatasetIndex,
    scale::{LinearScale, nice, short_label, ticks},
    selection::SelectionState,
};

/// Szerokość jednej pozycji legendy w komórkach.
pub const LEGEND_SLOT: u16 = 16;
const MAX_LEGEND_ROWS: u16 = 3;
const Y_GUTTER: u16 = 8;
const AXIS_COLOR: Color = Color::Gray;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StackPoint {
    pub year: i32,
    pub baseline: f64,
    pub top: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackedSeries {
    pub code: String,
    pub points: Vec<StackPoint>,
}

/// Układ warstwowy: dla każdego roku suma narastająca po kodach w podanej
/// kolejności; brak wartości liczy się jako 0.
pub fn stack_layout(keys: &[String], index: &DatasetIndex) -> Vec<StackedSeries> {
    let mut series: Vec<StackedSeries> = keys
        .iter()
        .map(|code| StackedSeries { code: code.clone(), points: Vec::with_capacity(index.years().len()) })
        .collect();
    for &year in index.years() {
        let mut baseline = 0.0;
        for s in &mut series {
            let top = baseline + index.value(year, &s.code);
            s.points.push(StackPoint { year, baseline, top });
            baseline = top;
        }
    }
    series
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub series: StackedSeries,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub code: String,
    pub name: String,
    pub color: Rgb,
}

/// Prostokąty wykresu: legenda, etykiety osi Y, pole wykresu, etykiety osi X.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChartLayout {
    pub legend: Rect,
    pub y_axis: Rect,
    pub plot: Rect,
    pub x_axis: Rect,
}

impl ChartLayout {
    pub fn new(area: Rect, legend_len: usize) -> Self {
        let per_row = (area.width / LEGEND_SLOT).max(1) as usize;
        let legend_rows = (legend_len.div_ceil(per_row) as u16).clamp(1, MAX_LEGEND_ROWS);
        let legend = Rect { height: legend_rows.min(area.height), ..area };
        let body_h = area.height.saturating_sub(legend.height).saturating_sub(2);
        let body_y = area.y + legend.height;
        let gutter = Y_GUTTER.min(area.width);
        let y_axis = Rect::new(area.x, body_y, gutter, body_h);
        let plot = Rect::new(area.x + gutter, body_y, area.width - gutter, body_h);
        let x_axis = Rect::new(plot.x, body_y + body_h, plot.width, area.height.saturating_sub(legend.height + body_h));
        Self { legend, y_axis, plot, x_axis }
    }
}

/// Wykres warstwowy dla zaznaczonych kodów wraz z legendą.
#[derive(Debug)]
pub struct StackedArea {
    layers: BTreeMap<String, Layer>,
    keys: Vec<String>,
    legend: Vec<LegendEntry>,
    x_domain: (i32, i32),
    y_domain: (f64, f64),
    palette: OrdinalPalette,
}

impl StackedArea {
    pub fn new(index: &DatasetIndex) -> Self {
        Self {
            layers: BTreeMap::new(),
            keys: Vec::new(),
            legend: Vec::new(),
            x_domain: index.year_range(),
            y_domain: (0.0, 1.0),
            palette: OrdinalPalette::default(),
        }
    }

    /// Przelicza warstwy dla zbioru; dwukrotne wywołanie z tym samym zbiorem
    /// daje ten sam wynik.
    pub fn update(&mut self, selection: &SelectionState, index: &DatasetIndex) {
        let keys = selection.sorted();
        // oś czasu zawsze obejmuje wszystkie lata
        self.x_domain = index.year_range();

        if keys.is_empty() {
            self.layers.clear();
            self.keys.clear();
            self.legend.clear();
            self.y_domain = (0.0, 1.0);
            debug!("wykres warstwowy wyczyszczony");
            return;
        }

        let stacked = stack_layout(&keys, index);
        let max_top = stacked
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.top))
            .fold(0.0_f64, f64::max);
        self.y_domain = if max_top > 0.0 { nice((0.0, max_top), 10) } else { (0.0, 1.0) };

        let before = self.layers.len();
        self.layers.retain(|code, _| keys.binary_search(code).is_ok());
        let removed = before - self.layers.len();
        let mut added = 0;
        for series in stacked {
            let color = self.palette.color(&series.code);
            match self.layers.entry(series.code.clone()) {
                Entry::Occupied(mut e) => {
                    let layer = e.get_mut();
                    layer.series = series;
                    layer.color = color;
                }
                Entry::Vacant(e) => {
                    e.insert(Layer { series, color });
                    added += 1;
                }
            }
        }

        self.legend = keys
            .iter()
            .map(|code| LegendEntry {
                code: code.clone(),
                name: index.name(code).unwrap_or(code).to_string(),
                color: self.layers[code].color,
            })
            .collect();
        self.keys = keys;
        debug!(layers = self.keys.len(), added, removed, "przeliczono wykres warstwowy");
    }

    /// Kody aktualnie rysowane, rosnąco.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[cfg(test)]
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    #[cfg(test)]
    pub fn layer(&self, code: &str) -> Option<&Layer> {
        self.layers.get(code)
    }

    #[cfg(test)]
    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    #[cfg(test)]
    pub fn x_domain(&self) -> (i32, i32) {
        self.x_domain
    }

    #[cfg(test)]
    pub fn y_domain(&self) -> (f64, f64) {
        self.y_domain
    }

    pub fn layout(&self, area: Rect) -> ChartLayout {
        ChartLayout::new(area, self.legend.len())
    }

    fn x_bounds(&self) -> [f64; 2] {
        let (min, max) = self.x_domain;
        if min == max {
            [min as f64 - 0.5, max as f64 + 0.5]
        } else {
            [min as f64, max as f64]
        }
    }

    fn grid(&self, plot: Rect) -> PixelGrid {
        PixelGrid::half_block(plot, self.x_bounds(), [self.y_domain.0, self.y_domain.1])
    }

    /// Skala pozioma: rok → kolumna pola wykresu (0 = lewa krawędź).
    pub fn x_scale(&self, plot: Rect) -> LinearScale {
        let [x0, x1] = self.x_bounds();
        LinearScale::new((x0, x1), (0.0, plot.width.saturating_sub(1).max(1) as f64))
    }

    /// Ile pozycji legendy mieści się w `area` i ile zostaje ukrytych.
    /// Przy przepełnieniu ostatnie miejsce zajmuje znacznik `+N`.
    fn legend_fit(&self, area: Rect) -> (usize, usize) {
        let per_row = (area.width / LEGEND_SLOT).max(1) as usize;
        let capacity = per_row * area.height as usize;
        let len = self.legend.len();
        if len <= capacity {
            (len, 0)
        } else {
            let shown = capacity.saturating_sub(1);
            (shown, len - shown)
        }
    }

    /// Kod pozycji legendy pod komórką.
    pub fn legend_hit(&self, legend: Rect, col: u16, row: u16) -> Option<&str> {
        if !contains(legend, col, row) {
            return None;
        }
        let per_row = (legend.width / LEGEND_SLOT).max(1);
        let slot = (col - legend.x) / LEGEND_SLOT;
        if slot >= per_row {
            return None;
        }
        let i = ((row - legend.y) * per_row + slot) as usize;
        let (shown, _) = self.legend_fit(legend);
        self.legend[..shown].get(i).map(|e| e.code.as_str())
    }

    pub fn render(&self, f: &mut Frame, layout: &ChartLayout) {
        self.render_legend(f, layout.legend);
        self.render_axes(f, layout);

        let grid = self.grid(layout.plot);
        let canvas = Canvas::default()
            .marker(Marker::HalfBlock)
            .x_bounds(grid.x)
            .y_bounds(grid.y)
            .paint(|ctx| {
                for layer in self.layers.values() {
                    ctx.draw(&StackBand { points: &layer.series.points, grid, color: layer.color.to_tui() });
                }
            });
        f.render_widget(canvas, layout.plot);

        if self.keys.is_empty() {
            let hint = "Kliknij kraj na mapie";
            let p = layout.plot;
            let x = p.x + p.width.saturating_sub(hint.len() as u16) / 2;
            put(f, p, x, p.y + p.height / 2, hint, Style::default().fg(Color::DarkGray));
        }
    }

    fn render_legend(&self, f: &mut Frame, area: Rect) {
        let per_row = (area.width / LEGEND_SLOT).max(1);
        let slot_at = |i: usize| {
            let i = i as u16;
            (area.x + (i % per_row) * LEGEND_SLOT, area.y + i / per_row)
        };
        let (shown, hidden) = self.legend_fit(area);
        for (i, entry) in self.legend[..shown].iter().enumerate() {
            let (x, y) = slot_at(i);
            put(f, area, x, y, "■", Style::default().fg(entry.color.to_tui()));
            let name: String = entry.name.chars().take(LEGEND_SLOT as usize - 3).collect();
            put(f, area, x + 2, y, &name, Style::default());
        }
        if hidden > 0 {
            let (x, y) = slot_at(shown);
            put(f, area, x, y, &format!("+{hidden}"), Style::default().fg(Color::DarkGray));
        }
    }

    fn render_axes(&self, f: &mut Frame, layout: &ChartLayout) {
        let style = Style::default().fg(AXIS_COLOR);
        let plot = layout.plot;
        if plot.height > 0 {
            let y_scale = LinearScale::new(
                self.y_domain,
                ((plot.y + plot.height - 1) as f64, plot.y as f64),
            );
            for t in ticks(self.y_domain, 6) {
                let label = short_label(t);
                let row = y_scale.apply(t).round() as u16;
                let gutter = layout.y_axis;
                let x = (gutter.x + gutter.width.saturating_sub(1)).saturating_sub(label.len() as u16);
                put(f, gutter, x.max(gutter.x), row, &label, style);
            }
        }

        let axis = layout.x_axis;
        if axis.height == 0 {
            return;
        }
        let x_scale = self.x_scale(plot);
        let (min, max) = self.x_domain;
        for t in ticks((min as f64, max as f64), 6) {
            if t.fract() != 0.0 {
                continue;
            }
            let label = format!("{t:.0}");
            let col = plot.x + x_scale.apply(t).round() as u16;
            let x = col.saturating_sub(label.len() as u16 / 2).max(axis.x);
            put(f, axis, x, axis.y, &label, style);
        }
        if axis.height > 1 {
            let title = "Rok";
            put(f, axis, axis.x + axis.width.saturating_sub(title.len() as u16) / 2, axis.y + 1, title, style);
        }
    }
}

/// Napis przycięty do prostokąta `clip`.
pub(crate) fn put(f: &mut Frame, clip: Rect, x: u16, y: u16, text: &str, style: Style) {
    if !contains(clip, x, y) {
        return;
    }
    let room = (clip.x + clip.width - x) as usize;
    let text: String = text.chars().take(room).collect();
    f.buffer_mut().set_string(x, y, text, style);
}

/// Jedna warstwa: piksele między linią bazową a wierzchołkiem,
/// interpolowane liniowo między latami.
struct StackBand<'a> {
    points: &'a [StackPoint],
    grid: PixelGrid,
    color: Color,
}

impl StackBand<'_> {
    /// Pasmo dla kolumny `col`, próbkowane w tym samym roku, który
    /// `StackedArea::x_scale` przypisuje tej kolumnie.
    fn column_band(&self, col: usize) -> Option<(f64, f64)> {
        band_at(self.points, self.grid.x_at(col as f64))
    }
}

fn band_at(points: &[StackPoint], x: f64) -> Option<(f64, f64)> {
    let (first, last) = (points.first()?, points.last()?);
    if x <= first.year as f64 {
        return Some((first.baseline, first.top));
    }
    if x >= last.year as f64 {
        return Some((last.baseline, last.top));
    }
    let i = points.partition_point(|p| (p.year as f64) <= x);
    let (a, b) = (points[i - 1], points[i]);
    let t = (x - a.year as f64) / (b.year - a.year) as f64;
    Some((a.baseline + (b.baseline - a.baseline) * t, a.top + (b.top - a.top) * t))
}

impl Shape for StackBand<'_> {
    fn draw(&self, painter: &mut Painter) {
        for col in 0..self.grid.cols {
            let Some((baseline, top)) = self.column_band(col) else {
                return;
            };
            // środek kolumny, żeby get_point trafił w piksel `col`
            let x = self.grid.x_at(col as f64 + 0.5);
            if top <= baseline {
                continue;
            }
            for row in 0..self.grid.rows {
                let y = self.grid.y_at(row as f64 + 0.5);
                if y >= baseline && y < top {
                    if let Some((px, py)) = painter.get_point(x, y) {
                        painter.paint(px, py, self.color);
                    }
                }
            }
        }
    }
}
