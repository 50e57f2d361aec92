use geo::{Coord, LineString, MultiPolygon};
use ratatui::{
    layout::Rect,
    style::Color,
    widgets::canvas::{Painter, Shape},
};

/// Siatka pikseli płótna w trybie półbloków: szerokość w komórkach,
/// wysokość dwa piksele na komórkę. Próbkujemy środki pikseli tak, żeby
/// `Painter::get_point` trafiał dokładnie w ten sam piksel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelGrid {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub cols: usize,
    pub rows: usize,
}

impl PixelGrid {
    pub fn half_block(area: Rect, x: [f64; 2], y: [f64; 2]) -> Self {
        Self { x, y, cols: area.width as usize, rows: area.height as usize * 2 }
    }

    fn dx(&self) -> f64 {
        (self.x[1] - self.x[0]) / self.cols.saturating_sub(1).max(1) as f64
    }

    fn dy(&self) -> f64 {
        (self.y[1] - self.y[0]) / self.rows.saturating_sub(1).max(1) as f64
    }

    /// Współrzędna x dla ułamkowej pozycji piksela (środek kolumny `c` to `c + 0.5`).
    pub fn x_at(&self, col: f64) -> f64 {
        (self.x[0] + col * self.dx()).min(self.x[1])
    }

    pub fn y_at(&self, row: f64) -> f64 {
        (self.y[1] - row * self.dy()).max(self.y[0])
    }

    /// Kolumny, których środki leżą w `[xa, xb]`.
    pub fn col_span(&self, xa: f64, xb: f64) -> Option<(usize, usize)> {
        if self.cols == 0 || !(self.dx() > 0.0) {
            return None;
        }
        let first = ((xa - self.x[0]) / self.dx() - 0.5).ceil().max(0.0);
        let last = ((xb - self.x[0]) / self.dx() - 0.5).floor().min((self.cols - 1) as f64);
        (last >= first).then_some((first as usize, last as usize))
    }

    /// Punkt świata pod komórką terminala `(col, row)`; `None` poza obszarem.
    pub fn cell_to_world(&self, area: Rect, col: u16, row: u16) -> Option<Coord<f64>> {
        if !contains(area, col, row) {
            return None;
        }
        let c = (col - area.x) as f64 + 0.5;
        let r = (row - area.y) as f64 * 2.0 + 1.0;
        Some(Coord { x: self.x_at(c), y: self.y_at(r) })
    }
}

pub fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && row >= area.y
        && (col as u32) < area.x as u32 + area.width as u32
        && (row as u32) < area.y as u32 + area.height as u32
}

/// Wielokąt wypełniany metodą linii skanujących (reguła parzystości,
/// więc dziury są zachowane).
pub struct FilledRegion<'a> {
    pub polygons: &'a MultiPolygon<f64>,
    pub grid: PixelGrid,
    pub color: Color,
}

fn ring_crossings(ring: &LineString<f64>, y: f64, out: &mut Vec<f64>) {
    for edge in ring.0.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
            out.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
        }
    }
}

impl Shape for FilledRegion<'_> {
    fn draw(&self, painter: &mut Painter) {
        let mut xs = Vec::new();
        for row in 0..self.grid.rows {
            let y = self.grid.y_at(row as f64 + 0.5);
            xs.clear();
            for poly in &self.polygons.0 {
                ring_crossings(poly.exterior(), y, &mut xs);
                for hole in poly.interiors() {
                    ring_crossings(hole, y, &mut xs);
                }
            }
            xs.sort_by(f64::total_cmp);
            for span in xs.chunks_exact(2) {
                let Some((first, last)) = self.grid.col_span(span[0], span[1]) else {
                    continue;
                };
                for col in first..=last {
                    let x = self.grid.x_at(col as f64 + 0.5);
                    if let Some((px, py)) = painter.get_point(x, y) {
                        painter.paint(px, py, self.color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PixelGrid {
        PixelGrid::half_block(Rect::new(0, 0, 11, 5), [0.0, 10.0], [0.0, 9.0])
    }

    #[test]
    fn samples_stay_inside_bounds() {
        let g = grid();
        assert_eq!(g.x_at(0.5), 0.5);
        assert_eq!(g.x_at(10.5), 10.0);
        assert_eq!(g.y_at(0.5), 8.5);
        assert_eq!(g.y_at(9.5), 0.0);
    }

    #[test]
    fn col_span_clamps() {
        let g = grid();
        assert_eq!(g.col_span(-5.0, 2.6), Some((0, 2)));
        assert_eq!(g.col_span(8.0, 50.0), Some((8, 10)));
        assert_eq!(g.col_span(3.6, 3.9), None);
    }

    #[test]
    fn cell_outside_area_has_no_world_point() {
        let area = Rect::new(2, 3, 11, 5);
        let g = PixelGrid::half_block(area, [0.0, 10.0], [0.0, 9.0]);
        assert!(g.cell_to_world(area, 1, 3).is_none());
        assert!(g.cell_to_world(area, 13, 3).is_none());
        let p = g.cell_to_world(area, 2, 3).unwrap();
        assert_eq!(p, Coord { x: 0.5, y: 8.0 });
    }
}
