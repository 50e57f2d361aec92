use std::time::Instant;

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use geojson::GeoJson;
use ratatui::layout::Rect;
use tracing::{debug, info};

use crate::{
    canvas::contains,
    dataset::DatasetIndex,
    error::Result,
    map_draw::MapView,
    selection::SelectionState,
    stacked::{ChartLayout, StackedArea},
    tooltip::{AreaTooltip, MapTooltip},
};

const ZOOM_STEP: f64 = 1.25;

/// Prostokąty z ostatniej klatki, potrzebne do trafiania myszą.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenLayout {
    pub map_panel: Rect,
    pub map: Rect,
    pub chart_panel: Rect,
    pub chart: ChartLayout,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    last: (u16, u16),
    moved: bool,
}

pub struct AppState {
    pub index: DatasetIndex,
    pub map: MapView,
    pub stacked: StackedArea,
    pub selection: SelectionState,
    pub year: i32,
    pub value_label: String,
    pub pointer: Option<(u16, u16)>,
    pub layout: ScreenLayout,
    drag: Option<Drag>,
}

impl AppState {
    pub const HELP_TEXT: &'static str =
        "←/→: rok · Home/End: pierwszy/ostatni · klik: zaznacz · r: reset · kółko/+/-: zoom · 0: widok · q: wyjście";

    pub fn new(index: DatasetIndex, world: GeoJson, value_label: String, year: i32) -> Result<Self> {
        let mut map = MapView::new(world, &index)?;
        let selection = SelectionState::new();
        let mut stacked = StackedArea::new(&index);
        stacked.update(&selection, &index);
        map.recolor(year, &index, Instant::now());
        info!(features = map.feature_count(), entities = index.entity_count(), year, "panel gotowy");

        Ok(Self {
            index,
            map,
            stacked,
            selection,
            year,
            value_label,
            pointer: None,
            layout: ScreenLayout::default(),
            drag: None,
        })
    }

    /// Przełącza kod; nieznane kody są ignorowane.
    pub fn toggle(&mut self, code: &str) {
        if !self.index.contains(code) {
            return;
        }
        let selected = self.selection.toggle(code);
        debug!(code, selected, "zmiana zaznaczenia");
        self.refresh_selection();
    }

    pub fn reset_selection(&mut self) {
        self.selection.clear();
        debug!("zaznaczenie wyczyszczone");
        self.refresh_selection();
    }

    fn refresh_selection(&mut self) {
        self.map.apply_selection(&self.selection);
        self.stacked.update(&self.selection, &self.index);
    }

    pub fn set_year(&mut self, year: i32, now: Instant) {
        let (min, max) = self.index.year_range();
        let year = year.clamp(min, max);
        if year == self.year {
            return;
        }
        self.year = year;
        self.map.recolor(year, &self.index, now);
    }

    /// Następny / poprzedni rok z sekwencji lat w danych.
    pub fn step_year(&mut self, forward: bool, now: Instant) {
        let years = self.index.years();
        let next = if forward {
            years.iter().copied().find(|&y| y > self.year)
        } else {
            years.iter().rev().copied().find(|&y| y < self.year)
        };
        if let Some(year) = next {
            self.set_year(year, now);
        }
    }

    /// Zwraca true, jeśli trzeba wyjść
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        let now = Instant::now();
        match key {
            Char('q') | Esc => return true,
            Left => self.step_year(false, now),
            Right => self.step_year(true, now),
            Home => self.set_year(self.index.year_range().0, now),
            End => self.set_year(self.index.year_range().1, now),
            Char('r') => self.reset_selection(),
            Char('+') | Char('=') => self.map.zoom_at(self.layout.map, None, ZOOM_STEP),
            Char('-') => self.map.zoom_at(self.layout.map, None, 1.0 / ZOOM_STEP),
            Char('0') => self.map.reset_view(),
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, ev: MouseEvent) {
        let pos = (ev.column, ev.row);
        self.pointer = Some(pos);
        let map = self.layout.map;
        let in_map = contains(map, pos.0, pos.1);

        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if in_map {
                    self.drag = Some(Drag { last: pos, moved: false });
                } else if let Some(code) = self.stacked.legend_hit(self.layout.chart.legend, pos.0, pos.1) {
                    let code = code.to_string();
                    self.toggle(&code);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(drag) = self.drag.as_mut() {
                    let dcol = pos.0 as i32 - drag.last.0 as i32;
                    let drow = pos.1 as i32 - drag.last.1 as i32;
                    if dcol != 0 || drow != 0 {
                        drag.last = pos;
                        drag.moved = true;
                        self.map.pan(map, dcol, drow);
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                // przeciągnięcie przesuwa mapę, samo kliknięcie zaznacza
                if let Some(drag) = self.drag.take() {
                    if !drag.moved && in_map {
                        if let Some(code) = self.map.click(map, pos.0, pos.1).map(str::to_string) {
                            self.toggle(&code);
                        }
                    }
                }
            }
            MouseEventKind::ScrollUp if in_map => self.map.zoom_at(map, Some(pos), ZOOM_STEP),
            MouseEventKind::ScrollDown if in_map => self.map.zoom_at(map, Some(pos), 1.0 / ZOOM_STEP),
            _ => {}
        }
    }

    /// Dymek mapy dla obiektu pod kursorem.
    pub fn map_tooltip(&self) -> Option<MapTooltip> {
        let (col, row) = self.pointer?;
        let i = self.map.hit(self.layout.map, col, row)?;
        Some(MapTooltip::for_shape(self.map.shape(i)?, &self.index))
    }

    /// Dymek wykresu warstwowego dla kolumny pod kursorem.
    pub fn area_tooltip(&self) -> Option<AreaTooltip> {
        let (col, row) = self.pointer?;
        let plot = self.layout.chart.plot;
        if !contains(plot, col, row) {
            return None;
        }
        AreaTooltip::at_column(&self.stacked, plot, col, &self.index)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.map.is_animating(now)
    }

    pub fn tick(&mut self, now: Instant) {
        self.map.tick(now);
    }
}
