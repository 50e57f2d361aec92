use std::collections::HashMap;

use ratatui::style::Color;

use crate::dataset::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(v: u32) -> Self {
        Self((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Interpolacja liniowa w przestrzeni sRGB, `t` w [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// Im większa, tym ciemniejszy kolor.
    #[cfg(test)]
    pub fn intensity(self) -> u16 {
        765 - (self.0 as u16 + self.1 as u16 + self.2 as u16)
    }

    pub fn to_tui(self) -> Color {
        Color::Rgb(self.0, self.1, self.2)
    }
}

/// Kolor dla zera, braku danych i nieznanych kodów.
pub const NO_DATA: Rgb = Rgb::hex(0xf0f0f0);

/// Skala sekwencyjna GnBu (ColorBrewer, 9 klas), od jasnej do ciemnej.
const GNBU: [Rgb; 9] = [
    Rgb::hex(0xf7fcf0),
    Rgb::hex(0xe0f3db),
    Rgb::hex(0xccebc5),
    Rgb::hex(0xa8ddb5),
    Rgb::hex(0x7bccc4),
    Rgb::hex(0x4eb3d3),
    Rgb::hex(0x2b8cbe),
    Rgb::hex(0x0868ac),
    Rgb::hex(0x084081),
];

pub fn interpolate_gnbu(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (GNBU.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(GNBU.len() - 2);
    GNBU[i].lerp(GNBU[i + 1], scaled - i as f64)
}

/// Skala kolorów dla jednego roku: dziedzina `[0, log10(max + 1)]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    max_log: f64,
}

impl ColorScale {
    pub fn for_year(records: &[Record]) -> Self {
        let max = records
            .iter()
            .map(|r| r.value)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        // rok bez danych (albo same zera) nie może dać dziedziny o zerowej szerokości
        let max = if max > 0.0 { max } else { 1.0 };
        Self { max_log: (max + 1.0).log10() }
    }

    pub fn domain(&self) -> (f64, f64) {
        (0.0, self.max_log)
    }

    pub fn color(&self, value: f64) -> Rgb {
        if !(value > 0.0) {
            return NO_DATA;
        }
        interpolate_gnbu((value + 1.0).log10() / self.max_log)
    }
}

/// Tableau10: kolory warstw wykresu warstwowego.
const TABLEAU10: [Rgb; 10] = [
    Rgb::hex(0x4e79a7),
    Rgb::hex(0xf28e2c),
    Rgb::hex(0xe15759),
    Rgb::hex(0x76b7b2),
    Rgb::hex(0x59a14f),
    Rgb::hex(0xedc949),
    Rgb::hex(0xaf7aa1),
    Rgb::hex(0xff9da7),
    Rgb::hex(0x9c755f),
    Rgb::hex(0xbab0ab),
];

/// Skala porządkowa: kod dostaje kolejny kolor przy pierwszym zapytaniu
/// i zachowuje go przy ponownym zaznaczeniu.
#[derive(Debug, Default)]
pub struct OrdinalPalette {
    assigned: HashMap<String, Rgb>,
}

impl OrdinalPalette {
    pub fn color(&mut self, code: &str) -> Rgb {
        let next = TABLEAU10[self.assigned.len() % TABLEAU10.len()];
        *self.assigned.entry(code.to_string()).or_insert(next)
    }
}
