/// Liniowe odwzorowanie dziedziny na zakres (w komórkach terminala).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, r: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (r - r0) / (r1 - r0) * (d1 - d0)
    }
}

fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -10f64.powf(-power) / factor
    }
}

/// Rozszerza dziedzinę do "okrągłych" granic dla zadanej liczby podziałek.
pub fn nice(domain: (f64, f64), count: usize) -> (f64, f64) {
    let (mut start, mut stop) = domain;
    if !(stop > start) || !start.is_finite() || !stop.is_finite() {
        return domain;
    }
    let mut prev = 0.0;
    for _ in 0..10 {
        let step = tick_increment(start, stop, count);
        if step == prev || step == 0.0 || !step.is_finite() {
            break;
        }
        if step > 0.0 {
            start = (start / step).floor() * step;
            stop = (stop / step).ceil() * step;
        } else {
            start = (start * -step).floor() / -step;
            stop = (stop * -step).ceil() / -step;
        }
        prev = step;
    }
    (start, stop)
}

/// Wartości podziałek w obrębie dziedziny (rosnąco).
pub fn ticks(domain: (f64, f64), count: usize) -> Vec<f64> {
    let (start, stop) = domain;
    if !start.is_finite() || !stop.is_finite() || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (lo, hi) = if start < stop { (start, stop) } else { (stop, start) };
    let step = tick_increment(lo, hi, count);
    if step == 0.0 || !step.is_finite() {
        return Vec::new();
    }
    if step > 0.0 {
        let (i0, i1) = ((lo / step).ceil() as i64, (hi / step).floor() as i64);
        (i0..=i1).map(|i| i as f64 * step).collect()
    } else {
        let inv = -step;
        let (i0, i1) = ((lo * inv).ceil() as i64, (hi * inv).floor() as i64);
        (i0..=i1).map(|i| i as f64 / inv).collect()
    }
}

/// Krótka etykieta osi: 1.2k, 35M, 4B.
pub fn short_label(v: f64) -> String {
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e3 {
        (v / 1e3, "k")
    } else {
        (v, "")
    };
    if scaled.fract().abs() < 1e-9 {
        format!("{scaled:.0}{suffix}")
    } else {
        format!("{scaled:.1}{suffix}")
    }
}
