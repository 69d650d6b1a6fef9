use std::time;

pub fn time(start: time::Instant) -> f32 {
    let elapsed = time::Instant::now() - start;

    elapsed.as_secs() as f32 + elapsed.subsec_nanos() as f32 * 1e-9
}

/// Clamp to `[0, 1]`, mapping NaN to 0
pub fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.max(0.0).min(1.0)
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sine ease-in-out over `[0, 1]`
pub fn ease_sine(t: f32) -> f32 {
    (1.0 - (t * std::f32::consts::PI).cos()) / 2.0
}

/// Format a CSS/SVG `hsl()` color
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> String {
    format!(
        "hsl({:.0}, {:.0}%, {:.0}%)",
        hue.rem_euclid(360.0),
        saturation,
        lightness
    )
}

/// Format a sequence of points the way SVG `points` attributes expect them
pub fn points<I: IntoIterator<Item = (f32, f32)>>(pts: I) -> String {
    let mut s = String::new();
    for (i, (x, y)) in pts.into_iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&format!("{:.1},{:.1}", x, y));
    }
    s
}

/// Build a smooth closed path through `pts` (Catmull-Rom converted to cubic beziers)
pub fn closed_curve(pts: &[(f32, f32)]) -> String {
    use std::fmt::Write;

    let n = pts.len();
    if n < 3 {
        return String::new();
    }

    let mut d = String::with_capacity(n * 40);
    let _ = write!(d, "M{:.1},{:.1}", pts[0].0, pts[0].1);
    for i in 0..n {
        let p0 = pts[(i + n - 1) % n];
        let p1 = pts[i];
        let p2 = pts[(i + 1) % n];
        let p3 = pts[(i + 2) % n];

        let c1 = (p1.0 + (p2.0 - p0.0) / 6.0, p1.1 + (p2.1 - p0.1) / 6.0);
        let c2 = (p2.0 - (p3.0 - p1.0) / 6.0, p2.1 - (p3.1 - p1.1) / 6.0);
        let _ = write!(
            d,
            " C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
            c1.0, c1.1, c2.0, c2.1, p2.0, p2.1
        );
    }
    d.push_str(" Z");
    d
}

/// Build an open polyline path
pub fn polyline<I: IntoIterator<Item = (f32, f32)>>(pts: I) -> String {
    use std::fmt::Write;

    let mut d = String::new();
    for (i, (x, y)) in pts.into_iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{:.1},{:.1} ", cmd, x, y);
    }
    d.pop();
    d
}
