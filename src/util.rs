//! Four-vector helpers, all in (E, px, py, pz) order

pub(crate) const GEV_TO_MEV: f64 = 1000.;

pub(crate) fn minkowski_sq(p: &[f64; 4]) -> f64 {
    p[0] * p[0] - p[1] * p[1] - p[2] * p[2] - p[3] * p[3]
}

pub(crate) fn sub(p: &[f64; 4], q: &[f64; 4]) -> [f64; 4] {
    [p[0] - q[0], p[1] - q[1], p[2] - q[2], p[3] - q[3]]
}

/// Invariant mass, negative for space-like vectors
pub(crate) fn mass(p: &[f64; 4]) -> f64 {
    let m2 = minkowski_sq(p);
    if m2 < 0. {
        -(-m2).sqrt()
    } else {
        m2.sqrt()
    }
}

pub(crate) fn kinetic_energy(p: &[f64; 4]) -> f64 {
    p[0] - mass(p)
}
