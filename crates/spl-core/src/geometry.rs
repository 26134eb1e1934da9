use crate::constants::NORM_EPSILON;

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Euclidean distance between two points of equal dimensionality.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Normalize in place; vectors shorter than `NORM_EPSILON` are left untouched.
pub fn normalize_in_place(v: &mut [f64]) {
    let n = norm(v);
    if n > NORM_EPSILON {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}

pub fn normalized(v: &[f64]) -> Vec<f64> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// `b - a`
pub fn sub(b: &[f64], a: &[f64]) -> Vec<f64> {
    b.iter().zip(a).map(|(y, x)| y - x).collect()
}

pub fn add_assign(target: &mut [f64], delta: &[f64]) {
    for (t, d) in target.iter_mut().zip(delta) {
        *t += d;
    }
}

pub fn scaled(v: &[f64], factor: f64) -> Vec<f64> {
    v.iter().map(|x| x * factor).collect()
}

/// Arithmetic mean of a set of points, `None` when the set is empty.
pub fn mean<'a, I>(points: I, dims: usize) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum = vec![0.0; dims];
    let mut count = 0usize;
    for p in points {
        add_assign(&mut sum, p);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let inv = 1.0 / count as f64;
    for s in &mut sum {
        *s *= inv;
    }
    Some(sum)
}
