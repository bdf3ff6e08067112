//! Closed-form real roots of `a t^2 + b t + c = 0`

/// The two real roots, larger first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roots {
    pub t0: f64,
    pub t1: f64,
}

/// Solve the quadratic, returning `None` when there are no real roots
///
/// Uses the cancellation-free form `q = -(b + sign(b) sqrt(disc)) / 2`, `q / a`, `c / q`, so
/// near-tangent rays keep their precision. A vanishing `a` degrades to the linear equation.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<Roots> {
    if a == 0.0 {
        if b == 0.0 {
            return None;
        }
        let t = positive_zero(-c / b);
        return Some(Roots { t0: t, t1: t });
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        None
    } else if discriminant == 0.0 {
        let t = positive_zero(-0.5 * b / a);
        Some(Roots { t0: t, t1: t })
    } else {
        let sqrt_d = discriminant.sqrt();
        let q = if b > 0.0 {
            -0.5 * (b + sqrt_d)
        } else {
            -0.5 * (b - sqrt_d)
        };
        let first = positive_zero(q / a);
        let second = positive_zero(c / q);
        if first > second {
            Some(Roots {
                t0: first,
                t1: second,
            })
        } else {
            Some(Roots {
                t0: second,
                t1: first,
            })
        }
    }
}

/// `-0.0 + 0.0` is `+0.0`; every other value passes through
fn positive_zero(t: f64) -> f64 {
    t + 0.0
}
