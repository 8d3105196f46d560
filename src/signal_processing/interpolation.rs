use crate::error::{MatchError, Result};

/// Minimum number of knots for a cubic interpolant
pub const MIN_SPLINE_POINTS: usize = 4;

/// Natural cubic spline through a set of strictly increasing knots.
///
/// Second derivatives vanish at both ends. Evaluation outside the knot
/// range is rejected rather than extrapolated.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(MatchError::InvalidInput(format!(
                "spline knots: x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < MIN_SPLINE_POINTS {
            return Err(MatchError::InvalidInput(format!(
                "cubic interpolation needs at least {} points, got {}",
                MIN_SPLINE_POINTS,
                x.len()
            )));
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MatchError::InvalidInput(format!(
                "spline knots must be strictly increasing (x[{}] = {}, x[{}] = {})",
                i,
                x[i],
                i + 1,
                x[i + 1]
            )));
        }

        let second_derivatives = solve_second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            second_derivatives,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn evaluate(&self, t: f64) -> Result<f64> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&t) {
            return Err(MatchError::InvalidInput(format!(
                "{} is outside the interpolation range [{}, {}]",
                t, lo, hi
            )));
        }

        // Segment k spans x[k]..=x[k+1]
        let k = match self.x.partition_point(|&v| v <= t) {
            0 => 0,
            p => (p - 1).min(self.x.len() - 2),
        };

        let h = self.x[k + 1] - self.x[k];
        let a = (self.x[k + 1] - t) / h;
        let b = (t - self.x[k]) / h;
        let m = &self.second_derivatives;

        Ok(a * self.y[k]
            + b * self.y[k + 1]
            + ((a * a * a - a) * m[k] + (b * b * b - b) * m[k + 1]) * h * h / 6.0)
    }
}

/// Tridiagonal solve (Thomas algorithm) for natural-spline second derivatives.
fn solve_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    let interior = n - 2;

    let mut diag = vec![0.0; interior];
    let mut upper = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];

    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let row = i - 1;
        diag[row] = 2.0 * (h0 + h1);
        upper[row] = h1;
        rhs[row] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    // Forward elimination; the sub-diagonal entry of row r is x[r+1] - x[r]
    for row in 1..interior {
        let lower = x[row + 1] - x[row];
        let factor = lower / diag[row - 1];
        diag[row] -= factor * upper[row - 1];
        rhs[row] -= factor * rhs[row - 1];
    }

    for row in (0..interior).rev() {
        let next = if row + 1 < interior { m[row + 2] } else { 0.0 };
        m[row + 1] = (rhs[row] - upper[row] * next) / diag[row];
    }

    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 1.0, 2.5, 3.0, 5.0];
        let y = [1.0, -2.0, 0.5, 4.0, 3.0];
        let spline = CubicSpline::new(&x, &y).unwrap();
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            assert_abs_diff_eq!(spline.evaluate(xi).unwrap(), yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reproduces_linear_data() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(spline.evaluate(1.5).unwrap(), 3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(spline.evaluate(3.25).unwrap(), 8.75, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_function_close() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(spline.evaluate(2.1).unwrap(), 2.1_f64.sin(), epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert!(CubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0, 1.0, 2.0], &[0.0; 4]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0, 2.0, 3.0], &[0.0; 3]).is_err());
    }

    #[test]
    fn test_rejects_extrapolation() {
        let spline = CubicSpline::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert!(spline.evaluate(-0.1).is_err());
        assert!(spline.evaluate(3.1).is_err());
        assert!(spline.evaluate(3.0).is_ok());
    }
}
