use nalgebra::{DMatrix, DVector};

use crate::constants::PSEUDO_INVERSE_EPSILON;
use crate::error::{MatchError, Result};

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Evenly spaced abscissae over `[-1, 1]`, used to keep Vandermonde
/// matrices well conditioned regardless of the spectrum's wavenumber range.
pub fn unit_abscissae(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Vandermonde matrix with columns `x^0 .. x^degree`
pub fn vandermonde(x: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), degree + 1, |row, col| x[row].powi(col as i32))
}

/// Least-squares polynomial fit reusable across many right-hand sides.
///
/// The pseudo-inverse of the design matrix is computed once; each
/// [`PolynomialFit::coefficients`] call is then a single matrix-vector product.
pub struct PolynomialFit {
    design: DMatrix<f64>,
    pseudo_inverse: DMatrix<f64>,
}

impl PolynomialFit {
    pub fn new(x: &[f64], degree: usize) -> Result<Self> {
        if x.is_empty() {
            return Err(MatchError::InvalidInput(
                "cannot fit a polynomial to no points".to_string(),
            ));
        }
        let design = vandermonde(x, degree);
        let pseudo_inverse = design
            .clone()
            .pseudo_inverse(PSEUDO_INVERSE_EPSILON)
            .map_err(|e| MatchError::Numeric(format!("pseudo-inverse failed: {}", e)))?;
        Ok(Self {
            design,
            pseudo_inverse,
        })
    }

    pub fn coefficients(&self, y: &DVector<f64>) -> DVector<f64> {
        &self.pseudo_inverse * y
    }

    pub fn evaluate(&self, coefficients: &DVector<f64>) -> DVector<f64> {
        &self.design * coefficients
    }
}
