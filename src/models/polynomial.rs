//! Built-in low-order models used by the lab workflows.
//!
//! All of these are linear in their parameters, so their partial derivatives
//! are exact and cheap; the fitter still treats them like any other model.

use crate::models::Model;

/// `y = a*x + b`, parameters `[a, b]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Affine;

impl Model for Affine {
    fn label(&self) -> String {
        "y = a*x + b".to_string()
    }

    fn param_names(&self) -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * x + params[1]
    }

    fn gradient(&self, x: f64, _params: &[f64], out: &mut [f64]) -> bool {
        out[0] = x;
        out[1] = 1.0;
        true
    }
}

/// `y = a*x`, parameters `[a]` (line forced through the origin).
#[derive(Debug, Clone, Copy, Default)]
pub struct Proportional;

impl Model for Proportional {
    fn label(&self) -> String {
        "y = a*x".to_string()
    }

    fn param_names(&self) -> Vec<String> {
        vec!["a".to_string()]
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * x
    }

    fn gradient(&self, x: f64, _params: &[f64], out: &mut [f64]) -> bool {
        out[0] = x;
        true
    }
}

/// `y = c0 + c1*x + ... + cd*x^d`, parameters `[c0, ..., cd]`.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial {
    degree: usize,
}

impl Polynomial {
    pub fn new(degree: usize) -> Self {
        Self { degree }
    }

    pub fn quadratic() -> Self {
        Self::new(2)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl Model for Polynomial {
    fn label(&self) -> String {
        let terms: Vec<String> = (0..=self.degree)
            .map(|k| match k {
                0 => "c0".to_string(),
                1 => "c1*x".to_string(),
                _ => format!("c{k}*x^{k}"),
            })
            .collect();
        format!("y = {}", terms.join(" + "))
    }

    fn param_names(&self) -> Vec<String> {
        (0..=self.degree).map(|k| format!("c{k}")).collect()
    }

    fn param_len(&self) -> usize {
        self.degree + 1
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        // Horner's scheme.
        params.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    fn gradient(&self, x: f64, _params: &[f64], out: &mut [f64]) -> bool {
        let mut pow = 1.0;
        for slot in out.iter_mut().take(self.degree + 1) {
            *slot = pow;
            pow *= x;
        }
        true
    }
}

/// `y = y0 + v0*t - g*t^2/2`, parameters `[y0, v0, g]`.
///
/// A quadratic in disguise: the third coefficient is reported directly as the
/// gravitational acceleration `g`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeFall;

impl Model for FreeFall {
    fn label(&self) -> String {
        "y = y0 + v0*t - g*t^2/2".to_string()
    }

    fn param_names(&self) -> Vec<String> {
        vec!["y0".to_string(), "v0".to_string(), "g".to_string()]
    }

    fn eval(&self, t: f64, params: &[f64]) -> f64 {
        params[0] + params[1] * t - 0.5 * params[2] * t * t
    }

    fn gradient(&self, t: f64, _params: &[f64], out: &mut [f64]) -> bool {
        out[0] = 1.0;
        out[1] = t;
        out[2] = -0.5 * t * t;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polynomial_horner_matches_direct_sum() {
        let p = Polynomial::new(3);
        let c = [1.0, -2.0, 0.5, 4.0];
        let x = 1.7_f64;
        let direct = c[0] + c[1] * x + c[2] * x * x + c[3] * x.powi(3);
        assert!((p.eval(x, &c) - direct).abs() < 1e-12);
        assert_eq!(p.param_names(), vec!["c0", "c1", "c2", "c3"]);
        assert_eq!(p.label(), "y = c0 + c1*x + c2*x^2 + c3*x^3");
    }

    #[test]
    fn polynomial_degree_zero_is_constant() {
        let p = Polynomial::new(0);
        assert_eq!(p.param_len(), 1);
        assert_eq!(p.eval(123.0, &[7.5]), 7.5);
    }

    #[test]
    fn free_fall_is_reparameterized_quadratic() {
        let ff = FreeFall;
        let q = Polynomial::quadratic();
        let (y0, v0, g) = (1.5, 0.2, 9.81);
        for &t in &[0.0, 0.1, 0.35, 0.6] {
            let a = ff.eval(t, &[y0, v0, g]);
            let b = q.eval(t, &[y0, v0, -0.5 * g]);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn gradients_are_design_rows() {
        let mut out = [0.0; 3];
        assert!(FreeFall.gradient(2.0, &[0.0; 3], &mut out));
        assert_eq!(out, [1.0, 2.0, -2.0]);

        let mut out = [0.0; 2];
        assert!(Affine.gradient(3.0, &[0.0; 2], &mut out));
        assert_eq!(out, [3.0, 1.0]);
    }
}
