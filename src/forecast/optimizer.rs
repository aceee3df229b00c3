// =============================================================================
// Nelder–Mead simplex minimiser
// =============================================================================
//
// Derivative-free minimisation of a scalar loss over R^n.  Each iteration
// sorts the n + 1 vertices by loss and replaces the worst one by, in order of
// preference:
//
//   reflection   xr = c + 1.0 * (c - worst)
//   expansion    xe = c + 2.0 * (xr - c)
//   contraction  xc = c + 0.5 * (xr - c)   (outside)  or
//                xc = c + 0.5 * (worst - c) (inside)
//
// where c is the centroid of every vertex but the worst.  When no candidate
// improves on the worst vertex the whole simplex shrinks halfway towards the
// best one.
//
// Converged when both
//   loss spread   f(worst) - f(best)        <= tol * (1 + |f(best)|)
//   simplex size  max_i ||x_i - x_best||∞  <= sqrt(tol) * (1 + ||x_best||∞)
//
// A restart rebuilds a fresh simplex around the best vertex, which recovers
// from a simplex that collapsed onto a subspace.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{EngineError, Result};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Relative step used for a non-zero starting coordinate.
const RELATIVE_STEP: f64 = 0.05;

fn default_max_iterations() -> usize {
    2000
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_initial_step() -> f64 {
    0.1
}

fn default_restarts() -> usize {
    1
}

/// Tuning knobs of the minimiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Iteration budget of a single run (restarts get their own budget).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Simplex edge for a starting coordinate equal to zero.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    #[serde(default = "default_restarts")]
    pub restarts: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            initial_step: default_initial_step(),
            restarts: default_restarts(),
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(EngineError::invalid_parameter(
                "max_iterations",
                "iteration budget must be greater than 0",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "tolerance",
                format!("tolerance must be a finite value > 0, got {}", self.tolerance),
            ));
        }
        if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "initial_step",
                format!("step must be a finite value > 0, got {}", self.initial_step),
            ));
        }
        Ok(())
    }
}

/// Best point found by [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub params: Vec<f64>,
    pub loss: f64,
    /// Iterations summed over every run, restarts included.
    pub iterations: usize,
    /// Whether the last run met both convergence criteria.
    pub converged: bool,
}

#[derive(Debug, Clone)]
struct Vertex {
    params: Vec<f64>,
    loss: f64,
}

/// Minimise `loss` starting from `start`.
///
/// Non-finite losses are treated as `+∞`, so the simplex walks away from
/// regions where the objective blows up.  Never fails: when the budget runs
/// out the best vertex so far is returned with `converged == false`.
pub fn minimize<F>(loss: F, start: &[f64], settings: &OptimizerSettings) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let value = loss(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    if start.is_empty() {
        return Minimum {
            params: Vec::new(),
            loss: eval(start),
            iterations: 0,
            converged: true,
        };
    }

    let mut best = run(&eval, start, settings);
    let mut iterations = best.iterations;

    for restart in 0..settings.restarts {
        trace!(restart, loss = best.loss, "restarting simplex from best vertex");
        let next = run(&eval, &best.params, settings);
        iterations += next.iterations;
        let improved = next.loss <= best.loss;
        let converged = next.converged;
        if improved {
            best = next;
        }
        best.converged = converged;
    }

    best.iterations = iterations;
    if !best.converged {
        warn!(
            iterations,
            loss = best.loss,
            "simplex did not converge, keeping best vertex"
        );
    }
    best
}

/// One Nelder–Mead run from a fresh simplex around `start`.
fn run<F>(eval: &F, start: &[f64], settings: &OptimizerSettings) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let mut simplex = initial_simplex(eval, start, settings.initial_step);
    let dim = start.len();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        simplex.sort_by(|a, b| a.loss.total_cmp(&b.loss));

        if has_converged(&simplex, settings.tolerance) {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = centroid(&simplex[..dim]);
        let worst = &simplex[dim];

        let reflected = lerp(&centroid, &worst.params, -REFLECTION);
        let reflected_loss = eval(&reflected);

        if reflected_loss < simplex[0].loss {
            let expanded = lerp(&centroid, &reflected, EXPANSION);
            let expanded_loss = eval(&expanded);
            simplex[dim] = if expanded_loss < reflected_loss {
                Vertex {
                    params: expanded,
                    loss: expanded_loss,
                }
            } else {
                Vertex {
                    params: reflected,
                    loss: reflected_loss,
                }
            };
            continue;
        }

        if reflected_loss < simplex[dim - 1].loss {
            simplex[dim] = Vertex {
                params: reflected,
                loss: reflected_loss,
            };
            continue;
        }

        let (contracted, accept_below) = if reflected_loss < worst.loss {
            (lerp(&centroid, &reflected, CONTRACTION), reflected_loss)
        } else {
            (lerp(&centroid, &worst.params, CONTRACTION), worst.loss)
        };
        let contracted_loss = eval(&contracted);

        if contracted_loss < accept_below {
            simplex[dim] = Vertex {
                params: contracted,
                loss: contracted_loss,
            };
            continue;
        }

        shrink(eval, &mut simplex);
    }

    simplex.sort_by(|a, b| a.loss.total_cmp(&b.loss));
    let best = simplex.swap_remove(0);
    Minimum {
        params: best.params,
        loss: best.loss,
        iterations,
        converged,
    }
}

fn initial_simplex<F>(eval: &F, start: &[f64], initial_step: f64) -> Vec<Vertex>
where
    F: Fn(&[f64]) -> f64,
{
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(Vertex {
        params: start.to_vec(),
        loss: eval(start),
    });
    for i in 0..start.len() {
        let mut params = start.to_vec();
        params[i] += if start[i] != 0.0 {
            RELATIVE_STEP * start[i]
        } else {
            initial_step
        };
        let loss = eval(&params);
        simplex.push(Vertex { params, loss });
    }
    simplex
}

/// Expects `simplex` sorted by ascending loss.
fn has_converged(simplex: &[Vertex], tolerance: f64) -> bool {
    let best = &simplex[0];
    let worst = &simplex[simplex.len() - 1];

    let spread = worst.loss - best.loss;
    if !(spread <= tolerance * (1.0 + best.loss.abs())) {
        return false;
    }

    let scale = 1.0 + best.params.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    let size = simplex[1..]
        .iter()
        .flat_map(|v| v.params.iter().zip(&best.params).map(|(a, b)| (a - b).abs()))
        .fold(0.0_f64, f64::max);
    size <= tolerance.sqrt() * scale
}

fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let dim = vertices[0].params.len();
    let mut c = vec![0.0; dim];
    for v in vertices {
        for (ci, xi) in c.iter_mut().zip(&v.params) {
            *ci += xi;
        }
    }
    let n = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= n);
    c
}

/// `from + t * (to - from)`.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn shrink<F>(eval: &F, simplex: &mut [Vertex])
where
    F: Fn(&[f64]) -> f64,
{
    let best = simplex[0].params.clone();
    for vertex in simplex.iter_mut().skip(1) {
        vertex.params = lerp(&best, &vertex.params, SHRINK);
        vertex.loss = eval(&vertex.params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(x: &[f64]) -> f64 {
        (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2)
    }

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn minimises_quadratic() {
        let min = minimize(quadratic, &[0.0, 0.0], &OptimizerSettings::default());
        assert!(min.converged);
        assert!((min.params[0] - 3.0).abs() < 1e-4);
        assert!((min.params[1] + 1.0).abs() < 1e-4);
        assert!(min.loss < 1e-8);
    }

    #[test]
    fn minimises_rosenbrock() {
        let settings = OptimizerSettings {
            max_iterations: 5000,
            ..OptimizerSettings::default()
        };
        let min = minimize(rosenbrock, &[-1.2, 1.0], &settings);
        assert!((min.params[0] - 1.0).abs() < 1e-3);
        assert!((min.params[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn one_dimensional() {
        let min = minimize(|x| (x[0] - 0.25).powi(2), &[10.0], &OptimizerSettings::default());
        assert!((min.params[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn tiny_budget_is_not_converged_but_keeps_best() {
        let settings = OptimizerSettings {
            max_iterations: 2,
            restarts: 0,
            ..OptimizerSettings::default()
        };
        let start_loss = quadratic(&[0.0, 0.0]);
        let min = minimize(quadratic, &[0.0, 0.0], &settings);
        assert!(!min.converged);
        assert_eq!(min.iterations, 2);
        assert!(min.loss <= start_loss);
    }

    #[test]
    fn non_finite_loss_is_avoided() {
        let loss = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 1.0).powi(2)
            }
        };
        let min = minimize(loss, &[0.5], &OptimizerSettings::default());
        assert!(min.loss.is_finite());
        assert!((min.params[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_start_evaluates_once() {
        let min = minimize(|_| 4.0, &[], &OptimizerSettings::default());
        assert!(min.params.is_empty());
        assert_eq!(min.loss, 4.0);
        assert_eq!(min.iterations, 0);
    }

    #[test]
    fn deterministic() {
        let a = minimize(rosenbrock, &[0.0, 0.0], &OptimizerSettings::default());
        let b = minimize(rosenbrock, &[0.0, 0.0], &OptimizerSettings::default());
        assert_eq!(a, b);
    }

    #[test]
    fn settings_validation() {
        assert!(OptimizerSettings::default().validate().is_ok());
        let bad = OptimizerSettings {
            tolerance: 0.0,
            ..OptimizerSettings::default()
        };
        assert!(bad.validate().is_err());
        let bad = OptimizerSettings {
            max_iterations: 0,
            ..OptimizerSettings::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings: OptimizerSettings = serde_json::from_str(r#"{ "restarts": 3 }"#).unwrap();
        assert_eq!(settings.restarts, 3);
        assert_eq!(settings.max_iterations, 2000);
    }
}
