use crate::core::system::{LlgParams, SpinSystem};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// The closed set of step strategies a solver run can be bound to.
///
/// Strategies are tagged variants selected at run start; each implements a
/// single "advance one step" operation over a shared numeric state, so they
/// stay interchangeable without virtual dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Semi-implicit midpoint rotation: the implicit cross-product equation
    /// is solved in closed form, which keeps spin norms near unity even for
    /// large time steps.
    SemiImplicit,
    /// Heun predictor-corrector: an explicit trial step followed by an
    /// averaged slope, with the effective field re-evaluated at the
    /// predicted configuration.
    Heun,
    /// Damped direct minimization along the perpendicular field component.
    Descent,
    /// Velocity-projection quench: accumulated velocity is projected onto
    /// the current force and zeroed whenever it points uphill.
    VelocityProjection,
}

/// One strategy instance with its scratch state, sized for a fixed `nos`.
#[derive(Debug)]
pub struct Optimizer {
    kind: OptimizerKind,
    divergence_threshold: f64,
    field: Vec<Vector3<f64>>,
    predictor_field: Vec<Vector3<f64>>,
    predictor: Vec<Vector3<f64>>,
    velocity: Vec<Vector3<f64>>,
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, nos: usize, divergence_threshold: f64) -> Self {
        Self {
            kind,
            divergence_threshold,
            field: Vec::with_capacity(nos),
            predictor_field: Vec::with_capacity(nos),
            predictor: Vec::with_capacity(nos),
            velocity: vec![Vector3::zeros(); nos],
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    /// Advances the system by one step of LLG dynamics, using its own
    /// Hamiltonian field plus the stochastic thermal field. Every spin is
    /// renormalized before the step returns.
    ///
    /// Returns `false` when any un-normalized update was non-finite or its
    /// norm exceeded the divergence threshold. Renormalization would mask
    /// such a state, so the check happens before it.
    #[must_use]
    pub fn step(&mut self, system: &mut SpinSystem, rng: &mut StdRng) -> bool {
        match self.kind {
            OptimizerKind::Heun => self.step_heun(system, rng),
            _ => {
                self.compute_field(system, rng);
                let llg = system.llg().clone();
                self.advance(system.spins_mut(), &llg)
            }
        }
    }

    /// Advances `spins` by one step against an externally supplied force
    /// field (the projected path force). The force plays the role of the
    /// effective field; no thermal noise is added. Returns `false` on
    /// divergence, as [`Optimizer::step`] does.
    #[must_use]
    pub fn step_with_field(
        &mut self,
        spins: &mut [Vector3<f64>],
        field: &[Vector3<f64>],
        llg: &LlgParams,
    ) -> bool {
        self.field.clear();
        self.field.extend_from_slice(field);
        self.advance(spins, llg)
    }

    fn compute_field(&mut self, system: &SpinSystem, rng: &mut StdRng) {
        system
            .hamiltonian()
            .effective_field_into(system.spins(), &mut self.field);
        let llg = system.llg();
        if llg.temperature > 0.0 {
            let scale = (2.0 * llg.damping * llg.temperature / llg.time_step).sqrt();
            for h in &mut self.field {
                *h += scale * gaussian_vector(rng);
            }
        }
    }

    /// Heun needs the field re-evaluated at the predicted configuration, so
    /// it cannot share the single-field kernel.
    fn step_heun(&mut self, system: &mut SpinSystem, rng: &mut StdRng) -> bool {
        self.compute_field(system, rng);
        let llg = system.llg().clone();
        let dt = llg.time_step;
        let mut healthy = true;

        self.predictor.clear();
        self.predictor.extend(
            system
                .spins()
                .iter()
                .zip(&self.field)
                .map(|(s, h)| normalize(s + dt * s.cross(&omega(s, h, &llg)))),
        );
        system
            .hamiltonian()
            .effective_field_into(&self.predictor, &mut self.predictor_field);

        let spins = system.spins_mut();
        for i in 0..spins.len() {
            let s = spins[i];
            let p = self.predictor[i];
            let slope_now = s.cross(&omega(&s, &self.field[i], &llg));
            let slope_predicted = p.cross(&omega(&p, &self.predictor_field[i], &llg));
            spins[i] = checked_normalize(
                s + 0.5 * dt * (slope_now + slope_predicted),
                self.divergence_threshold,
                &mut healthy,
            );
        }
        healthy
    }

    /// Single-field kernels. `self.field` holds the field per spin.
    fn advance(&mut self, spins: &mut [Vector3<f64>], llg: &LlgParams) -> bool {
        let dt = llg.time_step;
        let threshold = self.divergence_threshold;
        let mut healthy = true;
        match self.kind {
            OptimizerKind::SemiImplicit => {
                for (s, h) in spins.iter_mut().zip(&self.field) {
                    let k = 0.5 * dt * omega(s, h, llg);
                    let b = *s + s.cross(&k);
                    let next = (b + b.cross(&k) + k.dot(&b) * k) / (1.0 + k.norm_squared());
                    *s = checked_normalize(next, threshold, &mut healthy);
                }
            }
            OptimizerKind::Heun => {
                // Field-mode fallback: predictor and corrector share the
                // supplied field.
                for (s, h) in spins.iter_mut().zip(&self.field) {
                    let slope_now = s.cross(&omega(s, h, llg));
                    let p = normalize(*s + dt * slope_now);
                    let slope_predicted = p.cross(&omega(&p, h, llg));
                    *s = checked_normalize(
                        *s + 0.5 * dt * (slope_now + slope_predicted),
                        threshold,
                        &mut healthy,
                    );
                }
            }
            OptimizerKind::Descent => {
                for (s, h) in spins.iter_mut().zip(&self.field) {
                    *s = checked_normalize(*s + dt * perpendicular(h, s), threshold, &mut healthy);
                }
            }
            OptimizerKind::VelocityProjection => {
                self.velocity.resize(spins.len(), Vector3::zeros());
                let mut projection = 0.0;
                let mut force_norm2 = 0.0;
                for ((s, h), v) in spins.iter().zip(&self.field).zip(&mut self.velocity) {
                    let force = perpendicular(h, s);
                    *v += dt * force;
                    projection += v.dot(&force);
                    force_norm2 += force.norm_squared();
                }
                for ((s, h), v) in spins.iter_mut().zip(&self.field).zip(&mut self.velocity) {
                    let force = perpendicular(h, s);
                    // Uphill velocity is quenched; otherwise it is projected
                    // onto the current force direction.
                    *v = if projection <= 0.0 || force_norm2 == 0.0 {
                        Vector3::zeros()
                    } else {
                        force * (projection / force_norm2)
                    };
                    *s = checked_normalize(*s + dt * *v, threshold, &mut healthy);
                }
            }
        }
        healthy
    }
}

/// Angular velocity of the LLG equation: `ds/dt = s x omega`.
#[inline]
fn omega(s: &Vector3<f64>, h: &Vector3<f64>, llg: &LlgParams) -> Vector3<f64> {
    let gamma_prime = llg.gamma / (1.0 + llg.damping * llg.damping);
    -gamma_prime * (h + llg.damping * s.cross(h))
}

/// Component of `h` perpendicular to the unit spin `s`.
#[inline]
fn perpendicular(h: &Vector3<f64>, s: &Vector3<f64>) -> Vector3<f64> {
    h - h.dot(s) * s
}

#[inline]
fn normalize(v: Vector3<f64>) -> Vector3<f64> {
    let n2 = v.norm_squared();
    if n2 == 0.0 {
        return Vector3::z();
    }
    v / n2.sqrt()
}

/// Inspects the un-normalized update, then renormalizes it. A non-finite or
/// over-threshold norm clears `healthy`; normalization would hide both.
#[inline]
fn checked_normalize(v: Vector3<f64>, threshold: f64, healthy: &mut bool) -> Vector3<f64> {
    let n2 = v.norm_squared();
    if !n2.is_finite() || n2 > threshold * threshold {
        *healthy = false;
    }
    normalize(v)
}

#[inline]
fn gaussian_vector(rng: &mut StdRng) -> Vector3<f64> {
    Vector3::new(
        rng.sample(StandardNormal),
        rng.sample(StandardNormal),
        rng.sample(StandardNormal),
    )
}
