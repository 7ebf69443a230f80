use super::SolverParams;
use super::optimizer::{Optimizer, OptimizerKind};
use crate::core::system::{LlgParams, SharedSystem, distance_geodesic};
use crate::engine::chain::{GnebParams, read_system, write_system};
use crate::engine::controller::SolverReport;
use crate::engine::error::CoreError;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Body of a GNEB background task: relaxes every interior image of the chain
/// toward the minimum-energy path between the fixed endpoints.
///
/// Each iteration projects the per-image effective field against the path
/// tangent, adds the spring coupling, optionally promotes the highest-energy
/// interior image to a climbing-image step, and advances every interior image
/// with the chosen step strategy. Endpoints are never displaced.
pub(crate) fn run(
    images: Vec<SharedSystem>,
    iteration_allowed: Arc<AtomicBool>,
    kind: OptimizerKind,
    params: SolverParams,
    gneb: GnebParams,
    reporter: ProgressReporter,
) -> Result<SolverReport, CoreError> {
    let noi = images.len();
    if noi < 3 {
        // Both images of a two-image chain are endpoints; there is nothing
        // to relax.
        iteration_allowed.store(false, Ordering::Release);
        reporter.report(Progress::Finished {
            iterations: 0,
            energy: 0.0,
        });
        return Ok(SolverReport {
            iterations: 0,
            energy: 0.0,
        });
    }
    let nos = read_system(&images[0])?.nos();
    info!(noi, nos, ?kind, max_iterations = params.max_iterations, "GNEB run starting");
    reporter.report(Progress::Started {
        max_iterations: params.max_iterations,
    });

    let mut optimizers: Vec<Optimizer> = (0..noi - 2)
        .map(|_| Optimizer::new(kind, nos, params.divergence_threshold))
        .collect();
    let mut spins: Vec<Vec<Vector3<f64>>> = vec![Vec::new(); noi];
    let mut energies = vec![0.0; noi];
    let mut field = Vec::new();
    let mut force = vec![Vector3::zeros(); nos];

    let mut iterations = 0;
    for it in 0..params.max_iterations {
        if !iteration_allowed.load(Ordering::Acquire) {
            debug!(iteration = it, "GNEB run stopped cooperatively");
            break;
        }

        // Consistent snapshot of the whole path for tangent construction.
        for (image, (buffer, energy)) in images.iter().zip(spins.iter_mut().zip(&mut energies)) {
            let guard = read_system(image)?;
            buffer.clear();
            buffer.extend_from_slice(guard.spins());
            *energy = guard.hamiltonian().energy(guard.spins());
        }
        let tangents = compute_tangents(&spins, &energies);

        let climbing = if gneb.climbing_image {
            highest_interior_image(&energies)
        } else {
            None
        };

        for i in 1..noi - 1 {
            {
                let guard = read_system(&images[i])?;
                guard.hamiltonian().effective_field_into(&spins[i], &mut field);
            }
            let tangent = &tangents[i];
            let mut projection = 0.0;
            for j in 0..nos {
                force[j] = field[j] - field[j].dot(&spins[i][j]) * spins[i][j];
                projection += force[j].dot(&tangent[j]);
            }
            if climbing == Some(i) {
                // The climbing image moves uphill along the path instead of
                // being pulled onto it.
                for j in 0..nos {
                    force[j] -= 2.0 * projection * tangent[j];
                }
            } else {
                let spring = gneb.spring_constant
                    * (distance_geodesic(&spins[i + 1], &spins[i])
                        - distance_geodesic(&spins[i], &spins[i - 1]));
                for j in 0..nos {
                    force[j] += (spring - projection) * tangent[j];
                }
            }

            let mut guard = write_system(&images[i])?;
            let llg = LlgParams {
                time_step: gneb.time_step,
                ..guard.llg().clone()
            };
            if !optimizers[i - 1].step_with_field(guard.spins_mut(), &force, &llg) {
                iteration_allowed.store(false, Ordering::Release);
                return Err(CoreError::DivergedSimulation { iteration: it });
            }
        }

        iterations = it + 1;
        if params.checkpoint_interval > 0 && iterations % params.checkpoint_interval == 0 {
            let energy = update_energies(&images)?;
            reporter.report(Progress::IterationCheckpoint {
                iteration: iterations,
                max_iterations: params.max_iterations,
                energy,
            });
        }
    }

    iteration_allowed.store(false, Ordering::Release);
    let energy = update_energies(&images)?;
    info!(iterations, saddle_estimate = energy, "GNEB run finished");
    reporter.report(Progress::Finished { iterations, energy });
    Ok(SolverReport { iterations, energy })
}

/// Refreshes every image's cached energy; returns the highest one (the
/// current saddle estimate).
fn update_energies(images: &[SharedSystem]) -> Result<f64, CoreError> {
    let mut highest = f64::NEG_INFINITY;
    for image in images {
        let energy = write_system(image)?.update_energy();
        highest = highest.max(energy);
    }
    Ok(highest)
}

/// Index of the highest-energy interior image, if any.
fn highest_interior_image(energies: &[f64]) -> Option<usize> {
    (1..energies.len() - 1).max_by(|&a, &b| {
        energies[a]
            .partial_cmp(&energies[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Path tangent at every image, using the energy-weighted upwind scheme:
/// strictly uphill or downhill images take the one-sided difference toward
/// the higher neighbor, extrema blend both sides by the energy differences.
/// Tangents are projected into each spin's tangent plane and normalized over
/// the whole configuration.
pub(crate) fn compute_tangents(
    spins: &[Vec<Vector3<f64>>],
    energies: &[f64],
) -> Vec<Vec<Vector3<f64>>> {
    let noi = spins.len();
    let mut tangents = Vec::with_capacity(noi);
    for i in 0..noi {
        let tangent: Vec<Vector3<f64>> = if i == 0 {
            difference(&spins[1], &spins[0])
        } else if i == noi - 1 {
            difference(&spins[noi - 1], &spins[noi - 2])
        } else {
            let (e_prev, e, e_next) = (energies[i - 1], energies[i], energies[i + 1]);
            let plus = difference(&spins[i + 1], &spins[i]);
            let minus = difference(&spins[i], &spins[i - 1]);
            if e_next > e && e > e_prev {
                plus
            } else if e_next < e && e < e_prev {
                minus
            } else {
                let d_next = (e_next - e).abs();
                let d_prev = (e_prev - e).abs();
                let (d_max, d_min) = (d_next.max(d_prev), d_next.min(d_prev));
                let (w_plus, w_minus) = if e_next > e_prev {
                    (d_max, d_min)
                } else {
                    (d_min, d_max)
                };
                plus.iter()
                    .zip(&minus)
                    .map(|(p, m)| w_plus * p + w_minus * m)
                    .collect()
            }
        };

        let mut tangent: Vec<Vector3<f64>> = tangent
            .iter()
            .zip(&spins[i])
            .map(|(t, s)| t - t.dot(s) * s)
            .collect();
        let norm: f64 = tangent.iter().map(|t| t.norm_squared()).sum::<f64>().sqrt();
        if norm > 0.0 {
            for t in &mut tangent {
                *t /= norm;
            }
        }
        tangents.push(tangent);
    }
    tangents
}

fn difference(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}
