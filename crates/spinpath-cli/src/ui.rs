use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use spinpath::engine::progress::{Progress, ProgressReporter};
use std::sync::Arc;

/// Builds a progress reporter that drives an indicatif bar from solver
/// checkpoint events. The bar handle is internally shared, so the returned
/// reporter can be moved onto the solver thread.
pub fn bar_reporter(bar: ProgressBar) -> ProgressReporter {
    bar.set_style(bar_style());
    ProgressReporter::with_callback(Arc::new(move |progress| match progress {
        Progress::Started { max_iterations } => {
            bar.set_length(max_iterations as u64);
            bar.set_position(0);
        }
        Progress::IterationCheckpoint {
            iteration, energy, ..
        } => {
            bar.set_position(iteration as u64);
            bar.set_message(format!("E = {energy:.6}"));
        }
        Progress::Finished { iterations, energy } => {
            bar.set_position(iterations as u64);
            bar.finish_with_message(format!("E = {energy:.6}"));
        }
    }))
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .expect("invalid template")
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("━╸ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn checkpoint_events_advance_the_bar() {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::hidden());
        let reporter = bar_reporter(bar.clone());

        reporter.report(Progress::Started {
            max_iterations: 100,
        });
        assert_eq!(bar.length(), Some(100));

        reporter.report(Progress::IterationCheckpoint {
            iteration: 40,
            max_iterations: 100,
            energy: -1.5,
        });
        assert_eq!(bar.position(), 40);

        reporter.report(Progress::Finished {
            iterations: 100,
            energy: -2.0,
        });
        assert!(bar.is_finished());
    }
}
