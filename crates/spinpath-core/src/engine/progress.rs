use std::sync::Arc;

/// Events published by a running solver task at iteration boundaries.
#[derive(Debug, Clone)]
pub enum Progress {
    Started { max_iterations: usize },
    /// Intermediate state published every checkpoint interval. The run keeps
    /// going after a checkpoint; it only marks that fresh energies and spin
    /// snapshots are available to readers.
    IterationCheckpoint {
        iteration: usize,
        max_iterations: usize,
        energy: f64,
    },
    Finished { iterations: usize, energy: f64 },
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Forwards solver progress events to an optional callback.
///
/// The reporter is cloned into the background task, so the callback must be
/// `Send + Sync` and own whatever it touches.
#[derive(Default, Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::Started { max_iterations: 1 });
    }

    #[test]
    fn reporter_forwards_events_to_the_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::with_callback(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.report(Progress::Started { max_iterations: 10 });
        reporter.report(Progress::Finished {
            iterations: 10,
            energy: -1.0,
        });

        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
