use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Tick period of the simulated progress, in milliseconds.
pub const TICK_MS: u64 = 100;

pub struct Stage {
    pub label: &'static str,
    pub duration_ms: u64,
}

/// Fixed presentation stages. These mirror what the backend is roughly doing
/// but are driven purely by wall-clock time; the simulator is never told
/// whether the real request has finished.
pub const STAGES: [Stage; 4] = [
    Stage {
        label: "Extracting frames",
        duration_ms: 2000,
    },
    Stage {
        label: "Detecting faces",
        duration_ms: 1500,
    },
    Stage {
        label: "AI analysis",
        duration_ms: 3000,
    },
    Stage {
        label: "Generating heatmaps",
        duration_ms: 2000,
    },
];

pub fn total_duration_ms() -> u64 {
    STAGES.iter().map(|stage| stage.duration_ms).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub stage_index: usize,
    pub elapsed_ms: u64,
    pub percent: f64,
}

impl ProgressState {
    /// Pure mapping from elapsed time to display state: the active stage is
    /// the first one whose cumulative boundary has not been passed yet.
    pub fn at(elapsed_ms: u64) -> Self {
        let total = total_duration_ms();
        let percent = ((elapsed_ms as f64 / total as f64) * 100.0).min(100.0);

        let mut stage_index = STAGES.len() - 1;
        let mut cumulative = 0;
        for (index, stage) in STAGES.iter().enumerate() {
            cumulative += stage.duration_ms;
            if elapsed_ms <= cumulative {
                stage_index = index;
                break;
            }
        }

        Self {
            stage_index,
            elapsed_ms,
            percent,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.elapsed_ms >= total_duration_ms()
    }

    pub fn stage_label(&self) -> &'static str {
        STAGES[self.stage_index].label
    }
}

/// Staged-progress ticker. Emits a `ProgressState` every 100 ms until the
/// timeline completes or `cancel` is called; after cancellation no further
/// state is ever emitted.
pub struct ProgressSimulator {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ProgressSimulator {
    pub fn spawn(updates: mpsc::UnboundedSender<ProgressState>) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut elapsed_ms = 0u64;
            let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = interval.tick() => {
                        elapsed_ms += TICK_MS;
                        let state = ProgressState::at(elapsed_ms);
                        if updates.send(state).is_err() {
                            break;
                        }
                        if state.is_terminal() {
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel_tx, handle }
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
    }
}
