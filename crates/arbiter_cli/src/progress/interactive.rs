use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use arbiter::entity::job_type::JobType;
use arbiter::entity::source::Source;
use arbiter::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Counters shown on a source's spinner.
struct PassState {
    bar: ProgressBar,
    pages: u32,
    fetched: usize,
    saved: usize,
    failed: usize,
    done: bool,
}

#[derive(Default)]
struct ProgressState {
    passes: HashMap<(Source, JobType), PassState>,
    /// Job type of each source's latest pass, for events that carry none.
    current: HashMap<Source, JobType>,
}

impl ProgressState {
    fn active(&mut self, source: Source) -> Option<&mut PassState> {
        let job_type = *self.current.get(&source)?;
        self.passes
            .get_mut(&(source, job_type))
            .filter(|pass| !pass.done)
    }
}

/// Interactive progress reporter using indicatif.
///
/// One spinner per (source, job) pass. Page, persist and throttle events
/// update the spinner of the source's current pass.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::PassStarted {
                source,
                job_type,
                mode,
            } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{:10}", source.as_str()));
                bar.set_message(format!("{} ({})...", job_type, mode));

                state.current.insert(source, job_type);
                state.passes.insert(
                    (source, job_type),
                    PassState {
                        bar,
                        pages: 0,
                        fetched: 0,
                        saved: 0,
                        failed: 0,
                        done: false,
                    },
                );
            }

            SyncProgress::FetchedPage { source, page, count } => {
                if let Some(pass) = state.active(source) {
                    pass.pages = page;
                    pass.fetched += count;
                    pass.bar.set_message(Self::counters(pass));
                }
            }

            SyncProgress::RecordFailed { source, .. } => {
                if let Some(pass) = state.active(source) {
                    pass.failed += 1;
                    pass.bar.set_message(Self::counters(pass));
                }
            }

            SyncProgress::PersistedBatch {
                source,
                created,
                updated,
                ..
            } => {
                if let Some(pass) = state.active(source) {
                    pass.saved += created + updated;
                    pass.bar.set_message(Self::counters(pass));
                }
            }

            SyncProgress::Throttled {
                source,
                attempt,
                retry_after_ms,
            } => {
                if let Some(pass) = state.active(source) {
                    pass.bar.set_message(format!(
                        "Throttled, retry {} in {:.1}s",
                        attempt,
                        retry_after_ms as f64 / 1000.0
                    ));
                }
            }

            SyncProgress::ReconciliationMatch {
                sale_source,
                item_key,
                targets,
                ..
            } => {
                let targets: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
                self.multi
                    .println(format!(
                        "  {} sold on {}, remove from: {}",
                        item_key,
                        sale_source,
                        if targets.is_empty() {
                            "-".to_string()
                        } else {
                            targets.join(", ")
                        }
                    ))
                    .ok();
            }

            SyncProgress::PassComplete {
                source,
                job_type,
                success,
                processed,
                created,
                updated,
                failed,
            } => {
                if let Some(pass) = state.passes.get_mut(&(source, job_type)) {
                    pass.done = true;
                    let mark = if success { "✓" } else { "✗" };
                    pass.bar.finish_with_message(format!(
                        "{} {}: {} processed, {} new, {} updated, {} failed",
                        mark, job_type, processed, created, updated, failed
                    ));
                }
            }

            SyncProgress::Warning { message } => {
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pass in state.passes.values() {
            if !pass.bar.is_finished() {
                pass.bar.finish();
            }
        }
    }

    fn counters(pass: &PassState) -> String {
        format!(
            "page {} · {} fetched · {} saved · {} failed",
            pass.pages, pass.fetched, pass.saved, pass.failed
        )
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
