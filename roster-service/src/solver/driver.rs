//! Model assembly and the solve loop.
//!
//! One generation runs pre-flight analysis, builds the boolean model, sums
//! the objective terms, and drives the solver while streaming incumbents to
//! the progress channel. Turbo mode blocks the calling thread; balanced mode
//! isolates the same pipeline on the blocking pool and polls the progress
//! channel so the caller's event loop stays responsive.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use selen::prelude::*;
use shared::types::{Notification, ProgressEvent, SolveMode};
use shared::vocabulary::{ShiftCode, SolveStatus};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapter::input::ParsedRequest;
use crate::analysis::{AnalysisInput, preflight};
use crate::config::RosterConfig;
use crate::domain::encode::{EncoderContext, default_encoders};
use crate::domain::grid::ShiftGrid;
use crate::domain::sink::{NotificationSink, ProgressSink};
use crate::error::GenerationError;

/// One solved cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub staff_name: String,
    /// 1-based day of month.
    pub day: u32,
    pub shift_code: ShiftCode,
}

/// Terminal result of one generation.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved {
        status: SolveStatus,
        objective: i64,
        assignments: Vec<Assignment>,
    },
    NoSolution {
        status: SolveStatus,
    },
}

pub struct RosterGenerator {
    config: RosterConfig,
}

impl RosterGenerator {
    pub fn new(config: RosterConfig) -> Self {
        Self { config }
    }

    /// Run one generation according to the request's mode.
    ///
    /// Turbo executes the whole pipeline inline and blocks the caller until
    /// the solver finishes. Balanced runs it on the blocking pool and polls
    /// the progress channel on a fixed cadence, forwarding events in order;
    /// a cancel abandons the wait (the solver still stops at its own wall
    /// clock).
    pub async fn generate(
        &self,
        parsed: ParsedRequest,
        notifier: Arc<dyn NotificationSink>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<SolveOutcome, GenerationError> {
        match parsed.mode {
            SolveMode::Turbo => {
                self.generate_blocking(&parsed, notifier.as_ref(), progress.as_ref())
            }
            SolveMode::Balanced => {
                self.generate_balanced(parsed, notifier, progress, cancel).await
            }
        }
    }

    /// The full pipeline on the current thread: pre-flight, assembly, solve.
    #[tracing::instrument(skip_all, fields(generation_id = %Uuid::new_v4(), mode = ?parsed.mode))]
    pub fn generate_blocking(
        &self,
        parsed: &ParsedRequest,
        notifier: &dyn NotificationSink,
        progress: &dyn ProgressSink,
    ) -> Result<SolveOutcome, GenerationError> {
        progress.publish(ProgressEvent::Reset);

        let input = AnalysisInput::new(
            &parsed.month,
            &parsed.rule,
            &parsed.staff,
            &parsed.staff_constraints,
            &parsed.rule_constraints,
            &parsed.hopes,
        );
        preflight(&input, notifier)?;

        let budget = self.search_budget(parsed);
        let (model, grid, objective) = self.assemble(parsed, budget, notifier);

        tracing::info!(
            staff = grid.staff_count(),
            days = grid.days(),
            codes = grid.codes().len(),
            budget_seconds = budget.as_secs(),
            "model assembled, solving"
        );

        let started = Instant::now();
        let mut best: Option<(i64, Vec<Assignment>)> = None;
        let mut index = 0u32;
        for solution in model.maximize_and_iterate(objective) {
            index += 1;
            let objective_value = i64::from(solution.get_int(objective));
            progress.publish(ProgressEvent::Incumbent {
                solution_index: index,
                elapsed_seconds: started.elapsed().as_secs_f64(),
                objective_value,
            });
            best = Some((objective_value, extract_assignments(&grid, &solution)));
        }

        let timed_out = started.elapsed() >= budget;
        match best {
            Some((objective, assignments)) => {
                // An exhausted iterator inside the budget proved optimality;
                // hitting the wall clock keeps the best incumbent.
                let status = if timed_out {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                };
                notifier.notify(Notification::info(format!(
                    "Solver finished with {} (objective {objective}, {index} incumbent(s)).",
                    status.label()
                )));
                Ok(SolveOutcome::Solved {
                    status,
                    objective,
                    assignments,
                })
            }
            None => {
                let status = if timed_out {
                    SolveStatus::Timeout
                } else {
                    SolveStatus::Infeasible
                };
                notifier.notify(Notification::error(format!(
                    "Solver produced no roster: {}.",
                    status.label()
                )));
                Ok(SolveOutcome::NoSolution { status })
            }
        }
    }

    async fn generate_balanced(
        &self,
        parsed: ParsedRequest,
        notifier: Arc<dyn NotificationSink>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<SolveOutcome, GenerationError> {
        let (tx, rx) = mpsc::channel::<ProgressEvent>();
        let relay = ChannelProgressSink::new(tx);

        let generator = Self {
            config: self.config.clone(),
        };
        let task_notifier = Arc::clone(&notifier);
        let handle = tokio::task::spawn_blocking(move || {
            generator.generate_blocking(&parsed, task_notifier.as_ref(), &relay)
        });

        let mut ticker = tokio::time::interval(Duration::from_millis(
            self.config.balanced_poll_interval_ms.max(1),
        ));
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::warn!("generation cancelled while polling");
                    // The blocking task keeps running until the solver's own
                    // wall clock expires; its channel ends up with no reader.
                    return Err(GenerationError::Internal(
                        "generation cancelled by caller".to_string(),
                    ));
                }
                _ = ticker.tick() => {
                    for event in rx.try_iter() {
                        progress.publish(event);
                    }
                    if handle.is_finished() {
                        break;
                    }
                }
            }
        }
        // Drain whatever arrived between the last poll and task exit.
        for event in rx.try_iter() {
            progress.publish(event);
        }

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("solver task failed: {e}");
                notifier.notify(Notification::error(message.clone()));
                Err(GenerationError::Internal(message))
            }
        }
    }

    fn search_budget(&self, parsed: &ParsedRequest) -> Duration {
        if parsed.search_time.is_zero() {
            Duration::from_secs(self.config.default_search_time_seconds)
        } else {
            parsed.search_time
        }
    }

    /// Build the variable universe, run every encoder, and close over the
    /// objective: one integer equal to the weighted term sum.
    fn assemble(
        &self,
        parsed: &ParsedRequest,
        budget: Duration,
        notifier: &dyn NotificationSink,
    ) -> (Model, ShiftGrid, VarId) {
        if let Some(workers) = self.config.worker_count {
            tracing::debug!(workers, "worker count requested; search runs single-threaded");
        }
        if let Some(seed) = self.config.random_seed {
            tracing::debug!(seed, "random seed requested; search is deterministic");
        }

        let solver_config = SolverConfig::default()
            .with_timeout_ms(budget.as_millis() as u64)
            .with_max_memory_mb(self.config.solver_memory_mb);
        let mut model = Model::with_config(solver_config);

        let grid = ShiftGrid::new(
            &mut model,
            parsed.month.clone(),
            &parsed.staff,
            &parsed.hopes,
            &parsed.preference_entries,
        );

        let mut cx = EncoderContext {
            model: &mut model,
            grid: &grid,
            staff: &parsed.staff,
            staff_constraints: &parsed.staff_constraints,
            rule: &parsed.rule,
            rule_constraints: &parsed.rule_constraints,
            hopes: &parsed.hopes,
            preference_entries: &parsed.preference_entries,
            weights: &parsed.weights,
            notifier,
            objective: Vec::new(),
        };
        for encoder in default_encoders() {
            tracing::debug!(encoder = encoder.name(), "attaching clauses");
            encoder.encode(&mut cx);
        }
        let terms = cx.objective;

        let bound: i64 = terms
            .iter()
            .map(|&(_, w)| i64::from(w.unsigned_abs()) * grid.days() as i64)
            .sum();
        let bound = bound.clamp(1, 100_000_000) as i32;
        let objective = model.int(-bound, bound);

        let mut coeffs: Vec<i32> = terms.iter().map(|&(_, w)| w).collect();
        coeffs.push(-1);
        let mut vars: Vec<VarId> = terms.iter().map(|&(v, _)| v).collect();
        vars.push(objective);
        model.int_lin_eq(&coeffs, &vars, 0);

        (model, grid, objective)
    }
}

fn extract_assignments(grid: &ShiftGrid, solution: &Solution) -> Vec<Assignment> {
    let mut assignments = Vec::with_capacity(grid.staff_count() * grid.days());
    for s in 0..grid.staff_count() {
        for d in 0..grid.days() {
            for &code in grid.codes() {
                if solution.get_int(grid.var(s, d, code)) == 1 {
                    assignments.push(Assignment {
                        staff_name: grid.staff_name(s).to_string(),
                        day: d as u32 + 1,
                        shift_code: code,
                    });
                    break;
                }
            }
        }
    }
    assignments
}

/// Progress relay for balanced mode: the blocking side sends, the async side
/// drains in order.
struct ChannelProgressSink {
    tx: std::sync::Mutex<mpsc::Sender<ProgressEvent>>,
}

impl ChannelProgressSink {
    fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            tx: std::sync::Mutex::new(tx),
        }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn publish(&self, event: ProgressEvent) {
        if let Ok(tx) = self.tx.lock() {
            // A dropped receiver just means nobody is watching anymore.
            let _ = tx.send(event);
        }
    }
}
