//! Ordered workflow steps with best-effort compensation.
//!
//! # Responsibility
//! - Run `(action, compensation)` pairs strictly in order.
//! - Undo completed steps in reverse when a later step fails.
//!
//! # Invariants
//! - The request context is checked before every action; compensations
//!   always run regardless of cancellation.
//! - A compensation failure is logged and never replaces the triggering
//!   error.
//! - State only moves forward until a failure, then ends at `RolledBack`
//!   (or stays put when nothing needed undoing).

use crate::context::{Interrupted, RequestContext};
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};

/// Progress of a multi-write workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    AccountCreated,
    ProfileCreated,
    Associated,
    Committed,
    RolledBack,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AccountCreated => "account_created",
            Self::ProfileCreated => "profile_created",
            Self::Associated => "associated",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Action<'a, E> = Box<dyn FnOnce() -> Result<(), E> + 'a>;

struct SagaStep<'a, E> {
    reached: WorkflowState,
    action: Action<'a, E>,
    compensation: Option<Action<'a, E>>,
}

/// Failed workflow: final state plus the error that triggered it.
#[derive(Debug)]
pub struct SagaFailure<E> {
    pub state: WorkflowState,
    pub error: E,
}

impl<E> SagaFailure<E> {
    pub fn into_error(self) -> E {
        self.error
    }
}

/// Builder and driver for one compensating workflow.
pub struct Saga<'a, E> {
    workflow: &'static str,
    steps: Vec<SagaStep<'a, E>>,
}

impl<'a, E> Saga<'a, E>
where
    E: Display + From<Interrupted>,
{
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            steps: Vec::new(),
        }
    }

    /// Adds a step with nothing to undo.
    pub fn step(
        mut self,
        reached: WorkflowState,
        action: impl FnOnce() -> Result<(), E> + 'a,
    ) -> Self {
        self.steps.push(SagaStep {
            reached,
            action: Box::new(action),
            compensation: None,
        });
        self
    }

    /// Adds a step whose effect `compensation` undoes if a later step fails.
    pub fn compensated_step(
        mut self,
        reached: WorkflowState,
        action: impl FnOnce() -> Result<(), E> + 'a,
        compensation: impl FnOnce() -> Result<(), E> + 'a,
    ) -> Self {
        self.steps.push(SagaStep {
            reached,
            action: Box::new(action),
            compensation: Some(Box::new(compensation)),
        });
        self
    }

    /// Runs every step; returns `Committed` or the failure.
    pub fn run(self, ctx: &RequestContext) -> Result<WorkflowState, SagaFailure<E>> {
        let Self { workflow, steps } = self;
        let mut state = WorkflowState::Start;
        let mut undo: Vec<(WorkflowState, Action<'a, E>)> = Vec::new();

        for step in steps {
            let outcome = ctx.check().map_err(E::from).and_then(|()| (step.action)());
            if let Err(err) = outcome {
                error!(
                    "event=saga_step module=service workflow={} status=error state={} next={} error={}",
                    workflow, state, step.reached, err
                );
                let state = compensate(workflow, state, undo);
                return Err(SagaFailure { state, error: err });
            }

            debug!(
                "event=saga_step module=service workflow={} status=ok from={} to={}",
                workflow, state, step.reached
            );
            state = step.reached;
            if let Some(compensation) = step.compensation {
                undo.push((step.reached, compensation));
            }
        }

        Ok(WorkflowState::Committed)
    }
}

fn compensate<E: Display>(
    workflow: &'static str,
    state: WorkflowState,
    undo: Vec<(WorkflowState, Action<'_, E>)>,
) -> WorkflowState {
    if undo.is_empty() {
        return state;
    }

    for (undone, compensation) in undo.into_iter().rev() {
        match compensation() {
            Ok(()) => info!(
                "event=saga_compensate module=service workflow={} status=ok undone={}",
                workflow, undone
            ),
            Err(err) => warn!(
                "event=saga_compensate module=service workflow={} status=error undone={} error={}",
                workflow, undone, err
            ),
        }
    }
    WorkflowState::RolledBack
}
