//! Arbiter evaluation pipeline.
//!
//! An [`Orchestrator`] runs a contract record through an ordered list of
//! [`Step`]s (intake validation, performance scoring, risk classification,
//! reasoning synthesis). Each step is executed by the [`StepRunner`], which
//! times it, writes its audit entry and files any escalation it asks for.
//! Provider text from synthesis is turned into a [`Decision`] by
//! [`recover`], which never fails.
//!
//! HTTP-backed providers live behind the default `http` feature.
//!
//! [`Decision`]: arbiter_core::Decision

pub mod escalation;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod recovery;
pub mod runner;
pub mod steps;
pub mod validation;

#[cfg(test)]
mod testutil;

pub use escalation::{EscalationQueue, ESCALATE_ACTION};
pub use orchestrator::{
    Orchestrator, OrchestratorError, PipelineSettings, EVALUATE_ACTION, EVALUATE_ERROR_ACTION,
    ORCHESTRATOR_ACTOR,
};
pub use provider::{
    GenerationLimits, GenerationProvider, OfflineProvider, ProviderError, ProviderInfo,
    RawResponse, RetryPolicy, RetryingProvider,
};
pub use recovery::recover;
pub use runner::{StepRun, StepRunner, RUN_STEP_ACTION, STEP_ERROR_ACTION};
pub use steps::{Step, StepContext, StepEffect, StepError, StepReport};
pub use validation::{completeness, ContractValidator, ValidationReport};
