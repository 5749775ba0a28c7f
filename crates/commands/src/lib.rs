//! Text-command dispatch core.
//!
//! An inbound message flows through the [`ArgumentExtractor`], is resolved
//! against the [`CommandRegistry`], gated by the permission evaluator and
//! finally executed by the [`Dispatcher`], which owns the outbound message
//! lifecycle (send, post-hook, trigger deletion) and isolates failures so one
//! broken command never takes the loop down.

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod insult;
pub mod permission;
pub mod registry;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use {
    command::{CommandDef, ContextRestriction, Generate, Generator, PostHook},
    context::CommandContext,
    dispatcher::{Dispatcher, Outcome},
    error::{Error, Result},
    extract::{ArgumentExtractor, Invocation},
    permission::{Check, Requirement, Verdict, evaluate},
    registry::CommandRegistry,
    state::{BeginOutcome, ConfirmationKey, EphemeralState, PendingConfirmations},
};
