//! Stack-based screen flow.
//!
//! The controller owns every registered state and a stack of the ones that
//! are live. Only the top of the stack is active: it alone receives ticks
//! and actions. States never call the controller directly; they ask for a
//! transition through [`SessionContext`] and the controller applies it once
//! the hook that asked has returned, so every transition runs
//! `exit(old)` then `enter(new)` with nothing interleaved.

use bevy::log::{debug, error, info, warn};
use std::collections::HashMap;
use thiserror::Error;

use crate::session::SessionContext;
use crate::shared::FlowAction;

/// Transitions a single hook may trigger in a chain before the controller
/// gives up.
const MAX_CHAINED_TRANSITIONS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("no state named '{0}' is registered")]
    UnknownState(String),
    #[error("a state named '{0}' is already registered")]
    DuplicateState(String),
    #[error("state '{0}' is already on the stack")]
    AlreadyOnStack(String),
    #[error("no active state to pop")]
    EmptyStack,
    #[error("cannot pop the only active state")]
    CannotPopLastState,
    #[error("more than {0} chained transitions in one step")]
    TransitionLoop(usize),
}

/// A transition a state asked for from inside one of its hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Replace the whole stack with the named state.
    Switch(String),
    /// Suspend the active state under the named one.
    Push(String),
    /// Drop the active state and resume the one beneath.
    Pop,
}

pub trait GameFlowState: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// `from` is the state that was active before, if any.
    fn enter(&mut self, ctx: &mut SessionContext, from: Option<&'static str>);

    /// `to` is the state about to become active.
    fn exit(&mut self, ctx: &mut SessionContext, to: &'static str);

    fn tick(&mut self, ctx: &mut SessionContext, delta_secs: f32);

    /// Returns false when the action means nothing to this state.
    fn handle_action(&mut self, _ctx: &mut SessionContext, _action: FlowAction) -> bool {
        false
    }
}

#[derive(Default)]
pub struct GameFlowController {
    states: HashMap<&'static str, Box<dyn GameFlowState>>,
    stack: Vec<&'static str>,
}

impl GameFlowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, state: Box<dyn GameFlowState>) -> Result<(), FlowError> {
        let name = state.name();
        if self.states.contains_key(name) {
            return Err(FlowError::DuplicateState(name.to_string()));
        }
        debug!("[Flow] Registered state {}", name);
        self.states.insert(name, state);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.stack.last().copied()
    }

    /// Live states, bottom first. The last entry is the active one.
    pub fn stack(&self) -> &[&'static str] {
        &self.stack
    }

    pub fn switch_state(&mut self, ctx: &mut SessionContext, name: &str) -> Result<(), FlowError> {
        self.apply(ctx, Transition::Switch(name.to_string()))?;
        self.drain_requests(ctx);
        Ok(())
    }

    pub fn push_state(&mut self, ctx: &mut SessionContext, name: &str) -> Result<(), FlowError> {
        self.apply(ctx, Transition::Push(name.to_string()))?;
        self.drain_requests(ctx);
        Ok(())
    }

    pub fn pop_state(&mut self, ctx: &mut SessionContext) -> Result<(), FlowError> {
        self.apply(ctx, Transition::Pop)?;
        self.drain_requests(ctx);
        Ok(())
    }

    /// Ticks the active state, then applies whatever transition it asked for.
    pub fn tick(&mut self, ctx: &mut SessionContext, delta_secs: f32) {
        let Some(active) = self.active_name() else {
            return;
        };
        if let Some(state) = self.states.get_mut(active) {
            state.tick(ctx, delta_secs);
        }
        self.drain_requests(ctx);
    }

    /// Forwards a user action to the active state. Returns whether it was
    /// handled.
    pub fn dispatch(&mut self, ctx: &mut SessionContext, action: FlowAction) -> bool {
        let Some(active) = self.active_name() else {
            warn!("[Flow] Dropped {:?}: no active state", action);
            return false;
        };
        let label = format!("{action:?}");
        let handled = match self.states.get_mut(active) {
            Some(state) => state.handle_action(ctx, action),
            None => false,
        };
        if !handled {
            debug!("[Flow] {} ignored {}", active, label);
        }
        self.drain_requests(ctx);
        handled
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn resolve(&self, name: &str) -> Result<&'static str, FlowError> {
        self.states
            .get_key_value(name)
            .map(|(key, _)| *key)
            .ok_or_else(|| FlowError::UnknownState(name.to_string()))
    }

    fn call_exit(&mut self, ctx: &mut SessionContext, name: &'static str, to: &'static str) {
        if let Some(state) = self.states.get_mut(name) {
            state.exit(ctx, to);
        }
    }

    fn call_enter(
        &mut self,
        ctx: &mut SessionContext,
        name: &'static str,
        from: Option<&'static str>,
    ) {
        if let Some(state) = self.states.get_mut(name) {
            state.enter(ctx, from);
        }
    }

    fn apply(&mut self, ctx: &mut SessionContext, transition: Transition) -> Result<(), FlowError> {
        match transition {
            Transition::Switch(name) => {
                let target = self.resolve(&name)?;
                let from = self.active_name();
                if let Some(from) = from {
                    self.call_exit(ctx, from, target);
                }
                // Suspended states were exited when they were covered.
                self.stack.clear();
                self.stack.push(target);
                info!("[Flow] {} -> {}", from.unwrap_or("<none>"), target);
                self.call_enter(ctx, target, from);
            }
            Transition::Push(name) => {
                let target = self.resolve(&name)?;
                if self.stack.contains(&target) {
                    return Err(FlowError::AlreadyOnStack(name));
                }
                let from = self.active_name();
                if let Some(from) = from {
                    self.call_exit(ctx, from, target);
                }
                self.stack.push(target);
                info!("[Flow] {} -> {} (pushed)", from.unwrap_or("<none>"), target);
                self.call_enter(ctx, target, from);
            }
            Transition::Pop => {
                let (popped, revealed) = match self.stack.as_slice() {
                    [] => return Err(FlowError::EmptyStack),
                    [_] => return Err(FlowError::CannotPopLastState),
                    [.., below, top] => (*top, *below),
                };
                self.call_exit(ctx, popped, revealed);
                self.stack.pop();
                info!("[Flow] {} -> {} (popped)", popped, revealed);
                self.call_enter(ctx, revealed, Some(popped));
            }
        }
        Ok(())
    }

    fn drain_requests(&mut self, ctx: &mut SessionContext) {
        for _ in 0..MAX_CHAINED_TRANSITIONS {
            let Some(request) = ctx.take_transition() else {
                return;
            };
            if let Err(err) = self.apply(ctx, request) {
                Self::fail(ctx, err);
            }
        }
        if ctx.take_transition().is_some() {
            Self::fail(ctx, FlowError::TransitionLoop(MAX_CHAINED_TRANSITIONS));
        }
    }

    /// Structural errors are bugs: loud in strict builds, logged otherwise.
    fn fail(ctx: &SessionContext, err: FlowError) {
        error!("[Flow] Invalid transition: {}", err);
        if ctx.config.strict_transitions {
            panic!("invalid state transition: {err}");
        }
    }
}
