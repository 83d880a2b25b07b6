//! Unit of work for proposal execution.
//!
//! Actions run one after another against a staged copy of the state. The
//! copy replaces the live state only once every action succeeded, so a
//! failing action leaves nothing behind.

use agora_types::CallContext;
use tracing::debug;

use crate::action::{Action, DecodedAction, ExternalCall};
use crate::error::GovernanceResult;
use crate::events::Event;
use crate::state::DaoState;

#[derive(Debug)]
pub struct StateTransaction {
    staged: DaoState,
    events: Vec<Event>,
    outbox: Vec<ExternalCall>,
}

impl StateTransaction {
    pub fn begin(state: &DaoState) -> Self {
        Self {
            staged: state.clone(),
            events: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Apply one action. On error the transaction must be dropped.
    pub fn apply(&mut self, ctx: &CallContext, action: &Action) -> GovernanceResult<()> {
        match action.decode()? {
            DecodedAction::System(call) => {
                let events = self.staged.apply_system_call(ctx, call)?;
                self.events.extend(events);
            }
            DecodedAction::External(call) => {
                if let Some(event) = self.staged.pay_from_treasury(ctx, call.target, call.value)? {
                    self.events.push(event);
                }
                debug!(target = ?call.target, value = %call.value, bytes = call.payload.len(), "external call staged");
                self.outbox.push(call);
            }
        }
        Ok(())
    }

    pub fn emit(&mut self, event: impl Into<Event>) {
        self.events.push(event.into());
    }

    pub fn state_mut(&mut self) -> &mut DaoState {
        &mut self.staged
    }

    pub fn outbox(&self) -> &[ExternalCall] {
        &self.outbox
    }

    pub fn into_parts(self) -> (DaoState, Vec<Event>, Vec<ExternalCall>) {
        (self.staged, self.events, self.outbox)
    }
}
