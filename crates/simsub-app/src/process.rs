//! Message processing through the TEA update loop

use crate::actions::{handle_action, ActionContext};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message and every follow-up message it produces.
///
/// Actions run in the order the handler returned them; modem commands are
/// spawned and report back through `ctx.msg_tx`.
pub fn process_message(state: &mut AppState, message: Message, ctx: &ActionContext) {
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        for action in result.actions {
            handle_action(action, ctx);
        }

        msg = result.message;
    }
}
