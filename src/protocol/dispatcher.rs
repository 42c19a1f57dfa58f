use crate::error::{constants, Result, VoicenetError};
use crate::protocol::message::ControlMessage;
use crate::protocol::SessionId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type HandlerFn =
    dyn Fn(SessionId, &ControlMessage) -> Result<Option<ControlMessage>> + Send + Sync + 'static;

/// Message dispatcher with zero-copy opcode routing.
///
/// This is the seam between the control-plane core and the gateway
/// collaborator: the gateway registers one handler per message opcode, and
/// established connections route decoded messages through here. A handler's
/// `Ok(Some(reply))` is written back to the client; `Ok(None)` sends nothing.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handler for one message opcode, replacing any existing one.
    pub fn register<F>(&self, opcode: &str, handler: F) -> Result<()>
    where
        F: Fn(SessionId, &ControlMessage) -> Result<Option<ControlMessage>> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            VoicenetError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(Cow::Owned(opcode.to_string()), Box::new(handler));
        Ok(())
    }

    /// Route a message from an established session to its handler.
    ///
    /// # Errors
    /// Returns [`VoicenetError::UnexpectedMessage`] when no handler is
    /// registered for the message's opcode.
    pub fn dispatch(
        &self,
        session_id: SessionId,
        message: &ControlMessage,
    ) -> Result<Option<ControlMessage>> {
        let opcode = message.opcode();

        let handlers = self.handlers.read().map_err(|_| {
            VoicenetError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
        })?;

        handlers
            .get(opcode.as_ref())
            .ok_or(VoicenetError::UnexpectedMessage)
            .and_then(|handler| handler(session_id, message))
    }

    /// Whether a handler is registered for this opcode.
    pub fn has_handler(&self, opcode: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(opcode))
            .unwrap_or(false)
    }
}
