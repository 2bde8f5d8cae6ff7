use crate::error::BackendError;
use crate::oracle::{CallUsage, ChatBackend, Completion};
use std::cell::Cell;
use std::rc::Rc;

type Respond = dyn Fn(&str) -> Result<String, BackendError>;

///
/// A chat backend that answers from a closure, to test nodes and retries without HTTP.
///
pub struct ScriptedBackend {
    respond: Box<Respond>,
    failures_left: Cell<u32>,
    usage: Option<CallUsage>,
    calls: Rc<Cell<u32>>,
}

impl ScriptedBackend {
    pub fn new(respond: impl Fn(&str) -> Result<String, BackendError> + 'static) -> Self {
        ScriptedBackend {
            respond: Box::new(respond),
            failures_left: Cell::new(0),
            usage: None,
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// The first `count` requests fail before `respond` is consulted.
    pub fn failing_first(self, count: u32) -> Self {
        self.failures_left.set(count);
        self
    }

    pub fn with_usage(self, usage: CallUsage) -> Self {
        ScriptedBackend {
            usage: Some(usage),
            ..self
        }
    }

    /// Shared counter of requests made, still readable after the backend is moved.
    pub fn calls(&self) -> Rc<Cell<u32>> {
        self.calls.clone()
    }
}

impl ChatBackend for ScriptedBackend {
    fn chat(&self, _system_prompt: &str, prompt: &str) -> Result<Completion, BackendError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(BackendError::Other("scripted outage".to_string()));
        }
        let text = (self.respond)(prompt)?;
        Ok(Completion {
            text,
            usage: self.usage,
        })
    }
}
