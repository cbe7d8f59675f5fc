#[derive(Debug, Clone)]
pub struct SingleTrigger {
    pub trigger: triggered::Trigger,
    pub listener: triggered::Listener,
}

impl SingleTrigger {
    pub fn new() -> Self {
        let (trigger, listener) = triggered::trigger();
        Self { trigger, listener }
    }
}

impl Default for SingleTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// A request/response trigger pair used for shutdown handshakes: the
/// initiator fires `request` and awaits `response` from the terminating task.
#[derive(Debug, Clone)]
pub struct DuplexTrigger {
    pub request: SingleTrigger,
    pub response: SingleTrigger,
}

impl DuplexTrigger {
    pub fn new() -> Self {
        Self { request: SingleTrigger::new(), response: SingleTrigger::new() }
    }
}

impl Default for DuplexTrigger {
    fn default() -> Self {
        Self::new()
    }
}
