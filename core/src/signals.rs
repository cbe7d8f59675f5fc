use crate::core::Core;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Installs the ctrl-c handler: the first signal requests a graceful core
/// shutdown, a repeated signal halts the process
pub struct Signals {
    core: Arc<Core>,
    iterations: AtomicU64,
}

impl Signals {
    pub fn new(core: Arc<Core>) -> Signals {
        Signals { core, iterations: AtomicU64::new(0) }
    }

    pub fn init(self: &Arc<Signals>) {
        let signals = self.clone();
        ctrlc::set_handler(move || {
            let v = signals.iterations.fetch_add(1, Ordering::SeqCst);
            if v > 0 {
                println!("^SIGNAL - halting");
                std::process::exit(1);
            }

            println!("^SIGNAL - shutting down core... (CTRL+C again to halt)");
            signals.core.shutdown();
        })
        .expect("the signal handler installs once");
    }
}
