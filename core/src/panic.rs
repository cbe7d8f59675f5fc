use std::panic;
use std::process;

/// Configures the panic hook to exit the process after logging. An unexpected
/// panic in any task is an invariant violation, so we flush the best-effort
/// diagnostic and terminate rather than continue with possibly corrupt state.
pub fn configure_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        log::error!("panic at {location}: {message}");
        // Fall back to the default hook for the backtrace print
        default_hook(panic_info);
        log::logger().flush();
        println!("Exiting...");
        process::exit(2);
    }));
}
