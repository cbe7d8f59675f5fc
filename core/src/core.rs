use crate::service::Service;
use log::{info, trace};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// The service container driving node lifetime: services are started in
/// registration order and stopped in reverse order on shutdown. The shutdown
/// pair is the only process-wide mutable state of the node.
pub struct Core {
    services: Mutex<Vec<Arc<dyn Service>>>,
    handles: Mutex<Vec<(&'static str, Vec<JoinHandle<()>>)>>,
    shutdown_trigger: triggered::Trigger,
    shutdown_listener: triggered::Listener,
}

impl Core {
    pub fn new() -> Arc<Core> {
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        Arc::new(Core { services: Mutex::new(Vec::new()), handles: Mutex::new(Vec::new()), shutdown_trigger, shutdown_listener })
    }

    pub fn bind<T: Service + 'static>(&self, service: Arc<T>) {
        self.services.lock().unwrap().push(service);
    }

    /// Returns a listener resolving once shutdown was requested
    pub fn shutdown_listener(&self) -> triggered::Listener {
        self.shutdown_listener.clone()
    }

    /// Starts all bound services and blocks until they terminate
    pub fn run(self: &Arc<Core>) {
        let services = self.services.lock().unwrap().clone();
        for service in services.iter() {
            let ident = service.clone().ident();
            trace!("Starting service {ident}");
            let handles = service.clone().start(self.clone());
            self.handles.lock().unwrap().push((ident, handles));
        }

        // Block the main thread until a shutdown request arrives, then unwind
        self.shutdown_listener.clone().wait();
        self.join();
    }

    /// Requests a graceful shutdown of all services
    pub fn shutdown(&self) {
        if self.shutdown_listener.is_triggered() {
            return;
        }
        info!("Core shutdown was requested");
        self.shutdown_trigger.trigger();
        let services = self.services.lock().unwrap().clone();
        for service in services.into_iter().rev() {
            service.stop();
        }
    }

    fn join(&self) {
        for (ident, handles) in self.handles.lock().unwrap().drain(..) {
            for handle in handles {
                if handle.join().is_err() {
                    log::error!("Service {ident} exited with a panic");
                }
            }
            info!("Service {ident} has stopped");
        }
    }
}
