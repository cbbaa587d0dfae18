//! Handler registry and the per-call handler chain.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use crate::call::CallContext;
use crate::error::{StationError, Result};

/// Hooks run around one call.
///
/// A fresh instance is created per call, so implementations may keep
/// per-call state between `before_call` and `after_call`.
pub trait CallHandler: Send {
    /// Runs before any I/O. May adjust the outgoing context.
    fn before_call(&mut self, ctx: &mut CallContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Runs once the outcome is final, whatever it is.
    fn after_call(&mut self, ctx: &CallContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Creates one handler per call.
pub trait HandlerFactory: Send + Sync + 'static {
    fn create(&self) -> Box<dyn CallHandler>;
}

impl<F> HandlerFactory for F
where
    F: Fn() -> Box<dyn CallHandler> + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn CallHandler> {
        self()
    }
}

struct FactoryEntry {
    name: String,
    factory: Box<dyn HandlerFactory>,
}

/// Ordered list of handler factories.
pub struct HandlerRegistry {
    factories: Vec<FactoryEntry>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Append a factory. Hooks run in registration order.
    pub fn register<F: HandlerFactory>(&mut self, name: &str, factory: F) {
        self.factories.push(FactoryEntry {
            name: name.to_string(),
            factory: Box::new(factory),
        });
    }

    /// Registered names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create one handler per factory for a single call.
    ///
    /// A factory that panics is logged and left out of the chain.
    pub fn instantiate(&self) -> HandlerChain {
        let mut handlers = Vec::with_capacity(self.factories.len());
        for entry in &self.factories {
            match panic::catch_unwind(AssertUnwindSafe(|| entry.factory.create())) {
                Ok(handler) => handlers.push((entry.name.clone(), handler)),
                Err(payload) => {
                    tracing::error!(
                        handler = %entry.name,
                        "handler factory panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        HandlerChain { handlers }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The handlers instantiated for one call.
pub struct HandlerChain {
    handlers: Vec<(String, Box<dyn CallHandler>)>,
}

impl HandlerChain {
    /// Run every `before_call` in order. Failures are logged and suppressed.
    pub fn run_before(&mut self, ctx: &mut CallContext) {
        for (name, handler) in &mut self.handlers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler.before_call(ctx)));
            report(name, "before_call", ctx, result);
        }
    }

    /// Run every `after_call` in order. Failures are logged and suppressed.
    pub fn run_after(&mut self, ctx: &CallContext) {
        for (name, handler) in &mut self.handlers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler.after_call(ctx)));
            report(name, "after_call", ctx, result);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn report(
    name: &str,
    hook: &str,
    ctx: &CallContext,
    result: std::result::Result<Result<()>, Box<dyn Any + Send>>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(
            handler = name,
            hook,
            station = ctx.station(),
            request_id = ctx.request_id(),
            "handler failed: {}",
            e
        ),
        Err(payload) => tracing::error!(
            handler = name,
            hook,
            station = ctx.station(),
            request_id = ctx.request_id(),
            "handler panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

static INSTALLED: OnceLock<HandlerRegistry> = OnceLock::new();

/// Install the process-wide registry.
///
/// Call once at startup, before issuing calls.
///
/// # Errors
///
/// `RegistryInstalled` if a registry was already installed.
pub fn install(registry: HandlerRegistry) -> Result<()> {
    INSTALLED
        .set(registry)
        .map_err(|_| StationError::RegistryInstalled)
}

/// The process-wide registry, if one was installed.
pub fn installed() -> Option<&'static HandlerRegistry> {
    INSTALLED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        fail_before: bool,
        panic_after: bool,
    }

    impl CallHandler for Recorder {
        fn before_call(&mut self, _ctx: &mut CallContext) -> Result<()> {
            self.log.lock().push(format!("{}:before", self.name));
            if self.fail_before {
                return Err(StationError::Handler("refused".to_string()));
            }
            Ok(())
        }

        fn after_call(&mut self, _ctx: &CallContext) -> Result<()> {
            self.log.lock().push(format!("{}:after", self.name));
            if self.panic_after {
                panic!("after hook exploded");
            }
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Log, fail_before: bool, panic_after: bool) -> impl HandlerFactory {
        let log = log.clone();
        move || {
            Box::new(Recorder {
                name,
                log: log.clone(),
                fail_before,
                panic_after,
            }) as Box<dyn CallHandler>
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.register("first", recorder("first", &log, false, false));
        registry.register("second", recorder("second", &log, false, false));

        let mut ctx = CallContext::new("orders", "create");
        let mut chain = registry.instantiate();
        chain.run_before(&mut ctx);
        chain.run_after(&ctx);

        assert_eq!(
            *log.lock(),
            vec!["first:before", "second:before", "first:after", "second:after"]
        );
    }

    #[test]
    fn test_errors_and_panics_are_suppressed() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.register("failing", recorder("failing", &log, true, true));
        registry.register("healthy", recorder("healthy", &log, false, false));

        let mut ctx = CallContext::new("orders", "create");
        let mut chain = registry.instantiate();
        chain.run_before(&mut ctx);
        chain.run_after(&ctx);

        // The healthy handler still ran after the failing one.
        assert_eq!(
            *log.lock(),
            vec!["failing:before", "healthy:before", "failing:after", "healthy:after"]
        );
    }

    #[test]
    fn test_panicking_factory_is_skipped() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.register("broken", || -> Box<dyn CallHandler> { panic!("no handler") });
        registry.register("ok", recorder("ok", &log, false, false));

        let chain = registry.instantiate();
        assert_eq!(chain.len(), 1);
        assert_eq!(registry.names(), vec!["broken", "ok"]);
    }

    #[test]
    fn test_fresh_instance_per_call() {
        let created = Arc::new(Mutex::new(0usize));
        let counter = created.clone();
        let mut registry = HandlerRegistry::new();
        registry.register("counted", move || {
            *counter.lock() += 1;
            Box::new(Recorder {
                name: "counted",
                log: Arc::default(),
                fail_before: false,
                panic_after: false,
            }) as Box<dyn CallHandler>
        });

        registry.instantiate();
        registry.instantiate();
        assert_eq!(*created.lock(), 2);
    }

    #[test]
    fn test_install_once() {
        let mut registry = HandlerRegistry::new();
        registry.register("noop", || {
            Box::new(Recorder {
                name: "noop",
                log: Arc::default(),
                fail_before: false,
                panic_after: false,
            }) as Box<dyn CallHandler>
        });

        install(registry).unwrap();
        assert_eq!(installed().map(|r| r.len()), Some(1));
        assert!(matches!(
            install(HandlerRegistry::new()),
            Err(StationError::RegistryInstalled)
        ));
    }
}
