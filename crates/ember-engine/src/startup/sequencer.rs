use thiserror::Error;

/// A critical stage failed; the process is expected to exit immediately.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("critical subsystem `{stage}` failed to initialize: {source:#}")]
    Critical {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StartupError {
    pub fn stage(&self) -> &'static str {
        match self {
            StartupError::Critical { stage, .. } => stage,
        }
    }
}

type Teardown<C> = Box<dyn FnOnce(&mut C)>;

/// Stack of teardown closures, run last-registered first.
///
/// `C` is the context the closures release subsystems from (the runtime
/// session in the engine, a plain log in tests). Dropping the stack without
/// calling [`shutdown`](Self::shutdown) discards the closures unrun.
pub struct TeardownStack<C> {
    entries: Vec<(&'static str, Teardown<C>)>,
}

impl<C> TeardownStack<C> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, stage: &'static str, teardown: impl FnOnce(&mut C) + 'static) {
        self.entries.push((stage, Box::new(teardown)));
    }

    /// Runs every registered teardown in reverse registration order.
    pub fn shutdown(mut self, ctx: &mut C) {
        while let Some((stage, teardown)) = self.entries.pop() {
            log::info!("tearing down {stage}");
            teardown(ctx);
        }
    }

    /// Drops all registered teardowns without running them.
    pub fn disarm(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("discarding {} teardown(s) without running them", self.entries.len());
        }
        self.entries.clear();
    }

    /// Registered stages in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(stage, _)| *stage)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for TeardownStack<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs initialization stages in call order.
///
/// - [`critical`](Self::critical) stages abort the sequence on failure. The
///   teardown stack is disarmed at that point: the process terminates without
///   tearing down what was already initialized, and later stages never register.
/// - [`degradable`](Self::degradable) stages log a warning and continue with a
///   fallback value.
pub struct StartupSequencer<C> {
    stack: TeardownStack<C>,
    failed: Option<&'static str>,
}

impl<C> StartupSequencer<C> {
    pub fn new() -> Self {
        Self {
            stack: TeardownStack::new(),
            failed: None,
        }
    }

    pub fn critical<T>(
        &mut self,
        stage: &'static str,
        init: impl FnOnce() -> anyhow::Result<T>,
    ) -> Result<T, StartupError> {
        if let Some(failed) = self.failed {
            return Err(StartupError::Critical {
                stage,
                source: anyhow::anyhow!("skipped after `{failed}` failed"),
            });
        }

        match init() {
            Ok(value) => {
                log::info!("{stage} initialized");
                Ok(value)
            }
            Err(source) => {
                log::error!("{stage} failed to initialize: {source:#}");
                self.failed = Some(stage);
                self.stack.disarm();
                Err(StartupError::Critical { stage, source })
            }
        }
    }

    pub fn degradable<T>(
        &mut self,
        stage: &'static str,
        init: impl FnOnce() -> anyhow::Result<T>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        match init() {
            Ok(value) => {
                log::info!("{stage} initialized");
                value
            }
            Err(e) => {
                log::warn!("{stage} unavailable, using fallback: {e:#}");
                fallback()
            }
        }
    }

    /// Registers the teardown of a stage that just initialized.
    ///
    /// Ignored once a critical stage failed.
    pub fn register_teardown(&mut self, stage: &'static str, teardown: impl FnOnce(&mut C) + 'static) {
        if self.failed.is_none() {
            self.stack.push(stage, teardown);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Ends the sequence and hands over the teardown stack.
    pub fn finish(self) -> TeardownStack<C> {
        self.stack
    }
}

impl<C> Default for StartupSequencer<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn ok_stage(seq: &mut StartupSequencer<Log>, name: &'static str, log: &mut Log) {
        seq.critical(name, || {
            log.push(name);
            Ok(())
        })
        .unwrap();
        seq.register_teardown(name, move |ctx: &mut Log| ctx.push(name));
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn teardown_runs_in_reverse_init_order() {
        let mut init_log = Log::new();
        let mut seq = StartupSequencer::<Log>::new();
        ok_stage(&mut seq, "x", &mut init_log);
        ok_stage(&mut seq, "y", &mut init_log);
        ok_stage(&mut seq, "z", &mut init_log);

        let stack = seq.finish();
        assert_eq!(stack.stages().collect::<Vec<_>>(), vec!["x", "y", "z"]);

        let mut teardown_log = Log::new();
        stack.shutdown(&mut teardown_log);

        assert_eq!(init_log, vec!["x", "y", "z"]);
        assert_eq!(teardown_log, vec!["z", "y", "x"]);
    }

    #[test]
    fn stages_without_teardown_are_skipped_on_shutdown() {
        let mut init_log = Log::new();
        let mut seq = StartupSequencer::<Log>::new();
        ok_stage(&mut seq, "window", &mut init_log);
        seq.critical("graphics api", || Ok(())).unwrap();
        ok_stage(&mut seq, "render", &mut init_log);

        let mut teardown_log = Log::new();
        seq.finish().shutdown(&mut teardown_log);
        assert_eq!(teardown_log, vec!["render", "window"]);
    }

    // ── critical failure ──────────────────────────────────────────────────

    #[test]
    fn critical_failure_disarms_earlier_teardowns() {
        let mut init_log = Log::new();
        let mut seq = StartupSequencer::<Log>::new();
        ok_stage(&mut seq, "x", &mut init_log);

        let err = seq
            .critical::<()>("y", || anyhow::bail!("no adapter"))
            .unwrap_err();
        assert_eq!(err.stage(), "y");
        assert!(err.to_string().contains("no adapter"));

        // Later stages neither run nor register.
        let mut z_ran = false;
        assert!(seq.critical("z", || {
            z_ran = true;
            Ok(())
        }).is_err());
        seq.register_teardown("z", |ctx: &mut Log| ctx.push("z"));
        assert!(!z_ran);
        assert!(seq.has_failed());

        let stack = seq.finish();
        assert!(stack.is_empty());

        let mut teardown_log = Log::new();
        stack.shutdown(&mut teardown_log);
        assert!(teardown_log.is_empty());
    }

    // ── degradable ────────────────────────────────────────────────────────

    #[test]
    fn degradable_failure_uses_fallback_and_continues() {
        let mut seq = StartupSequencer::<Log>::new();
        let port = seq.degradable("diagnostics", || anyhow::bail!("address in use"), || 0u16);
        assert_eq!(port, 0);
        assert!(!seq.has_failed());

        assert!(seq.critical("window", || Ok(())).is_ok());
    }

    #[test]
    fn degradable_success_returns_value() {
        let mut seq = StartupSequencer::<Log>::new();
        let v = seq.degradable("settings", || Ok(7), || 0);
        assert_eq!(v, 7);
    }
}
