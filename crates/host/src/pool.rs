use crate::config::InvokeConfig;
use crate::module::GuestModule;
use crate::session::RuntimeSession;
use crate::timeout::invoke_with_timeout;
use guestcall_common::*;
use parking_lot::Mutex;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ops::DerefMut;
use std::time::Duration;

/// Pre-instantiated sessions of one guest, reused across calls to amortize instantiation.
///
/// A session is only ever held by one caller at a time, checking it out removes it from the idle
/// list entirely. Sessions that come back poisoned (trap, allocator failure, failed release,
/// timeout) are closed instead of being put back.
pub struct SessionPool {
    module: GuestModule,
    target: String,
    capacity: usize,
    timeout: Option<Duration>,
    idle: Mutex<Vec<RuntimeSession>>,
}

impl SessionPool {
    pub fn new(module: GuestModule, target: &str, config: &InvokeConfig) -> Self {
        Self {
            module,
            target: target.to_string(),
            capacity: config.pool_capacity,
            timeout: config.timeout(),
            idle: Mutex::new(Vec::with_capacity(config.pool_capacity)),
        }
    }

    /// open sessions up front so the first callers do not pay for instantiation
    pub fn warm(&self, count: usize) -> Result<(), WasmError> {
        for _ in 0..count.min(self.capacity) {
            let session = self.module.instantiate(&self.target)?;
            self.checkin(session);
        }
        Ok(())
    }

    /// take exclusive use of a session, opening a new one if none are idle
    pub fn checkout(&self) -> Result<PooledSession<'_>, WasmError> {
        let idle = self.idle.lock().pop();
        let session = match idle {
            Some(session) => session,
            None => self.module.instantiate(&self.target)?,
        };
        Ok(PooledSession {
            pool: self,
            session: ManuallyDrop::new(session),
        })
    }

    /// number of sessions waiting to be checked out
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// invoke the pool's target function on a pooled session, honouring the configured timeout
    pub fn invoke(&self, input: &[u8]) -> Result<Vec<u8>, WasmError> {
        let mut pooled = self.checkout()?;
        match self.timeout {
            None => pooled.invoke_target(input),
            Some(timeout) => {
                let session = pooled.detach();
                let (session, result) = invoke_with_timeout(session, &self.target, input, timeout);
                if let Some(session) = session {
                    self.checkin(session);
                }
                result
            }
        }
    }

    fn checkin(&self, mut session: RuntimeSession) {
        if session.is_closed() {
            return;
        }
        if session.is_poisoned() {
            tracing::warn!(target_function = %self.target, "discarding poisoned session");
            session.close();
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(session);
        } else {
            drop(idle);
            session.close();
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("target", &self.target)
            .field("capacity", &self.capacity)
            .field("idle", &self.idle())
            .finish_non_exhaustive()
    }
}

/// A session checked out of a SessionPool.
/// Dereferences to the session, and goes back to the pool (or is closed) when dropped.
pub struct PooledSession<'pool> {
    pool: &'pool SessionPool,
    // only ever taken by detach or drop, both of which consume the guard
    session: ManuallyDrop<RuntimeSession>,
}

impl PooledSession<'_> {
    /// take the session out of the pool's hands for good
    pub fn detach(self) -> RuntimeSession {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped so the session is taken exactly once
        unsafe { ManuallyDrop::take(&mut this.session) }
    }
}

impl Deref for PooledSession<'_> {
    type Target = RuntimeSession;

    fn deref(&self) -> &RuntimeSession {
        &self.session
    }
}

impl DerefMut for PooledSession<'_> {
    fn deref_mut(&mut self) -> &mut RuntimeSession {
        &mut self.session
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        // SAFETY: drop runs at most once and detach skips it
        let session = unsafe { ManuallyDrop::take(&mut self.session) };
        self.pool.checkin(session);
    }
}
