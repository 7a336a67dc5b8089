use crate::session::RuntimeSession;
use guestcall_common::*;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// The outcome of a call made on a worker thread with a deadline.
#[derive(Debug)]
pub struct TimedInvoke {
    /// the session, back from the worker, if it finished in time
    pub session: Option<RuntimeSession>,
    pub result: Result<Vec<u8>, WasmError>,
    /// the worker still running the guest after the deadline passed
    /// it finishes once the guest returns and yields whether it closed the session
    pub abandoned: Option<JoinHandle<bool>>,
}

/// Invoke `function` on a worker thread and give up waiting after `timeout`.
///
/// The session moves to the worker for the duration of the call and comes back alongside the
/// result if the worker finished in time, whatever the outcome of the call itself. The caller
/// decides whether to keep using it (see RuntimeSession::is_poisoned).
///
/// If the deadline passes first the caller gets Timeout and no session. No partial output is ever
/// returned. The worker tears the session down as soon as the guest returns control, which the
/// metering limit guarantees will happen even for a guest that spins forever.
///
/// Until then the abandoned session keeps its guest memory and its worker thread. With the
/// default WASM_METERING_LIMIT that can take seconds, so configure a smaller metering_limit
/// (see InvokeConfig::with_metering_limit) when timeouts matter.
pub fn invoke_with_timeout(
    session: RuntimeSession,
    function: &str,
    input: &[u8],
    timeout: Duration,
) -> (Option<RuntimeSession>, Result<Vec<u8>, WasmError>) {
    let timed = invoke_with_deadline(session, function, input, timeout);
    (timed.session, timed.result)
}

/// invoke_with_timeout that also hands back the abandoned worker, so the caller can wait for the
/// session to actually be torn down
pub fn invoke_with_deadline(
    session: RuntimeSession,
    function: &str,
    input: &[u8],
    timeout: Duration,
) -> TimedInvoke {
    let (sender, receiver) = mpsc::sync_channel(1);
    let function = function.to_string();
    let input = input.to_vec();

    let spawned = std::thread::Builder::new()
        .name(format!("guestcall-{function}"))
        .spawn(move || {
            let mut session = session;
            let result = session.invoke(&function, &input);
            match sender.send((session, result)) {
                Ok(()) => false,
                Err(mpsc::SendError((mut session, _))) => {
                    tracing::warn!(
                        function = %function,
                        "guest returned after the caller gave up, closing session"
                    );
                    session.close();
                    session.is_closed()
                }
            }
        });
    let worker = match spawned {
        Ok(worker) => worker,
        // the session went down with the closure that was never run
        Err(e) => {
            return TimedInvoke {
                session: None,
                result: Err(wasm_error!(WasmErrorInner::GuestCallFailed(format!(
                    "could not spawn invoke worker: {e}"
                )))),
                abandoned: None,
            }
        }
    };

    match receiver.recv_timeout(timeout) {
        Ok((session, result)) => TimedInvoke {
            session: Some(session),
            result,
            abandoned: None,
        },
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let millis = timeout.as_millis().try_into().unwrap_or(u64::MAX);
            tracing::warn!(timeout_ms = millis, "guest call timed out");
            TimedInvoke {
                session: None,
                result: Err(wasm_error!(WasmErrorInner::Timeout(millis))),
                abandoned: Some(worker),
            }
        }
        // the worker panicked, its session was dropped (and so closed) while unwinding
        Err(mpsc::RecvTimeoutError::Disconnected) => TimedInvoke {
            session: None,
            result: Err(wasm_error!(WasmErrorInner::GuestCallFailed(
                "invoke worker exited without a result".to_string()
            ))),
            abandoned: None,
        },
    }
}
