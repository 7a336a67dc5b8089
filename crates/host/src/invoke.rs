use crate::allocation::GuestBuffer;
use crate::config::InvokeConfig;
use crate::session::RuntimeSession;
use crate::timeout::invoke_with_timeout;
use guestcall_common::*;

impl RuntimeSession {
    /// call `function` with an already written input buffer and return the packed result
    ///
    /// any failure here (missing export, trap, metering exhaustion) poisons the session, the
    /// guest allocator can be halfway through anything when a trap unwinds it
    pub fn call(
        &mut self,
        function: &str,
        input: &GuestBuffer,
    ) -> Result<GuestPtrLen, WasmError> {
        let inner = self.inner_mut()?;
        let result = inner
            .instance
            .exports
            .get_typed_function::<(GuestPtr, Len), GuestPtrLen>(&inner.store, function)
            .map_err(|e| format!("export `{function}`: {e}"))
            .and_then(|target| {
                inner.refill();
                target
                    .call(&mut inner.store, input.guest_ptr(), input.len())
                    .map_err(|e| format!("`{function}` trapped: {e}"))
            });
        match result {
            Ok(packed) => {
                tracing::debug!(function, packed, "guest call returned");
                Ok(packed)
            }
            Err(message) => {
                self.poison();
                Err(wasm_error!(WasmErrorInner::GuestCallFailed(message)))
            }
        }
    }

    /// the whole call with bytes in and bytes out
    ///
    /// 1. reserve a guest buffer for the input
    /// 2. write the input into it
    /// 3. call the guest function
    /// 4. decode the packed pointer/length it returns
    /// 5. read the output bytes
    /// 6. release the output buffer, then the input buffer
    ///
    /// the input buffer is only released once the guest call has returned and the output has
    /// been read (or failed to read), and both releases happen on every path that got far enough
    /// to reserve them
    /// release failures do not replace the result, they are aggregated into a single
    /// ReleaseFailed that is logged and kept for take_release_failure
    pub fn invoke(&mut self, function: &str, input: &[u8]) -> Result<Vec<u8>, WasmError> {
        let len = Len::try_from(input.len()).map_err(|e| wasm_error!(e))?;
        let result = self.with_reserved(len, |session, input_buffer| {
            session.write(input_buffer, input)?;
            let packed = session.call(function, input_buffer)?;
            session.with_adopted(GuestBuffer::decode(packed), |session, output_buffer| {
                session.read(output_buffer)
            })
        });

        self.last_release_failure = self.aggregate_release_failures();
        if let Some(release_failure) = &self.last_release_failure {
            tracing::error!(function, error = %release_failure, "failed to release guest buffers");
        }
        if let Err(e) = &result {
            if e.poisons_session() {
                self.poison();
            }
            tracing::debug!(function, error = %e, "invoke failed");
        }
        result
    }

    /// invoke the function this session was opened for
    pub fn invoke_target(&mut self, input: &[u8]) -> Result<Vec<u8>, WasmError> {
        let target = self.target.clone();
        self.invoke(&target, input)
    }
}

/// The host facing call.
///
/// Compiles the guest, opens a fresh session, calls `function` with `input` and tears the session
/// down again before returning, whatever the outcome.
pub fn invoke(guest_image: &[u8], function: &str, input: &[u8]) -> Result<Vec<u8>, WasmError> {
    invoke_with_config(guest_image, function, input, &InvokeConfig::default())
}

/// invoke with explicit metering and deadline configuration
pub fn invoke_with_config(
    guest_image: &[u8],
    function: &str,
    input: &[u8],
    config: &InvokeConfig,
) -> Result<Vec<u8>, WasmError> {
    let session = RuntimeSession::open_with_config(guest_image, function, config)?;
    match config.timeout() {
        Some(timeout) => {
            let (session, result) = invoke_with_timeout(session, function, input, timeout);
            // dropping closes it, being explicit reads better at the end of a one shot call
            if let Some(mut session) = session {
                session.close();
            }
            result
        }
        None => {
            let mut session = session;
            let result = session.invoke(function, input);
            session.close();
            result
        }
    }
}
