//! # C ABI boundary.
//!
//! The only surface a foreign host sees:
//!
//! | Function                    | Returns                                                   |
//! |-----------------------------|-----------------------------------------------------------|
//! | `spawn_gateway`             | handle `> 0`, or `0` if arguments or thread spawn failed  |
//! | `wait_for_gateway`          | `true` on clean stop; `false` on failure or unknown handle|
//! | `wait_for_gateway_status`   | one of the `STATUS_*` codes                               |
//! | `cancel_gateway`            | `true` if the handle was live                              |
//!
//! ## Rules
//! - Strings are copied before `spawn_gateway` returns; the caller keeps ownership.
//! - No panic crosses the boundary: each entry point catches unwinding and maps it
//!   to its failure value.
//! - `wait_for_gateway*` blocks the calling thread and removes the handle; a second
//!   wait on the same handle reports an unknown handle.
//! - A thread that is driving a tokio runtime may not wait. The call returns
//!   [`STATUS_IN_ASYNC_CONTEXT`] and the handle stays valid.
//! - All entry points share one process-level [`Supervisor`], created on first use
//!   with a [`LogWriter`] subscriber. The host decides where `tracing` output goes.

mod adapter;

pub use adapter::config_from_foreign;

use std::ffi::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};

use tracing::{error, warn};

use crate::core::{Supervisor, SupervisorConfig, TaskHandle};
use crate::error::{RuntimeError, panic_message};
use crate::gateway::{Gateway, GatewayConfig};
use crate::subscribers::LogWriter;

/// The task stopped cleanly.
pub const STATUS_OK: i32 = 0;
/// The task reported an error.
pub const STATUS_FAILED: i32 = 1;
/// The handle was never returned by `spawn_gateway`, or was already waited for.
pub const STATUS_UNKNOWN_HANDLE: i32 = -1;
/// The supervisor itself panicked while waiting.
pub const STATUS_PANICKED: i32 = -2;
/// The calling thread is inside an async runtime; nothing was waited for.
pub const STATUS_IN_ASYNC_CONTEXT: i32 = -3;

static SUPERVISOR: OnceLock<Arc<Supervisor>> = OnceLock::new();

fn supervisor() -> &'static Supervisor {
    SUPERVISOR.get_or_init(|| {
        Supervisor::builder(SupervisorConfig::default())
            .with_subscribers(vec![Arc::new(LogWriter::new())])
            .build()
    })
}

/// Runs `f`, converting a panic into `fallback`.
fn guard<T>(entry: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        error!(entry, info = %panic_message(payload.as_ref()), "panic at foreign boundary");
        fallback
    })
}

fn spawn_with(sup: &Supervisor, cfg: GatewayConfig) -> i64 {
    let handle = match sup.spawn(Arc::new(Gateway::new(cfg))) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, label = e.as_label(), "spawn_gateway failed");
            return 0;
        }
    };
    match i64::try_from(handle.as_raw()) {
        Ok(raw) => raw,
        Err(_) => {
            error!(%handle, "handle space exhausted");
            let _ = sup.cancel(handle);
            0
        }
    }
}

fn status_of(sup: &Supervisor, handle: i64) -> i32 {
    let Ok(raw) = u64::try_from(handle) else {
        warn!(handle, "negative handle");
        return STATUS_UNKNOWN_HANDLE;
    };
    match sup.join(TaskHandle::from_raw(raw)) {
        Ok(()) => STATUS_OK,
        Err(RuntimeError::UnknownHandle { .. }) => STATUS_UNKNOWN_HANDLE,
        Err(RuntimeError::InAsyncContext) => {
            warn!(handle, "wait_for_gateway called inside an async runtime");
            STATUS_IN_ASYNC_CONTEXT
        }
        Err(_) => STATUS_FAILED,
    }
}

fn cancel_with(sup: &Supervisor, handle: i64) -> bool {
    u64::try_from(handle)
        .ok()
        .is_some_and(|raw| sup.cancel(TaskHandle::from_raw(raw)).is_ok())
}

/// Starts a gateway in the background and returns its handle.
///
/// Returns `0` if any argument is null or not UTF-8, or if the worker thread
/// could not be started. Addresses and the network name are not validated here;
/// a bad value makes the gateway fail, which `wait_for_gateway` reports.
///
/// # Safety
/// Each argument must be null or a NUL-terminated string valid for the duration
/// of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spawn_gateway(
    listen_addr: *const c_char,
    network: *const c_char,
    endpoint_addr: *const c_char,
    assets_dir: *const c_char,
) -> i64 {
    // SAFETY: forwarded from this function's contract.
    let cfg = unsafe { config_from_foreign(listen_addr, network, endpoint_addr, assets_dir) };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, label = e.as_label(), "spawn_gateway rejected arguments");
            return 0;
        }
    };
    guard("spawn_gateway", 0, || spawn_with(supervisor(), cfg))
}

/// Stops the gateway behind `handle` and blocks until it has stopped.
///
/// Returns `true` if it stopped without error (including a stop caused only by
/// this cancellation), `false` if it failed or the handle is unknown. Must be
/// called from a thread that is not driving a tokio runtime; such a call returns
/// `false` without touching the gateway.
#[unsafe(no_mangle)]
pub extern "C" fn wait_for_gateway(handle: i64) -> bool {
    wait_for_gateway_status(handle) == STATUS_OK
}

/// Like [`wait_for_gateway`], but tells an unknown handle apart from a failure.
#[unsafe(no_mangle)]
pub extern "C" fn wait_for_gateway_status(handle: i64) -> i32 {
    guard("wait_for_gateway", STATUS_PANICKED, || {
        status_of(supervisor(), handle)
    })
}

/// Asks the gateway behind `handle` to stop, without waiting.
///
/// The handle stays valid for a later `wait_for_gateway`.
#[unsafe(no_mangle)]
pub extern "C" fn cancel_gateway(handle: i64) -> bool {
    guard("cancel_gateway", false, || cancel_with(supervisor(), handle))
}
