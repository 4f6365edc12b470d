//! # Foreign config adapter.
//!
//! Copies caller-owned, NUL-terminated strings into an owned [`GatewayConfig`].
//! The pointers are only valid for the duration of the call; nothing here keeps
//! them, because the gateway outlives the call that supplied them.

use std::ffi::{CStr, c_char};

use crate::error::ConfigError;
use crate::gateway::{Endpoint, GatewayConfig};

/// Copies one foreign string.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid and
/// unmodified for the duration of this call.
pub(crate) unsafe fn owned_string(
    ptr: *const c_char,
    field: &'static str,
) -> Result<String, ConfigError> {
    if ptr.is_null() {
        return Err(ConfigError::NullPointer { field });
    }
    // SAFETY: non-null, and the caller guarantees a valid NUL-terminated string.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(str::to_owned)
        .map_err(|_| ConfigError::NotUtf8 { field })
}

/// Builds a [`GatewayConfig`] from the four boundary strings.
///
/// No semantic validation happens here; the gateway checks addresses and the
/// network name when it starts.
///
/// # Errors
/// [`ConfigError::NullPointer`] or [`ConfigError::NotUtf8`] naming the first bad
/// argument.
///
/// # Safety
/// Each pointer must be null or point to a NUL-terminated string valid for the
/// duration of this call.
pub unsafe fn config_from_foreign(
    listen_addr: *const c_char,
    network: *const c_char,
    endpoint_addr: *const c_char,
    assets_dir: *const c_char,
) -> Result<GatewayConfig, ConfigError> {
    // SAFETY: forwarded from this function's contract.
    let (listen_addr, network, endpoint_addr, assets_dir) = unsafe {
        (
            owned_string(listen_addr, "listen_addr")?,
            owned_string(network, "network")?,
            owned_string(endpoint_addr, "endpoint_addr")?,
            owned_string(assets_dir, "assets_dir")?,
        )
    };

    Ok(GatewayConfig::new(
        listen_addr,
        Endpoint::new(network, endpoint_addr),
        assets_dir,
    ))
}
