use crate::{raw, video::PixelFormat};
use std::{
    ffi::{CStr, c_char, c_void},
    os::raw::c_uint,
};

/// Capabilities negotiated with the core through the environment callback.
///
/// The core queries or sets entries at any time, before `retro_init` or from
/// inside `retro_run`; dispatch is a pure request/response table with no
/// ordering constraints.
pub struct NegotiatedState {
    /// Source framebuffer encoding the core announced via
    /// `SET_PIXEL_FORMAT`. Unknown until then.
    pub pixel_format: PixelFormat,
    /// Duplicate frames (null video data) are always acceptable here.
    pub can_dupe: bool,
    system_dir: &'static CStr,
    save_dir: &'static CStr,
}

impl Default for NegotiatedState {
    fn default() -> Self {
        // Both reported directories are the current working directory.
        Self {
            pixel_format: PixelFormat::Unknown,
            can_dupe: true,
            system_dir: c".",
            save_dir: c".",
        }
    }
}

impl NegotiatedState {
    /// Handles one environment request from the core.
    ///
    /// Returns `false` for commands this host does not negotiate; the core
    /// then falls back to its own default.
    ///
    /// # Safety
    /// `data` must point to the payload type libretro defines for `cmd`.
    pub unsafe fn dispatch(&mut self, cmd: c_uint, data: *mut c_void) -> bool {
        match cmd {
            raw::RETRO_ENVIRONMENT_GET_LOG_INTERFACE => {
                let cb = data as *mut raw::retro_log_callback;
                // SAFETY: payload is a `retro_log_callback` per the contract.
                unsafe { (*cb).log = log_printf() };
                true
            }
            raw::RETRO_ENVIRONMENT_GET_CAN_DUPE => {
                // SAFETY: payload is a `bool` per the contract.
                unsafe { *(data as *mut bool) = self.can_dupe };
                true
            }
            raw::RETRO_ENVIRONMENT_SET_PIXEL_FORMAT => {
                // SAFETY: payload is an `enum retro_pixel_format`.
                let value = unsafe { *(data as *const c_uint) };
                self.pixel_format = PixelFormat::from_raw(value);
                tracing::debug!(format = ?self.pixel_format, "core set pixel format");
                // Accepted unconditionally; a format without a defined layout
                // surfaces as a fatal conversion error at frame time instead.
                true
            }
            raw::RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY => {
                // SAFETY: payload is a `const char **`; the written pointer
                // has process lifetime.
                unsafe { *(data as *mut *const c_char) = self.system_dir.as_ptr() };
                true
            }
            raw::RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY => {
                // SAFETY: as above.
                unsafe { *(data as *mut *const c_char) = self.save_dir.as_ptr() };
                true
            }
            other => {
                tracing::debug!(cmd = other, "unhandled environment command");
                false
            }
        }
    }
}

/// Receives log lines from the core and forwards them to `tracing`.
///
/// `retro_log_printf_t` is C-variadic, which stable Rust cannot define; this
/// trampoline takes only the fixed leading arguments and logs the format
/// string verbatim, without expanding `printf` placeholders. A callee that
/// never touches its variadic arguments is compatible with the variadic call
/// on the C ABIs this host targets.
unsafe extern "C" fn core_log(level: c_uint, fmt: *const c_char) {
    let message = if fmt.is_null() {
        String::new()
    } else {
        // SAFETY: `fmt` is a NUL-terminated string supplied by the core.
        unsafe { CStr::from_ptr(fmt) }
            .to_string_lossy()
            .trim_end()
            .to_owned()
    };

    match level {
        raw::RETRO_LOG_DEBUG => tracing::debug!(target: "core", "{message}"),
        raw::RETRO_LOG_INFO => tracing::info!(target: "core", "{message}"),
        raw::RETRO_LOG_WARN => tracing::warn!(target: "core", "{message}"),
        _ => {
            // The contract treats core-reported errors as unrecoverable.
            tracing::error!(target: "core", "{message}");
            std::process::exit(1);
        }
    }
}

fn log_printf() -> raw::retro_log_printf_t {
    let fixed: unsafe extern "C" fn(c_uint, *const c_char) = core_log;
    // SAFETY: see `core_log`; only the fixed leading arguments are read.
    Some(unsafe {
        std::mem::transmute::<
            unsafe extern "C" fn(c_uint, *const c_char),
            unsafe extern "C" fn(c_uint, *const c_char, ...),
        >(fixed)
    })
}
