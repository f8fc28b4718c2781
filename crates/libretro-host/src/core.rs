use crate::raw;
use libloading::Library;
use std::{
    ffi::{CStr, c_char},
    os::raw::c_uint,
    path::Path,
    ptr,
};

/// Raw address of an exported entry point before it gains its typed
/// signature.
pub(crate) type RawEntryPoint = *const ();

/// Error produced while opening a core module or resolving its entry points.
///
/// A failed load yields no handle at all; there is no partially-resolved
/// state a caller could observe.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open core module: {0}")]
    Open(libloading::Error),
    #[error("core module is missing required entry point `{name}`")]
    SymbolMissing { name: &'static str },
}

macro_rules! entry_points {
    ($( $name:ident : $sig:ty, )+) => {
        /// Fully-resolved libretro entry-point table.
        ///
        /// Every pointer stays valid for as long as the [`Library`] that
        /// produced it is alive.
        pub(crate) struct CoreApi {
            $( pub(crate) $name: $sig, )+
        }

        impl CoreApi {
            /// Names of every required entry point, in resolution order.
            pub(crate) const SYMBOL_NAMES: &'static [&'static str] =
                &[$( stringify!($name), )+];

            /// Resolves the whole manifest in one pass, failing on the first
            /// missing symbol.
            ///
            /// `lookup` returns the exported address for a name, or `None`
            /// when the module does not export it.
            pub(crate) fn resolve(
                mut lookup: impl FnMut(&'static str) -> Option<RawEntryPoint>,
            ) -> Result<Self, LoadError> {
                Ok(Self {
                    $(
                        $name: match lookup(stringify!($name)) {
                            // SAFETY: the address comes out of the module's
                            // export table under the exact libretro symbol
                            // name, so it carries the declared C signature.
                            Some(addr) => unsafe {
                                std::mem::transmute::<RawEntryPoint, $sig>(addr)
                            },
                            None => {
                                return Err(LoadError::SymbolMissing {
                                    name: stringify!($name),
                                });
                            }
                        },
                    )+
                })
            }
        }
    };
}

entry_points! {
    retro_init: unsafe extern "C" fn(),
    retro_deinit: unsafe extern "C" fn(),
    retro_api_version: unsafe extern "C" fn() -> c_uint,
    retro_get_system_info: unsafe extern "C" fn(*mut raw::retro_system_info),
    retro_get_system_av_info: unsafe extern "C" fn(*mut raw::retro_system_av_info),
    retro_set_controller_port_device: unsafe extern "C" fn(c_uint, c_uint),
    retro_reset: unsafe extern "C" fn(),
    retro_run: unsafe extern "C" fn(),
    retro_load_game: unsafe extern "C" fn(*const raw::retro_game_info) -> bool,
    retro_unload_game: unsafe extern "C" fn(),
    retro_set_environment: unsafe extern "C" fn(raw::retro_environment_t),
    retro_set_video_refresh: unsafe extern "C" fn(raw::retro_video_refresh_t),
    retro_set_input_poll: unsafe extern "C" fn(raw::retro_input_poll_t),
    retro_set_input_state: unsafe extern "C" fn(raw::retro_input_state_t),
    retro_set_audio_sample: unsafe extern "C" fn(raw::retro_audio_sample_t),
    retro_set_audio_sample_batch: unsafe extern "C" fn(raw::retro_audio_sample_batch_t),
}

/// The callback set a frontend hands to a core before `retro_init`.
#[derive(Clone, Copy)]
pub struct HostCallbacks {
    pub environment: raw::retro_environment_t,
    pub video_refresh: raw::retro_video_refresh_t,
    pub audio_sample: raw::retro_audio_sample_t,
    pub audio_sample_batch: raw::retro_audio_sample_batch_t,
    pub input_poll: raw::retro_input_poll_t,
    pub input_state: raw::retro_input_state_t,
}

/// A loaded core module with its entry-point table.
///
/// Construction either resolves every required entry point or fails; a
/// `Core` value is always fully usable. Dropping the core tears it down in
/// the order libretro expects: `retro_unload_game` (if a game was loaded),
/// then `retro_deinit` (if initialized).
pub struct Core {
    api: CoreApi,
    initialized: bool,
    game_loaded: bool,
    // Backing storage for content handed to the core by pointer; libretro
    // lets the core borrow it for as long as the game stays loaded.
    rom_data: Option<Vec<u8>>,
    // Declared last so the entry points in `api` outlive every use above.
    _library: Library,
}

impl Core {
    /// Opens the shared module at `path` and resolves the full entry-point
    /// manifest. No core function is invoked.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        // SAFETY: opening a shared object runs its initializers; the caller
        // trusts the module to be a well-formed libretro core.
        let library = unsafe { Library::new(path) }.map_err(LoadError::Open)?;
        let api = CoreApi::resolve(|name| {
            // SAFETY: `name` is a plain C identifier; the resolved address is
            // only reinterpreted with its libretro signature.
            unsafe { library.get::<unsafe extern "C" fn()>(name.as_bytes()) }
                .ok()
                .map(|sym| *sym as RawEntryPoint)
        })?;

        Ok(Self {
            api,
            initialized: false,
            game_loaded: false,
            rom_data: None,
            _library: library,
        })
    }

    /// Registers the full callback set with the core.
    ///
    /// Must happen before [`init`](Self::init); libretro requires the
    /// environment callback in particular to be installed first.
    pub fn register_callbacks(&mut self, cb: HostCallbacks) {
        // SAFETY: the setters only store the provided function pointers.
        unsafe {
            (self.api.retro_set_environment)(cb.environment);
            (self.api.retro_set_video_refresh)(cb.video_refresh);
            (self.api.retro_set_input_poll)(cb.input_poll);
            (self.api.retro_set_input_state)(cb.input_state);
            (self.api.retro_set_audio_sample)(cb.audio_sample);
            (self.api.retro_set_audio_sample_batch)(cb.audio_sample_batch);
        }
    }

    /// Reports the libretro API revision the core implements.
    pub fn api_version(&self) -> u32 {
        // SAFETY: resolved entry point with no preconditions.
        unsafe { (self.api.retro_api_version)() }
    }

    /// Runs the core's one-time initialization. Idempotent.
    pub fn init(&mut self) {
        if !self.initialized {
            // SAFETY: callbacks are expected to be registered already; the
            // core may invoke the environment callback during init.
            unsafe { (self.api.retro_init)() };
            self.initialized = true;
        }
    }

    /// Drives one emulated frame. The core may reenter any registered
    /// callback during the call.
    pub fn run(&mut self) {
        debug_assert!(self.initialized, "retro_run before retro_init");
        // SAFETY: the core is initialized and a game is loaded.
        unsafe { (self.api.retro_run)() };
    }

    /// Soft-resets the emulated system.
    pub fn reset(&mut self) {
        // SAFETY: the core is initialized.
        unsafe { (self.api.retro_reset)() };
    }

    /// Assigns a device type to a controller port.
    pub fn set_controller_port_device(&mut self, port: u32, device: u32) {
        // SAFETY: plain value call into the core.
        unsafe { (self.api.retro_set_controller_port_device)(port, device) };
    }

    /// Queries the core's static metadata.
    pub fn system_info(&self) -> SystemInfo {
        let mut info = raw::retro_system_info {
            library_name: ptr::null(),
            library_version: ptr::null(),
            valid_extensions: ptr::null(),
            need_fullpath: false,
            block_extract: false,
        };
        // SAFETY: `info` is a valid, writable struct of the expected layout.
        unsafe { (self.api.retro_get_system_info)(&mut info) };
        SystemInfo::from_raw(&info)
    }

    /// Queries geometry and timing. Only meaningful after a game is loaded.
    pub fn system_av_info(&self) -> SystemAvInfo {
        let mut info = raw::retro_system_av_info {
            geometry: raw::retro_game_geometry {
                base_width: 0,
                base_height: 0,
                max_width: 0,
                max_height: 0,
                aspect_ratio: 0.0,
            },
            timing: raw::retro_system_timing {
                fps: 0.0,
                sample_rate: 0.0,
            },
        };
        // SAFETY: `info` is a valid, writable struct of the expected layout.
        unsafe { (self.api.retro_get_system_av_info)(&mut info) };
        SystemAvInfo::from_raw(&info)
    }

    pub(crate) fn load_game_raw(&mut self, info: &raw::retro_game_info) -> bool {
        // SAFETY: `info` and the buffers it references stay valid for the
        // duration of the call; `retain_rom` keeps in-memory content alive
        // afterwards.
        let loaded = unsafe { (self.api.retro_load_game)(info) };
        self.game_loaded = loaded;
        loaded
    }

    pub(crate) fn retain_rom(&mut self, data: Vec<u8>) {
        self.rom_data = Some(data);
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        if self.game_loaded {
            // SAFETY: a game is loaded; the core releases its content refs.
            unsafe { (self.api.retro_unload_game)() };
            self.game_loaded = false;
            self.rom_data = None;
        }
        if self.initialized {
            // SAFETY: matches the earlier retro_init.
            unsafe { (self.api.retro_deinit)() };
            self.initialized = false;
        }
    }
}

/// Safe view of `retro_system_info`.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Human-readable core name.
    pub library_name: String,
    /// Core version string.
    pub library_version: String,
    /// Pipe-delimited list of content extensions the core accepts.
    pub valid_extensions: Option<String>,
    /// When true the core opens content by path itself; the frontend must
    /// not read the file into memory on its behalf.
    pub need_fullpath: bool,
    /// When true the frontend must not extract archives before loading.
    pub block_extract: bool,
}

impl SystemInfo {
    fn from_raw(info: &raw::retro_system_info) -> Self {
        Self {
            library_name: c_str_to_string(info.library_name).unwrap_or_default(),
            library_version: c_str_to_string(info.library_version).unwrap_or_default(),
            valid_extensions: c_str_to_string(info.valid_extensions),
            need_fullpath: info.need_fullpath,
            block_extract: info.block_extract,
        }
    }
}

/// Safe view of `retro_system_av_info`.
#[derive(Debug, Clone, Copy)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

impl SystemAvInfo {
    fn from_raw(info: &raw::retro_system_av_info) -> Self {
        Self {
            geometry: GameGeometry {
                base_width: info.geometry.base_width,
                base_height: info.geometry.base_height,
                max_width: info.geometry.max_width,
                max_height: info.geometry.max_height,
                aspect_ratio: info.geometry.aspect_ratio,
            },
            timing: SystemTiming {
                fps: info.timing.fps,
                sample_rate: info.timing.sample_rate,
            },
        }
    }
}

/// Matches `retro_game_geometry`.
#[derive(Debug, Clone, Copy)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

/// Matches `retro_system_timing`.
#[derive(Debug, Clone, Copy)]
pub struct SystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    // SAFETY: the core hands out NUL-terminated static strings here.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .ok()
        .map(|s| s.to_owned())
}
