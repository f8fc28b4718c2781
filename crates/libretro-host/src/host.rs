use crate::{
    core::{Core, HostCallbacks, SystemAvInfo},
    environment::NegotiatedState,
    game,
    input::{InputSnapshot, InputState},
    raw,
    video::FrameBuffer,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::{
    ffi::c_void,
    os::raw::c_uint,
    path::Path,
    slice,
    sync::atomic::{AtomicU64, Ordering},
};

/// Process-wide bridge state reachable from the context-free C callbacks.
///
/// libretro callbacks carry no user-data pointer, so exactly one host lives
/// per process (matching the single-core scope). Each field sits behind its
/// own mutex and is locked only for the duration of one callback body, never
/// across `retro_run`; the core's reentrant callbacks therefore cannot
/// deadlock.
pub(crate) struct HostState {
    pub(crate) negotiated: Mutex<NegotiatedState>,
    pub(crate) input: Mutex<InputState>,
    pub(crate) pending_input: Mutex<InputSnapshot>,
    pub(crate) frame: Mutex<FrameBuffer>,
    pub(crate) frame_serial: AtomicU64,
}

pub(crate) static HOST: Lazy<HostState> = Lazy::new(|| HostState {
    negotiated: Mutex::new(NegotiatedState::default()),
    input: Mutex::new(InputState::default()),
    pending_input: Mutex::new(InputSnapshot::default()),
    frame: Mutex::new(FrameBuffer::new()),
    frame_serial: AtomicU64::new(0),
});

pub(crate) unsafe extern "C" fn environment_cb(cmd: c_uint, data: *mut c_void) -> bool {
    // SAFETY: the core passes the payload type libretro defines for `cmd`.
    unsafe { HOST.negotiated.lock().dispatch(cmd, data) }
}

pub(crate) unsafe extern "C" fn video_refresh_cb(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    if data.is_null() {
        // Duplicate frame: previous contents stay valid (GET_CAN_DUPE).
        HOST.frame_serial.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let format = HOST.negotiated.lock().pixel_format;
    // SAFETY: the core guarantees `height` rows of `pitch` bytes each.
    let src = unsafe { slice::from_raw_parts(data as *const u8, pitch * height as usize) };

    match HOST.frame.lock().convert(src, width, height, pitch, format) {
        Ok(()) => {
            HOST.frame_serial.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            // Without a defined pixel interpretation there is nothing to
            // display and the run loop cannot continue.
            tracing::error!(%err, "frame conversion failed");
            std::process::exit(1);
        }
    }
}

pub(crate) unsafe extern "C" fn input_poll_cb() {
    let snapshot = HOST.pending_input.lock().clone();
    HOST.input.lock().apply(&snapshot);
}

pub(crate) unsafe extern "C" fn input_state_cb(
    port: c_uint,
    device: c_uint,
    index: c_uint,
    id: c_uint,
) -> i16 {
    HOST.input.lock().query(port, device, index, id)
}

pub(crate) unsafe extern "C" fn audio_sample_cb(_left: i16, _right: i16) {}

pub(crate) unsafe extern "C" fn audio_sample_batch_cb(_data: *const i16, frames: usize) -> usize {
    // Samples are accepted and discarded; reporting them consumed keeps the
    // core's pacing intact.
    frames
}

fn host_callbacks() -> HostCallbacks {
    HostCallbacks {
        environment: Some(environment_cb),
        video_refresh: Some(video_refresh_cb),
        audio_sample: Some(audio_sample_cb),
        audio_sample_batch: Some(audio_sample_batch_cb),
        input_poll: Some(input_poll_cb),
        input_state: Some(input_state_cb),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] crate::core::LoadError),
    #[error(transparent)]
    Game(#[from] crate::game::GameError),
}

/// A loaded, initialized core with a game attached.
///
/// Drives one frame at a time and exposes the canonical RGBA frame to the
/// presentation layer. Dropping the session tears the core down.
pub struct Session {
    core: Core,
    av_info: SystemAvInfo,
}

impl Session {
    /// Loads the module at `module_path`, wires up the host callbacks,
    /// initializes the core, and loads the ROM at `rom_path`.
    pub fn start(module_path: &Path, rom_path: &Path) -> Result<Self, SessionError> {
        let mut core = Core::load(module_path)?;

        let api = core.api_version();
        if api != raw::RETRO_API_VERSION {
            tracing::warn!(api, expected = raw::RETRO_API_VERSION, "unexpected core API version");
        }
        let system = core.system_info();
        tracing::info!(
            core = %system.library_name,
            version = %system.library_version,
            "core loaded"
        );

        core.register_callbacks(host_callbacks());
        core.init();
        game::load_game(&mut core, rom_path)?;

        // Single controller port; a joypad goes into the first slot.
        core.set_controller_port_device(0, raw::RETRO_DEVICE_JOYPAD);

        let av_info = core.system_av_info();
        tracing::info!(
            width = av_info.geometry.base_width,
            height = av_info.geometry.base_height,
            fps = av_info.timing.fps,
            "session started"
        );

        Ok(Self { core, av_info })
    }

    /// Geometry and timing reported by the core at startup.
    pub fn av_info(&self) -> &SystemAvInfo {
        &self.av_info
    }

    /// Runs one core frame. The snapshot becomes visible to the core when it
    /// polls input during the call.
    pub fn run_frame(&mut self, snapshot: InputSnapshot) {
        *HOST.pending_input.lock() = snapshot;
        self.core.run();
    }

    /// Soft-resets the emulated system.
    pub fn reset(&mut self) {
        self.core.reset();
    }

    /// Read access to the most recent canonical frame.
    pub fn with_frame<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        f(&HOST.frame.lock())
    }

    /// Monotonic count of video refreshes, duplicates included. Lets callers
    /// skip texture uploads when nothing new arrived.
    pub fn frame_serial(&self) -> u64 {
        HOST.frame_serial.load(Ordering::Relaxed)
    }
}
