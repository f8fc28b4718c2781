use crate::{core::Core, raw};
use std::{
    ffi::{CString, c_void},
    fs,
    path::Path,
    ptr,
};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("ROM path contains an interior NUL byte")]
    BadPath,
    #[error("failed to read ROM `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("core rejected the game content")]
    Rejected,
}

/// Content descriptor assembled for `retro_load_game`.
///
/// When the core does not need a full path the entire file travels as an
/// in-memory buffer; otherwise only the path does and `data` stays empty.
/// The reported size is the on-disk file length in both cases.
#[derive(Debug)]
pub(crate) struct GameDescriptor {
    pub(crate) path: CString,
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) size: usize,
}

impl GameDescriptor {
    pub(crate) fn from_file(path: &Path, need_fullpath: bool) -> Result<Self, GameError> {
        let io_err = |source| GameError::Io {
            path: path.display().to_string(),
            source,
        };

        let c_path = CString::new(path.as_os_str().as_encoded_bytes().to_vec())
            .map_err(|_| GameError::BadPath)?;

        if need_fullpath {
            // The core opens the file itself; stat it anyway so a missing or
            // unreadable ROM fails here with a useful diagnostic.
            let size = fs::metadata(path).map_err(io_err)?.len() as usize;
            Ok(Self {
                path: c_path,
                data: None,
                size,
            })
        } else {
            let data = fs::read(path).map_err(io_err)?;
            Ok(Self {
                size: data.len(),
                path: c_path,
                data: Some(data),
            })
        }
    }
}

/// Loads the ROM at `path` into the core, honoring its `need_fullpath` flag.
///
/// A refused load or any I/O failure is an error; the bridge has no degraded
/// mode without content, so callers treat it as fatal.
pub fn load_game(core: &mut Core, path: &Path) -> Result<(), GameError> {
    let system = core.system_info();
    let descriptor = GameDescriptor::from_file(path, system.need_fullpath)?;
    tracing::info!(
        rom = %path.display(),
        size = descriptor.size,
        in_memory = descriptor.data.is_some(),
        "loading game content"
    );

    let info = raw::retro_game_info {
        path: descriptor.path.as_ptr(),
        data: descriptor
            .data
            .as_ref()
            .map_or(ptr::null(), |data| data.as_ptr() as *const c_void),
        size: descriptor.size,
        meta: ptr::null(),
    };

    if !core.load_game_raw(&info) {
        return Err(GameError::Rejected);
    }

    // The core may keep borrowing an in-memory buffer for as long as the
    // game stays loaded.
    if let Some(data) = descriptor.data {
        core.retain_rom(data);
    }

    Ok(())
}
