use crate::raw;

/// Host-side identifier for a physical control the frontend can report.
///
/// The frontend decides which keyboard keys (or other devices) produce these;
/// the mapper only cares about the logical control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKey {
    Up,
    Down,
    Left,
    Right,
    Start,
    A,
    B,
}

/// Fixed binding table from host controls to libretro joypad IDs.
///
/// Ordered, loaded once, immutable at runtime.
pub const BINDINGS: &[(HostKey, u32)] = &[
    (HostKey::Up, raw::RETRO_DEVICE_ID_JOYPAD_UP),
    (HostKey::Down, raw::RETRO_DEVICE_ID_JOYPAD_DOWN),
    (HostKey::Left, raw::RETRO_DEVICE_ID_JOYPAD_LEFT),
    (HostKey::Right, raw::RETRO_DEVICE_ID_JOYPAD_RIGHT),
    (HostKey::Start, raw::RETRO_DEVICE_ID_JOYPAD_START),
    (HostKey::A, raw::RETRO_DEVICE_ID_JOYPAD_A),
    (HostKey::B, raw::RETRO_DEVICE_ID_JOYPAD_B),
];

/// Pointer position normalized to `[0, 1]` over the presented frame.
#[derive(Debug, Clone, Copy)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub pressed: bool,
}

/// One frame's worth of physical input captured by the frontend.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub pressed: Vec<HostKey>,
    /// `None` when the pointer is outside the frame.
    pub pointer: Option<PointerState>,
}

const JOYPAD_IDS: usize = raw::RETRO_DEVICE_ID_JOYPAD_R3 as usize + 1;

/// Controller-line levels as the core reads them.
///
/// Written once per frame by [`apply`](Self::apply) before the core's
/// `retro_run`, read by the core through the input-state callback during it.
#[derive(Debug, Default)]
pub struct InputState {
    joypad: [i16; JOYPAD_IDS],
    pointer_x: i16,
    pointer_y: i16,
    pointer_pressed: i16,
}

impl InputState {
    /// Maps a snapshot through the binding table into foreign identifiers.
    pub fn apply(&mut self, snapshot: &InputSnapshot) {
        self.joypad = [0; JOYPAD_IDS];
        for (key, id) in BINDINGS {
            if snapshot.pressed.contains(key) {
                self.joypad[*id as usize] = 1;
            }
        }

        match snapshot.pointer {
            Some(pointer) => {
                self.pointer_x = scale_pointer(pointer.x);
                self.pointer_y = scale_pointer(pointer.y);
                self.pointer_pressed = i16::from(pointer.pressed);
            }
            None => {
                self.pointer_x = 0;
                self.pointer_y = 0;
                self.pointer_pressed = 0;
            }
        }
    }

    /// Answers the core's `retro_input_state` query.
    ///
    /// Only port 0, index 0 is wired; every other line reads 0.
    pub fn query(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        if port != 0 || index != 0 {
            return 0;
        }

        match device {
            raw::RETRO_DEVICE_JOYPAD => self.joypad.get(id as usize).copied().unwrap_or(0),
            raw::RETRO_DEVICE_POINTER => match id {
                raw::RETRO_DEVICE_ID_POINTER_X => self.pointer_x,
                raw::RETRO_DEVICE_ID_POINTER_Y => self.pointer_y,
                raw::RETRO_DEVICE_ID_POINTER_PRESSED => self.pointer_pressed,
                _ => 0,
            },
            _ => 0,
        }
    }
}

/// Scales a normalized `[0, 1]` coordinate into libretro's signed screen
/// range `[-0x8000, 0x7FFF]`.
fn scale_pointer(normalized: f32) -> i16 {
    let scaled = normalized.clamp(0.0, 1.0) * 65535.0 - 32768.0;
    scaled.round().clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(keys: &[HostKey]) -> InputState {
        let mut state = InputState::default();
        state.apply(&InputSnapshot {
            pressed: keys.to_vec(),
            pointer: None,
        });
        state
    }

    #[test]
    fn bound_keys_read_back_through_their_joypad_ids() {
        let state = pressed(&[HostKey::A, HostKey::Left]);
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_A),
            1
        );
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_LEFT),
            1
        );
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_B),
            0
        );
    }

    #[test]
    fn released_keys_clear_between_frames() {
        let mut state = pressed(&[HostKey::Start]);
        state.apply(&InputSnapshot::default());
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_START),
            0
        );
    }

    #[test]
    fn other_ports_and_indices_read_zero() {
        let state = pressed(&[HostKey::A]);
        for device in 0..8 {
            for id in 0..16 {
                assert_eq!(state.query(1, device, 0, id), 0);
                assert_eq!(state.query(0, device, 1, id), 0);
            }
        }
    }

    #[test]
    fn unknown_devices_read_zero() {
        let state = pressed(&[HostKey::A]);
        assert_eq!(state.query(0, raw::RETRO_DEVICE_LIGHTGUN, 0, 0), 0);
        assert_eq!(state.query(0, raw::RETRO_DEVICE_NONE, 0, 0), 0);
    }

    #[test]
    fn pointer_scaling_covers_the_signed_screen_range() {
        let mut state = InputState::default();
        state.apply(&InputSnapshot {
            pressed: Vec::new(),
            pointer: Some(PointerState {
                x: 0.0,
                y: 1.0,
                pressed: true,
            }),
        });
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_POINTER, 0, raw::RETRO_DEVICE_ID_POINTER_X),
            -0x8000
        );
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_POINTER, 0, raw::RETRO_DEVICE_ID_POINTER_Y),
            0x7FFF
        );
        assert_eq!(
            state.query(
                0,
                raw::RETRO_DEVICE_POINTER,
                0,
                raw::RETRO_DEVICE_ID_POINTER_PRESSED
            ),
            1
        );

        state.apply(&InputSnapshot::default());
        assert_eq!(
            state.query(0, raw::RETRO_DEVICE_POINTER, 0, raw::RETRO_DEVICE_ID_POINTER_PRESSED),
            0
        );
    }

    #[test]
    fn centered_pointer_maps_near_zero() {
        assert!(scale_pointer(0.5).abs() <= 1);
    }
}
