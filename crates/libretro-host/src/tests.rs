//! End-to-end exercise of the callback seam the way a core would drive it:
//! environment negotiation, video refresh, input poll/state, and audio, all
//! through the raw C-ABI trampolines against the process-wide host.
//!
//! The trampolines share one `HOST` instance, so the whole sequence lives in
//! a single test.

use crate::{
    host::{
        HOST, audio_sample_batch_cb, audio_sample_cb, environment_cb, input_poll_cb,
        input_state_cb, video_refresh_cb,
    },
    input::{HostKey, InputSnapshot},
    raw,
};
use std::{
    ffi::{c_uint, c_void},
    sync::atomic::Ordering,
};

#[test]
fn trampolines_drive_the_host_like_a_core_would() {
    // Negotiation phase: the core probes capabilities.
    let mut can_dupe = false;
    assert!(unsafe {
        environment_cb(
            raw::RETRO_ENVIRONMENT_GET_CAN_DUPE,
            &mut can_dupe as *mut bool as *mut c_void,
        )
    });
    assert!(can_dupe);

    let mut log = raw::retro_log_callback { log: None };
    assert!(unsafe {
        environment_cb(
            raw::RETRO_ENVIRONMENT_GET_LOG_INTERFACE,
            &mut log as *mut raw::retro_log_callback as *mut c_void,
        )
    });
    assert!(log.log.is_some());

    // Unknown negotiation is refused for that call only.
    let mut dummy = 0u32;
    assert!(!unsafe { environment_cb(0xBEEF, &mut dummy as *mut u32 as *mut c_void) });

    let mut format = raw::RETRO_PIXEL_FORMAT_RGB565;
    assert!(unsafe {
        environment_cb(
            raw::RETRO_ENVIRONMENT_SET_PIXEL_FORMAT,
            &mut format as *mut c_uint as *mut c_void,
        )
    });

    // Video refresh: a 2x2 solid red RGB565 frame, pitch equals row bytes.
    let serial_before = HOST.frame_serial.load(Ordering::Relaxed);
    let frame: Vec<u8> = 0xF800u16.to_le_bytes().repeat(4);
    unsafe { video_refresh_cb(frame.as_ptr() as *const c_void, 2, 2, 4) };
    {
        let fb = HOST.frame.lock();
        assert_eq!((fb.width(), fb.height()), (2, 2));
        for pixel in fb.pixels().chunks_exact(4) {
            assert_eq!(pixel, [255, 0, 0, 255]);
        }
    }
    assert_eq!(HOST.frame_serial.load(Ordering::Relaxed), serial_before + 1);

    // Duplicate frame: null data bumps the serial but keeps the pixels.
    unsafe { video_refresh_cb(std::ptr::null(), 0, 0, 0) };
    {
        let fb = HOST.frame.lock();
        assert_eq!((fb.width(), fb.height()), (2, 2));
        assert_eq!(&fb.pixels()[..4], [255, 0, 0, 255]);
    }
    assert_eq!(HOST.frame_serial.load(Ordering::Relaxed), serial_before + 2);

    // Input: the frontend stages a snapshot, the core polls, then queries.
    *HOST.pending_input.lock() = InputSnapshot {
        pressed: vec![HostKey::A, HostKey::Up],
        pointer: None,
    };
    unsafe { input_poll_cb() };
    assert_eq!(
        unsafe {
            input_state_cb(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_A)
        },
        1
    );
    assert_eq!(
        unsafe {
            input_state_cb(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_UP)
        },
        1
    );
    assert_eq!(
        unsafe {
            input_state_cb(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_B)
        },
        0
    );
    assert_eq!(
        unsafe {
            input_state_cb(1, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_A)
        },
        0
    );
    assert_eq!(
        unsafe {
            input_state_cb(0, raw::RETRO_DEVICE_JOYPAD, 1, raw::RETRO_DEVICE_ID_JOYPAD_A)
        },
        0
    );

    // Audio is accepted and discarded; the batch reports full consumption.
    unsafe { audio_sample_cb(100, -100) };
    let samples = [0i16; 8];
    assert_eq!(unsafe { audio_sample_batch_cb(samples.as_ptr(), 4) }, 4);

    // The core may re-negotiate at runtime; switch formats and refresh again.
    let mut format = raw::RETRO_PIXEL_FORMAT_XRGB8888;
    assert!(unsafe {
        environment_cb(
            raw::RETRO_ENVIRONMENT_SET_PIXEL_FORMAT,
            &mut format as *mut c_uint as *mut c_void,
        )
    });
    let frame: Vec<u8> = [0u8, 0, 255, 0].repeat(4);
    unsafe { video_refresh_cb(frame.as_ptr() as *const c_void, 2, 2, 8) };
    {
        let fb = HOST.frame.lock();
        assert_eq!(&fb.pixels()[..4], [255, 0, 0, 255]);
    }
}
