use std::{sync::Arc, time::Duration};

use eframe::egui::{
    self, CentralPanel, Color32, ColorImage, Context, Key, Rect, TextureHandle, TextureOptions,
};
use libretro_host::{HostKey, InputSnapshot, PointerState, Session};

/// Keyboard bindings, matching the classic frontend layout.
const KEY_BINDINGS: &[(Key, HostKey)] = &[
    (Key::ArrowUp, HostKey::Up),
    (Key::ArrowDown, HostKey::Down),
    (Key::ArrowLeft, HostKey::Left),
    (Key::ArrowRight, HostKey::Right),
    (Key::Enter, HostKey::Start),
    (Key::Z, HostKey::A),
    (Key::X, HostKey::B),
];

pub struct TinyRetroApp {
    session: Session,
    // Reused across frames to avoid per-frame allocations.
    frame_image: Arc<ColorImage>,
    texture: Option<TextureHandle>,
    last_serial: u64,
    // Where the frame was last drawn, for normalizing pointer coordinates.
    frame_rect: Rect,
    frame_interval: Duration,
}

impl TinyRetroApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, session: Session) -> Self {
        let fps = session.av_info().timing.fps;
        let frame_interval = if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::from_micros(16_667)
        };

        Self {
            session,
            frame_image: Arc::new(ColorImage::filled([1, 1], Color32::BLACK)),
            texture: None,
            last_serial: 0,
            frame_rect: Rect::NOTHING,
            frame_interval,
        }
    }

    fn capture_input(&self, ctx: &Context) -> InputSnapshot {
        let mut snapshot = InputSnapshot::default();
        ctx.input(|i| {
            for (key, control) in KEY_BINDINGS {
                if i.key_down(*key) {
                    snapshot.pressed.push(*control);
                }
            }

            if let Some(pos) = i.pointer.latest_pos() {
                let rect = self.frame_rect;
                if rect.contains(pos) && rect.width() > 0.0 && rect.height() > 0.0 {
                    snapshot.pointer = Some(PointerState {
                        x: (pos.x - rect.left()) / rect.width(),
                        y: (pos.y - rect.top()) / rect.height(),
                        pressed: i.pointer.primary_down(),
                    });
                }
            }
        });
        snapshot
    }

    fn upload_frame(&mut self, ctx: &Context) {
        let serial = self.session.frame_serial();
        if serial == self.last_serial {
            return;
        }
        self.last_serial = serial;

        self.session.with_frame(|frame| {
            if frame.width() == 0 || frame.height() == 0 {
                return;
            }
            let size = [frame.width() as usize, frame.height() as usize];
            blit_rgba(Arc::make_mut(&mut self.frame_image), size, frame.pixels());
        });

        match &mut self.texture {
            Some(texture) => texture.set(self.frame_image.clone(), TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture(
                    "framebuffer",
                    self.frame_image.clone(),
                    TextureOptions::NEAREST,
                ));
            }
        }
    }
}

/// Writes tightly packed RGBA8 bytes into `image`, reallocating only when
/// the dimensions changed.
fn blit_rgba(image: &mut ColorImage, size: [usize; 2], rgba: &[u8]) {
    if image.size != size {
        *image = ColorImage::filled(size, Color32::BLACK);
    }
    for (dst, src) in image.pixels.iter_mut().zip(rgba.chunks_exact(4)) {
        *dst = Color32::from_rgba_unmultiplied(src[0], src[1], src[2], src[3]);
    }
}

impl eframe::App for TinyRetroApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(Key::Escape) || i.key_pressed(Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        let snapshot = self.capture_input(ctx);
        self.session.run_frame(snapshot);
        self.upload_frame(ctx);

        CentralPanel::default()
            .frame(egui::Frame::NONE.fill(Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    let response =
                        ui.add(egui::Image::new(texture).fit_to_exact_size(ui.available_size()));
                    self.frame_rect = response.rect;
                }
            });

        ctx.request_repaint_after(self.frame_interval);
    }
}
