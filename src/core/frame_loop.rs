use std::time::Instant;

use crate::error::PipelineError;

const FPS_REPORT_INTERVAL: f32 = 1.0;

/// Something that can draw one frame per host tick
pub trait FrameRenderer {
    /// Draw a single frame; must not block on readback
    fn render_frame(&mut self) -> Result<(), PipelineError>;
}

/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    pub time: f32,
    pub delta: f32,
}

/// Cooperative frame driver
///
/// The host calls [`FrameLoop::tick`] once per display refresh. The first
/// render error is logged and stops the loop; later ticks are no-ops until
/// [`FrameLoop::restart`].
#[derive(Debug)]
pub struct FrameLoop {
    running: bool,
    frame_number: u64,
    start_time: Instant,
    last_tick: Instant,
    fps_frames: u32,
    fps_elapsed: f32,
    fps: f32,
    last_error: Option<String>,
}

impl FrameLoop {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            running: true,
            frame_number: 0,
            start_time: now,
            last_tick: now,
            fps_frames: 0,
            fps_elapsed: 0.0,
            fps: 0.0,
            last_error: None,
        }
    }

    /// Render one frame if the loop is still running
    pub fn tick<R: FrameRenderer + ?Sized>(&mut self, renderer: &mut R) -> Option<FrameInfo> {
        if !self.running {
            return None;
        }

        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        if let Err(e) = renderer.render_frame() {
            log::error!("Frame {} failed, stopping render loop: {}", self.frame_number, e);
            self.running = false;
            self.last_error = Some(e.to_string());
            return None;
        }

        self.update_fps(delta);
        let info = FrameInfo {
            number: self.frame_number,
            time: now.duration_since(self.start_time).as_secs_f32(),
            delta,
        };
        self.frame_number += 1;
        Some(info)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resume after a halt (e.g. once a new image has been loaded)
    pub fn restart(&mut self) {
        self.running = true;
        self.last_error = None;
        self.last_tick = Instant::now();
    }

    /// Stop without an error
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn frames(&self) -> u64 {
        self.frame_number
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Message of the error that halted the loop
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn update_fps(&mut self, delta: f32) {
        self.fps_frames += 1;
        self.fps_elapsed += delta;

        if self.fps_elapsed >= FPS_REPORT_INTERVAL {
            self.fps = self.fps_frames as f32 / self.fps_elapsed;
            log::debug!("FPS: {:.1}", self.fps);
            self.fps_frames = 0;
            self.fps_elapsed = 0.0;
        }
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}
