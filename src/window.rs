use std::sync::Arc;

use winit::window::Window as WinitWindow;

use crate::control_loop::FrameScheduler;

/// Wrapper around winit Window; its redraw request is the next-tick primitive
#[derive(Clone)]
pub struct Window {
    inner: Arc<WinitWindow>,
}

impl Window {
    pub fn new(window: Arc<WinitWindow>) -> Self {
        Self { inner: window }
    }

    pub fn inner(&self) -> &Arc<WinitWindow> {
        &self.inner
    }

    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    pub fn inner_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.inner.inner_size()
    }
}

impl FrameScheduler for Window {
    fn request_next_tick(&self) {
        self.request_redraw();
    }
}
