//! egui overlay: the parameter panel and the FPS readout.

use winit::window::Window;

use crate::controls::{Controls, FIRE_HEIGHT_RANGE, SPEED_RANGE, TESSELLATION_RANGE};
use crate::shader::Shading;

/// Draw the parameter panel and the FPS readout
pub fn show(ctx: &egui::Context, controls: &mut Controls, fps: f32) {
    egui::Window::new("FPS")
        .title_bar(false)
        .resizable(false)
        .fixed_pos(egui::pos2(10.0, 10.0))
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("{:.0}", fps))
                    .size(48.0)
                    .color(egui::Color32::from_rgb(74, 158, 255)),
            );
            ui.label(egui::RichText::new("FPS").size(12.0).color(egui::Color32::GRAY));
        });

    egui::Window::new("Controls")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| controls_panel(ui, controls));
}

pub fn controls_panel(ui: &mut egui::Ui, controls: &mut Controls) {
    ui.add(egui::Slider::new(&mut controls.tessellations, TESSELLATION_RANGE).text("tessellations"));
    ui.add(egui::Slider::new(&mut controls.speed, SPEED_RANGE).text("speed"));
    ui.add(egui::Slider::new(&mut controls.fire_height, FIRE_HEIGHT_RANGE).text("fireHeight"));

    ui.horizontal(|ui| {
        ui.color_edit_button_srgba_unmultiplied(&mut controls.color);
        ui.label("color");
    });

    ui.horizontal(|ui| {
        for shading in Shading::ALL {
            ui.radio_value(&mut controls.shading, shading, shading.label());
        }
    });

    if ui.button("Load Scene").clicked() {
        controls.request_reload();
    }
}

/// Tessellated overlay waiting to be painted into the frame
pub struct OverlayFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen: egui_wgpu::ScreenDescriptor,
}

pub struct Overlay {
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    /// Returns true when egui consumed the event
    pub fn handle_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }

    /// Run the UI for this frame; edits land in `controls` immediately
    pub fn run(&mut self, window: &Window, controls: &mut Controls, fps: f32, size: (u32, u32)) -> OverlayFrame {
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| show(ctx, controls, fps));

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());

        OverlayFrame {
            primitives,
            textures_delta: full_output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [size.0, size.1],
                pixels_per_point: window.scale_factor() as f32,
            },
        }
    }

    /// Paint a prepared overlay on top of `view`
    pub fn paint(
        &mut self,
        frame: OverlayFrame,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        for (id, image_delta) in &frame.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &frame.primitives, &frame.screen);

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &frame.primitives, &frame.screen);
        }

        for id in &frame.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    /// Throw away a prepared overlay without painting, keeping egui's textures in sync
    pub fn discard(&mut self, frame: OverlayFrame, device: &wgpu::Device, queue: &wgpu::Queue) {
        for (id, image_delta) in &frame.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        for id in &frame.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_once(controls: &mut Controls) {
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| show(ctx, controls, 60.0));
    }

    #[test]
    fn panel_without_input_leaves_controls_untouched() {
        let mut controls = Controls::default();
        run_once(&mut controls);
        assert_eq!(controls, Controls::default());
    }

    #[test]
    fn panel_preserves_current_values() {
        let mut controls = Controls {
            speed: 3.5,
            shading: Shading::Lambert,
            ..Controls::default()
        };
        run_once(&mut controls);
        assert_eq!(controls.speed, 3.5);
        assert_eq!(controls.shading, Shading::Lambert);
    }
}
