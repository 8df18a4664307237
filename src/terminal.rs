// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based camera viewer
//!
//! Renders the live feed with the landmark overlay to the terminal using
//! Unicode half-block characters for improved vertical resolution. The
//! bottom two lines show the readouts and the available keys.

use crate::app::{CameraApp, ControlState, Readouts};
use crate::backends::camera::types::CameraFrame;
use crate::media::canvas::{self, Canvas};
use crate::pipelines::artifact::CaptureArtifact;
use crate::pipelines::video::RecordToggle;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::{error, info};

/// Run the viewer until the user quits or a QR code navigates away
///
/// Returns the URL when the session ended by navigation. The app must
/// already be started; shutting it down is left to the caller.
pub async fn run(app: &mut CameraApp) -> Result<Option<String>, Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut CameraApp,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut show_help = false;
    let mut message = String::new();

    loop {
        if let Some(url) = app.poll_navigation().await {
            info!(url = %url, "Leaving viewer after navigation");
            return Ok(Some(url));
        }

        let controls = app.controls();
        let info_line = build_info_line(
            app.readouts(),
            &controls,
            app.recorder().elapsed(),
        );
        let key_line = if !message.is_empty() {
            message.clone()
        } else if show_help {
            build_help_message(&controls)
        } else {
            build_key_message(&controls)
        };

        {
            let frame = app.session().video().current_frame();
            let overlay = canvas::read(app.session().overlay());
            let widget = FrameWidget {
                frame: frame.as_deref(),
                overlay: &overlay,
            };

            terminal.draw(|f| {
                let area = f.area();

                // Reserve bottom two lines for status
                let camera_area = Rect {
                    height: area.height.saturating_sub(2),
                    ..area
                };
                f.render_widget(&widget, camera_area);

                let info_area = Rect {
                    x: area.x,
                    y: area.height.saturating_sub(2),
                    width: area.width,
                    height: 1,
                };
                f.render_widget(
                    StatusBar {
                        message: &info_line,
                        background: Color::Black,
                    },
                    info_area,
                );

                let key_area = Rect {
                    x: area.x,
                    y: area.height.saturating_sub(1),
                    width: area.width,
                    height: 1,
                };
                f.render_widget(
                    StatusBar {
                        message: &key_line,
                        background: Color::DarkGray,
                    },
                    key_area,
                );
            })?;
        }

        // Handle input with timeout for frame updates
        let key = if event::poll(Duration::from_millis(16))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            key
        } else {
            continue;
        };

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(None);
        }

        message.clear();
        match key.code {
            KeyCode::Char('q') => return Ok(None),
            KeyCode::Char('h') => show_help = !show_help,
            KeyCode::Char('s') if controls.switch_enabled => {
                show_help = false;
                if app.switch_camera().await.is_ok()
                    && let Some(device) = app.devices().current()
                {
                    message = format!("Camera: {}", device.label);
                }
            }
            KeyCode::Char('f') if controls.flash_enabled => {
                if let Ok(on) = app.toggle_flash() {
                    message = format!("Flash {}", if on { "on" } else { "off" });
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') if controls.zoom_enabled => {
                if let Ok(level) = app.zoom_in() {
                    message = format!("Zoom {:.1}x", level);
                }
            }
            KeyCode::Char('-') if controls.zoom_enabled => {
                if let Ok(level) = app.zoom_out() {
                    message = format!("Zoom {:.1}x", level);
                }
            }
            KeyCode::Char('p') => {
                if let Ok(photo) = app.capture_photo() {
                    message = save_message(app, &photo).await;
                }
            }
            KeyCode::Char('r') => match app.toggle_record().await {
                Ok(RecordToggle::Started) => message = "Recording...".to_string(),
                Ok(RecordToggle::Stopped(video)) => message = save_message(app, &video).await,
                Err(_) => {}
            },
            _ => {}
        }
    }
}

async fn save_message(app: &CameraApp, artifact: &CaptureArtifact) -> String {
    match app.save_artifact(artifact).await {
        Ok(path) => format!("Saved: {}", path.display()),
        Err(e) => {
            error!(error = %e, "Failed to save capture");
            format!("Error: {}", e)
        }
    }
}

fn build_info_line(
    readouts: &Readouts,
    controls: &ControlState,
    recording: Option<Duration>,
) -> String {
    let mut line = format!("Eyes: {}", readouts.detected.get());

    let qr = readouts.qr.get();
    if !qr.is_empty() {
        line.push_str(&format!(" | QR: {}", qr));
    }
    if let Some(level) = controls.zoom_level {
        line.push_str(&format!(" | {:.1}x", level));
    }
    if controls.torch_on {
        line.push_str(" | Flash");
    }
    if let Some(elapsed) = recording {
        let secs = elapsed.as_secs();
        line.push_str(&format!(" | REC {:02}:{:02}", secs / 60, secs % 60));
    }

    let error = readouts.error.get();
    if !error.is_empty() {
        line.push_str(&format!(" | {}", error));
    }
    line
}

fn build_key_message(controls: &ControlState) -> String {
    let mut msg = "'p' photo | 'r' record".to_string();
    if controls.switch_enabled {
        msg.push_str(" | 's' switch");
    }
    if controls.flash_enabled {
        msg.push_str(" | 'f' flash");
    }
    if controls.zoom_enabled {
        msg.push_str(" | '+/-' zoom");
    }
    msg.push_str(" | 'h' help | 'q' quit");
    msg
}

fn build_help_message(controls: &ControlState) -> String {
    let mut msg = String::from("p: Take photo | r: Start/stop recording | ");
    if controls.switch_enabled {
        msg.push_str("s: Switch camera | ");
    }
    if controls.flash_enabled {
        msg.push_str("f: Toggle flash | ");
    }
    if controls.zoom_enabled {
        msg.push_str("+/-: Zoom | ");
    }
    msg.push_str("h: Toggle help | q/Ctrl+C: Quit");
    msg
}

/// Widget that renders a camera frame and its overlay using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    overlay: &'a Canvas,
}

impl Widget for &FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|frame| !frame.is_empty()) else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let top = self.sample(frame, src_x, src_y_top);
                let bottom = self.sample(frame, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

impl FrameWidget<'_> {
    /// Frame pixel at (`x`, `y`) with the overlay blended on top
    fn sample(&self, frame: &CameraFrame, x: u32, y: u32) -> Color {
        let (r, g, b) = sample_frame(frame, x, y);

        let (ow, oh) = self.overlay.dimensions();
        if ow == 0 || oh == 0 {
            return Color::Rgb(r, g, b);
        }
        let ox = (x as u64 * ow as u64 / frame.width as u64).min(ow as u64 - 1) as u32;
        let oy = (y as u64 * oh as u64 / frame.height as u64).min(oh as u64 - 1) as u32;
        let [or, og, ob, oa] = self.overlay.image().get_pixel(ox, oy).0;
        if oa == 0 {
            return Color::Rgb(r, g, b);
        }

        let blend = |base: u8, top: u8| -> u8 {
            ((top as u32 * oa as u32 + base as u32 * (255 - oa as u32)) / 255) as u8
        };
        Color::Rgb(blend(r, or), blend(g, og), blend(b, ob))
    }
}

fn sample_frame(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let idx = (y * frame.stride + x * 4) as usize;
    match frame.data.get(idx..idx + 3) {
        Some(&[r, g, b]) => (r, g, b),
        _ => (0, 0, 0),
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    background: Color,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(self.background);
            }
        }

        // QR payloads can hold any text, so truncate on char boundaries
        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(self.background),
        );
    }
}
