#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod assets;
mod colors;
mod constants;
mod export_task;
mod ui;

use assets::{load_background, load_scene};
use clap::Parser;
use constants::DEFAULT_VIEWPORT;
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use export_task::ExportTask;
use pinmap::MapPanel;
use pinmap::bridge::DirectoryBridge;
use pinmap::export::ExportPipeline;
use pinmap::scene::{Group, Scene, SceneNode};
use std::path::PathBuf;
use std::sync::Arc;

/// Interactive world map panel: pan, zoom, drop markers, and export the
/// current view into a document directory.
#[derive(Parser)]
#[command(name = "pinmap", version, about)]
struct Args {
    /// Render the background as a plain bitmap instead of the interactive
    /// vector tree.
    #[arg(long)]
    safe_mode: bool,

    /// Directory standing in for the host document; exported images and the
    /// manifest are written here.
    #[arg(long)]
    document_dir: Option<PathBuf>,
}

/// Main application state for the pinmap panel.
pub struct PinmapApp {
    panel: MapPanel,
    pipeline: Option<Arc<ExportPipeline>>,
    bridge: Arc<DirectoryBridge>,
    background_texture: Option<TextureHandle>,
    scene_texture: Option<TextureHandle>,
    scene_generation: Option<u64>,
    export_task: Option<ExportTask>,
    last_export: Option<PathBuf>,
    last_viewport: egui::Vec2,
    toasts: Toasts,
}

impl PinmapApp {
    fn new(cc: &eframe::CreationContext<'_>, args: &Args) -> Self {
        let mut toasts = Toasts::new()
            .anchor(egui::Align2::RIGHT_TOP, (-10.0, 10.0))
            .direction(egui::Direction::TopDown);

        let scene = match load_scene() {
            Ok(scene) => scene,
            Err(err) => {
                toast_load_error(&mut toasts, err.to_string());
                empty_scene()
            }
        };

        let background_texture = match load_background() {
            Ok(decoded) => {
                let image = ColorImage::from_rgba_unmultiplied(
                    [decoded.width as usize, decoded.height as usize],
                    &decoded.pixels,
                );
                Some(
                    cc.egui_ctx
                        .load_texture("background", image, TextureOptions::LINEAR),
                )
            }
            Err(err) => {
                toast_load_error(&mut toasts, err.to_string());
                None
            }
        };

        let pipeline = match assets::background_png().map_err(|err| err.to_string()).and_then(
            |png| ExportPipeline::new(&png).map_err(|err| err.to_string()),
        ) {
            Ok(pipeline) => Some(Arc::new(pipeline)),
            Err(err) => {
                toast_load_error(&mut toasts, format!("export pipeline unavailable: {err}"));
                None
            }
        };

        let document_dir = args
            .document_dir
            .clone()
            .unwrap_or_else(default_document_dir);
        log::info!("document directory: {}", document_dir.display());

        Self {
            panel: MapPanel::new(scene, args.safe_mode),
            pipeline,
            bridge: Arc::new(DirectoryBridge::new(document_dir)),
            background_texture,
            scene_texture: None,
            scene_generation: None,
            export_task: None,
            last_export: None,
            last_viewport: egui::Vec2::from(DEFAULT_VIEWPORT),
            toasts,
        }
    }

    /// Polls the in-flight export, if any, and surfaces its outcome.
    fn poll_export(&mut self) {
        let Some(task) = &self.export_task else {
            return;
        };
        let Some(result) = task.poll() else {
            return;
        };
        self.export_task = None;

        match result {
            Ok(outcome) => {
                self.panel.announce("Map image added to document");
                self.last_export = Some(outcome.path);
                self.toasts.add(Toast {
                    kind: ToastKind::Success,
                    text: "View exported to document".into(),
                    options: ToastOptions::default()
                        .duration_in_seconds(4.0)
                        .show_icon(true),
                    ..Default::default()
                });
            }
            Err(err) => self.toast_error(format!("Export failed: {err}")),
        }
    }

    pub fn toast_error(&mut self, message: String) {
        self.toasts.add(Toast {
            kind: ToastKind::Error,
            text: message.into(),
            options: ToastOptions::default()
                .duration_in_seconds(8.0)
                .show_icon(true),
            ..Default::default()
        });
    }
}

impl eframe::App for PinmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_export();
        self.handle_keyboard_input(ctx);

        self.show_status_bar(ctx);
        self.show_sidebar(ctx);
        self.show_central_panel(ctx);

        self.toasts.show(ctx);
    }
}

fn toast_load_error(toasts: &mut Toasts, message: String) {
    toasts.add(Toast {
        kind: ToastKind::Error,
        text: message.into(),
        options: ToastOptions::default()
            .duration_in_seconds(10.0)
            .show_icon(true),
        ..Default::default()
    });
}

/// Blank stand-in when the embedded scene fails to load.
fn empty_scene() -> Scene {
    Scene {
        width: pinmap::export::INTRINSIC_WIDTH as f32,
        height: pinmap::export::INTRINSIC_HEIGHT as f32,
        root: SceneNode::Group(Group::default()),
    }
}

fn default_document_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pinmap-document")
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 620.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Pinmap",
        options,
        Box::new(move |cc| Ok(Box::new(PinmapApp::new(cc, &args)))),
    )
}
