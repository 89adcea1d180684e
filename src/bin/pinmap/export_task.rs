//! Background export worker.
//!
//! The export flow (rasterize, encode, upload, insert) runs off the UI
//! thread; the outcome comes back over a channel, mirroring how assets are
//! loaded. Only one export runs at a time — the UI rejects a second request
//! while one is in flight. If the app is torn down mid-export the worker
//! finishes on its own and its result is discarded with the channel.

use eframe::egui;
use pinmap::bridge::{AssetRef, DirectoryBridge, HostBridge, upload_and_insert};
use pinmap::export::ExportPipeline;
use pinmap::geometry::ViewTransform;
use pinmap::panel::ExportFlowError;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;

/// What the worker renders: serialized vector text (vector/pristine modes)
/// or the background bitmap through the view transform (safe mode).
pub enum ExportSource {
    Svg(String),
    Bitmap(ViewTransform),
}

/// A finished export, with the document-side path of the inserted asset.
pub struct ExportOutcome {
    pub asset: AssetRef,
    pub path: PathBuf,
}

/// Handle to the in-flight export.
pub struct ExportTask {
    outcome_rx: mpsc::Receiver<Result<ExportOutcome, String>>,
}

impl ExportTask {
    /// Spawns the worker and returns immediately.
    pub fn start(
        source: ExportSource,
        viewport: (u32, u32),
        pipeline: Arc<ExportPipeline>,
        bridge: Arc<DirectoryBridge>,
        alt_text: String,
        ctx: egui::Context,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();

        thread::spawn(move || {
            let result = run_export(source, viewport, &pipeline, &bridge, &alt_text)
                .map_err(|err| err.to_string());
            let _ = outcome_tx.send(result);
            ctx.request_repaint();
        });

        Self { outcome_rx }
    }

    /// Non-blocking poll; `Some` exactly once when the worker is done.
    pub fn poll(&self) -> Option<Result<ExportOutcome, String>> {
        match self.outcome_rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                Some(Err("export worker disconnected".to_string()))
            }
        }
    }
}

fn run_export(
    source: ExportSource,
    viewport: (u32, u32),
    pipeline: &ExportPipeline,
    bridge: &Arc<DirectoryBridge>,
    alt_text: &str,
) -> Result<ExportOutcome, ExportFlowError> {
    let image = match source {
        ExportSource::Svg(svg) => ExportPipeline::export_svg(&svg, viewport)?,
        ExportSource::Bitmap(transform) => pipeline.export_view(transform, viewport)?,
    };

    let asset = upload_and_insert(bridge.as_ref(), &image, alt_text)?;
    let path = bridge.asset_path(&asset);
    log::info!("exported {}x{} view to {}", image.width, image.height, path.display());

    Ok(ExportOutcome { asset, path })
}
