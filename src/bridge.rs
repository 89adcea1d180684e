//! Host bridge contract: upload an exported image, then insert a reference to
//! it into the host document.
//!
//! The host itself is opaque; only the request/response shapes are defined
//! here. Failures propagate to the caller and are never retried. A failed
//! insert may leave the uploaded asset orphaned on the host side, but nothing
//! local references it.

use crate::export::ExportedImage;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("upload rejected: {0}")]
    Upload(String),
    #[error("insert rejected: {0}")]
    Insert(String),
    #[error("document io: {0}")]
    Io(#[from] std::io::Error),
    #[error("document manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Disclosure of how an uploaded image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    AppGenerated,
    UserProvided,
}

/// Upload payload. `data` and `thumbnail` are `data:` URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub kind: String,
    pub mime_type: String,
    pub data: String,
    pub thumbnail: String,
    pub provenance: Provenance,
}

impl UploadRequest {
    pub fn image(data: String, thumbnail: String, provenance: Provenance) -> Self {
        Self {
            kind: "image".to_string(),
            mime_type: "image/png".to_string(),
            data,
            thumbnail,
            provenance,
        }
    }
}

/// Opaque reference token returned by the host for an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef(pub String);

pub trait HostBridge {
    fn upload_image(&self, request: &UploadRequest) -> Result<AssetRef, BridgeError>;
    fn insert_element(&self, asset: &AssetRef, alt_text: &str) -> Result<(), BridgeError>;
}

/// Uploads an exported image and inserts it into the document. Either call
/// failing aborts the flow; no partial local state is left behind.
pub fn upload_and_insert(
    bridge: &dyn HostBridge,
    image: &ExportedImage,
    alt_text: &str,
) -> Result<AssetRef, BridgeError> {
    let request = UploadRequest::image(
        image.data_url(),
        image.thumbnail_data_url(),
        Provenance::AppGenerated,
    );
    let asset = bridge.upload_image(&request)?;
    bridge.insert_element(&asset, alt_text)?;
    Ok(asset)
}

/// One inserted element of the stand-in document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub asset: AssetRef,
    pub alt_text: String,
}

/// Stand-in host: a directory is the "document". Uploads land as PNG files
/// and inserts append entries to a `document.json` manifest next to them.
pub struct DirectoryBridge {
    root: PathBuf,
}

impl DirectoryBridge {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Where the PNG for an uploaded asset lives.
    pub fn asset_path(&self, asset: &AssetRef) -> PathBuf {
        self.root.join(format!("{}.png", asset.0))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("document.json")
    }
}

impl HostBridge for DirectoryBridge {
    fn upload_image(&self, request: &UploadRequest) -> Result<AssetRef, BridgeError> {
        let bytes = decode_data_url(&request.data).map_err(BridgeError::Upload)?;
        fs::create_dir_all(&self.root)?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        let asset = AssetRef(format!("asset-{nanos:x}"));
        fs::write(self.asset_path(&asset), bytes)?;
        Ok(asset)
    }

    fn insert_element(&self, asset: &AssetRef, alt_text: &str) -> Result<(), BridgeError> {
        let path = self.manifest_path();
        let mut entries: Vec<DocumentEntry> = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(_) => Vec::new(),
        };
        entries.push(DocumentEntry {
            asset: asset.clone(),
            alt_text: alt_text.to_string(),
        });
        fs::write(&path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(())
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    let encoded = url
        .strip_prefix("data:image/png;base64,")
        .ok_or_else(|| "unsupported payload encoding".to_string())?;
    BASE64.decode(encoded).map_err(|err| err.to_string())
}

/// In-memory bridge that records every call; used by tests and headless runs.
#[derive(Default)]
pub struct RecordingBridge {
    pub uploads: RefCell<Vec<UploadRequest>>,
    pub inserts: RefCell<Vec<(AssetRef, String)>>,
    pub reject_uploads: Cell<bool>,
    pub reject_inserts: Cell<bool>,
}

impl HostBridge for RecordingBridge {
    fn upload_image(&self, request: &UploadRequest) -> Result<AssetRef, BridgeError> {
        if self.reject_uploads.get() {
            return Err(BridgeError::Upload("rejected by host".to_string()));
        }
        let mut uploads = self.uploads.borrow_mut();
        uploads.push(request.clone());
        Ok(AssetRef(format!("asset-{}", uploads.len())))
    }

    fn insert_element(&self, asset: &AssetRef, alt_text: &str) -> Result<(), BridgeError> {
        if self.reject_inserts.get() {
            return Err(BridgeError::Insert("rejected by host".to_string()));
        }
        self.inserts
            .borrow_mut()
            .push((asset.clone(), alt_text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportedImage;

    fn tiny_image() -> ExportedImage {
        // 1x1 transparent PNG
        let png = image_bytes();
        ExportedImage {
            thumbnail: png.clone(),
            png,
            width: 1,
            height: 1,
        }
    }

    fn image_bytes() -> Vec<u8> {
        let image = image::RgbaImage::new(1, 1);
        let mut cursor = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .expect("png encodes");
        cursor.into_inner()
    }

    #[test]
    fn upload_request_wire_shape() {
        let request = UploadRequest::image(
            "data:image/png;base64,AAAA".to_string(),
            "data:image/png;base64,AAAA".to_string(),
            Provenance::AppGenerated,
        );
        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(json["kind"], "image");
        assert_eq!(json["mime_type"], "image/png");
        assert_eq!(json["provenance"], "app_generated");
    }

    #[test]
    fn upload_then_insert_order_and_payload() {
        let bridge = RecordingBridge::default();
        let asset =
            upload_and_insert(&bridge, &tiny_image(), "World map view").expect("flow succeeds");

        let uploads = bridge.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].data.starts_with("data:image/png;base64,"));

        let inserts = bridge.inserts.borrow();
        assert_eq!(inserts.as_slice(), [(asset, "World map view".to_string())]);
    }

    #[test]
    fn failed_upload_skips_insert() {
        let bridge = RecordingBridge::default();
        bridge.reject_uploads.set(true);

        let result = upload_and_insert(&bridge, &tiny_image(), "alt");
        assert!(matches!(result, Err(BridgeError::Upload(_))));
        assert!(bridge.inserts.borrow().is_empty());
    }

    #[test]
    fn directory_bridge_writes_asset_and_manifest() {
        let dir = tempfile::tempdir().expect("temp dir");
        let bridge = DirectoryBridge::new(dir.path().join("document"));

        let asset = upload_and_insert(&bridge, &tiny_image(), "World map view with 1 marker")
            .expect("flow succeeds");

        let stored = std::fs::read(bridge.asset_path(&asset)).expect("asset written");
        assert_eq!(stored, image_bytes());

        let manifest = std::fs::read(bridge.root().join("document.json")).expect("manifest");
        let entries: Vec<DocumentEntry> = serde_json::from_slice(&manifest).expect("parses");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].asset, asset);
        assert_eq!(entries[0].alt_text, "World map view with 1 marker");
    }
}
