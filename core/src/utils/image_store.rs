// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Persistence of `data:` URI image results.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use log::info;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Not a data URI")]
    NotDataUri,
    #[error("Unsupported data URI encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes carried by a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

/// Decode `data:<mime>;base64,<payload>`
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, ImageStoreError> {
    let rest = uri.strip_prefix("data:").ok_or(ImageStoreError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageStoreError::NotDataUri)?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default().trim().to_lowercase();
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(ImageStoreError::UnsupportedEncoding(header.to_string()));
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned)?;

    Ok(DecodedImage { mime_type, bytes })
}

/// Decode a `data:` URI and write it under `dir` with a timestamped name.
/// Never overwrites: a name already taken gets a numeric suffix. Returns the
/// written path.
pub fn save_data_uri(uri: &str, dir: &Path) -> Result<PathBuf, ImageStoreError> {
    let image = decode_data_uri(uri)?;
    std::fs::create_dir_all(dir)?;

    let stamp = Local::now().format("%Y%m%d%H%M%S%3f").to_string();
    let mut suffix = 0u32;
    let (path, mut file) = loop {
        let filename = match suffix {
            0 => format!("image_{}.{}", stamp, image.extension()),
            n => format!("image_{}_{}.{}", stamp, n, image.extension()),
        };
        let path = dir.join(filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e.into()),
        }
    };
    file.write_all(&image.bytes)?;

    info!("Saved {} bytes of {} to {}", image.bytes.len(), image.mime_type, path.display());
    Ok(path)
}
