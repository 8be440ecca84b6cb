// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod image_store;

pub use image_store::{DecodedImage, ImageStoreError, decode_data_uri, is_data_uri, save_data_uri};
