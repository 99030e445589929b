// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # MIME 类型服务
//!
//! 文件后缀名到 MIME 类型（Media Type）的映射表，用于设置响应头中的 `Content-Type` 字段。
//!
//! 该表在启动时构造一次，随后以参数形式传递给响应构建器，不存在进程级的全局可变状态。
//! 配置文件中的 `[mime]` 表可以覆盖或补充默认条目。

use std::collections::HashMap;
use std::path::Path;

/// 无法识别后缀时使用的兜底类型
pub const FALLBACK_MIME: &str = "application/octet-stream";

const DEFAULT_TYPES: &[(&str, &str)] = &[
    ("aac", "audio/aac"),
    ("avif", "image/avif"),
    ("bin", "application/octet-stream"),
    ("bmp", "image/bmp"),
    ("css", "text/css;charset=utf-8"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("eot", "application/vnd.ms-fontobject"),
    ("epub", "application/epub+zip"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html;charset=utf-8"),
    ("html", "text/html;charset=utf-8"),
    ("ico", "image/x-icon"),
    ("ics", "text/calendar"),
    ("jar", "application/java-archive"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript;charset=utf-8"),
    ("json", "application/json"),
    ("jsonld", "application/ld+json"),
    ("mjs", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("oga", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("rtf", "application/rtf"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xhtml", "application/xhtml+xml"),
    ("xml", "text/xml"),
    ("zip", "application/zip"),
    ("7z", "application/x-7z-compressed"),
];

#[derive(Debug, Clone)]
pub struct MimeTypes {
    types: HashMap<String, String>,
}

impl MimeTypes {
    pub fn new() -> Self {
        let types = DEFAULT_TYPES
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect();
        Self { types }
    }

    /// 在默认表的基础上叠加自定义映射。后缀名统一按小写存储。
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut mime = Self::new();
        for (ext, value) in overrides {
            mime.insert(ext, value);
        }
        mime
    }

    pub fn insert(&mut self, extension: &str, mime: &str) {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.types.insert(ext, mime.to_string());
    }

    pub fn get(&self, extension: &str) -> &str {
        match self.types.get(&extension.to_lowercase()) {
            Some(v) => v,
            None => FALLBACK_MIME,
        }
    }

    pub fn for_path(&self, path: &Path) -> &str {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.get(ext),
            None => FALLBACK_MIME,
        }
    }
}

impl Default for MimeTypes {
    fn default() -> Self {
        Self::new()
    }
}
