// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{
    action::{DirectoryListing, Resolution},
    context::RequestContext,
    exception::Exception,
    mime::MimeTypes,
    param::*,
    util::{format_file_size, HtmlBuilder},
};

use bytes::Bytes;
use chrono::prelude::*;
use log::{debug, error};

use std::{fs, path::Path};

const HTML_TYPE: &str = "text/html;charset=utf-8";

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    server_name: String,
    location: Option<String>,
    headers: Vec<(String, String)>,
    content: Option<Bytes>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            location: None,
            headers: Vec::new(),
            content: None,
        }
    }

    /// 把路由结论转换为完整的 HTTP 响应。
    ///
    /// 页面实例在这里被调用；HEAD 请求保留 `Content-Length` 但不携带正文。
    pub fn from_resolution(
        resolution: Resolution,
        ctx: &RequestContext,
        mime: &MimeTypes,
        id: u128,
    ) -> Self {
        let headonly = ctx.method() == HttpRequestMethod::Head;
        let mut response = match resolution {
            Resolution::Page(mut page) => {
                debug!("[ID{}]调用页面{}", id, page.type_name());
                let html = page.handle(ctx);
                Self::from_html(&html)
            }
            Resolution::Redirect { location, status } => Self::from_redirect(&location, status),
            Resolution::Status { code, message } => {
                Self::from_status_code(code, message.as_deref())
            }
            Resolution::File(path) => Self::from_file(&path, mime, id),
            Resolution::Listing(listing) => Self::from_listing(listing, ctx.prefers_json(), id),
            Resolution::NotFound => Self::from_status_code(404, None),
        };
        for (name, value) in ctx.response_headers() {
            response.headers.push((name.clone(), value.clone()));
        }
        if headonly {
            response.content = None;
        }
        response.set_date();
        response
    }

    /// 路由过程中产生的异常对应的响应
    pub fn from_exception(e: &Exception) -> Self {
        let note = match e {
            Exception::PathTraversal(_) => Some("请求的路径不被允许。"),
            _ => None,
        };
        let mut response = Self::from_status_code(e.status_code(), note);
        response.set_date();
        response
    }

    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let mut response = Self::new();
        if code == 204 || code == 304 {
            response.set_code(code);
            return response;
        }
        let content = match code {
            404 => HtmlBuilder::from_status_code(404, note.or(Some("你指定的网页无法找到。"))),
            405 => HtmlBuilder::from_status_code(405, note.or(Some("该地址不接受当前的请求方法。"))),
            500 => HtmlBuilder::from_status_code(500, note.or(Some("服务器出现了一个内部错误。"))),
            _ => HtmlBuilder::from_status_code(code, note),
        }
        .build();
        response.set_content(Bytes::from(content), HTML_TYPE);
        response.set_code(code);
        response
    }

    pub fn from_redirect(location: &str, status: u16) -> Self {
        let mut response = Self::new();
        response.location = Some(location.to_string());
        response.set_code(status);
        response
    }

    fn from_html(html: &str) -> Self {
        let mut response = Self::new();
        response.set_content(Bytes::from(html.to_string()), HTML_TYPE);
        response
    }

    fn from_file(path: &Path, mime: &MimeTypes, id: u128) -> Self {
        match fs::read(path) {
            Ok(contents) => {
                let mut response = Self::new();
                let content_type = mime.for_path(path);
                debug!("[ID{}]读取文件{}，MIME类型{}", id, path.display(), content_type);
                response.set_content(Bytes::from(contents), content_type);
                response
            }
            Err(e) => {
                error!("[ID{}]无法读取文件{}：{}", id, path.display(), e);
                Self::from_status_code(500, None)
            }
        }
    }

    fn from_listing(listing: DirectoryListing, is_json: bool, id: u128) -> Self {
        let request_path = listing.request_path().to_string();
        let mut entries = listing.into_entries();
        debug!("[ID{}]生成目录{}的文件列表，共{}项", id, request_path, entries.len());
        let mut response = Self::new();
        if is_json {
            let json_struct: Vec<_> = entries
                .iter()
                .map(|p| {
                    let meta = fs::metadata(p).ok();
                    let is_dir = p.is_dir();
                    let size = meta.as_ref().map(|m| m.len()).unwrap_or(0);
                    let modified = meta
                        .as_ref()
                        .and_then(|m| m.modified().ok())
                        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                        .unwrap_or_default();
                    let size_str = format_file_size(size);
                    serde_json::json!({
                        "name": p.file_name().and_then(|n| n.to_str()).unwrap_or(""),
                        "type": if is_dir { "dir" } else { "file" },
                        "size": if is_dir { "-" } else { size_str.as_str() },
                        "raw_size": size,
                        "date": modified
                    })
                })
                .collect();
            match serde_json::to_vec(&json_struct) {
                Ok(body) => response.set_content(Bytes::from(body), "application/json"),
                Err(e) => {
                    error!("[ID{}]目录列表序列化失败：{}", id, e);
                    return Self::from_status_code(500, None);
                }
            }
        } else {
            let content = HtmlBuilder::from_dir(&request_path, &mut entries).build();
            response.set_content(Bytes::from(content), HTML_TYPE);
        }
        response
    }

    fn set_content(&mut self, content: Bytes, content_type: &str) {
        self.content_length = content.len() as u64;
        self.content_type = Some(content_type.to_string());
        self.content = Some(content);
    }

    fn set_date(&mut self) -> &mut Self {
        self.date = Utc::now();
        self
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                debug!("状态码{}没有标准原因短语", code);
                "Unknown".to_string()
            }
        };
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let mut header = [
            version,
            " ",
            &self.status_code.to_string(),
            " ",
            &self.information,
            CRLF,
        ]
        .concat();
        if let Some(t) = &self.content_type {
            header.push_str(&["Content-Type: ", t, CRLF].concat());
        }
        header.push_str(&["Content-Length: ", &self.content_length.to_string(), CRLF].concat());
        header.push_str(&["Date: ", &format_date(&self.date), CRLF].concat());
        header.push_str(&["Server: ", &self.server_name, CRLF].concat());
        if let Some(l) = &self.location {
            header.push_str(&["Location: ", l, CRLF].concat());
        }
        for (name, value) in &self.headers {
            header.push_str(&[name.as_str(), ": ", value, CRLF].concat());
        }
        header.push_str(CRLF);
        [
            header.as_bytes(),
            match &self.content {
                Some(c) => c,
                None => b"",
            },
        ]
        .concat()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
