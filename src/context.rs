// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文
//!
//! `RequestContext` 由 HTTP 宿主层在每个请求开始时创建、在响应发送后丢弃。
//! 路由引擎只会向其中写入两类数据：从路径模板中提取出的路径参数，
//! 以及头部修改路由追加的响应头。

use crate::param::HttpRequestMethod;
use crate::request::Request;

#[derive(Debug, Clone)]
pub struct RequestContext {
    method: HttpRequestMethod,
    /// 不含查询字符串的请求路径
    path: String,
    /// `?` 之后的原始查询字符串，不做解码
    query: Option<String>,
    accept: Option<String>,
    params: Vec<(String, String)>,
    response_headers: Vec<(String, String)>,
}

impl RequestContext {
    /// 由请求方法与请求目标（可以带查询字符串）构建上下文。
    pub fn new(method: HttpRequestMethod, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            accept: None,
            params: Vec::new(),
            response_headers: Vec::new(),
        }
    }

    pub fn with_accept(mut self, accept: Option<&str>) -> Self {
        self.accept = accept.map(|a| a.to_string());
        self
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn set_query(&mut self, query: Option<&str>) {
        self.query = query.map(|q| q.to_string());
    }

    /// 客户端是否更希望得到 JSON（用于目录列表的内容协商）
    pub fn prefers_json(&self) -> bool {
        self.accept
            .as_deref()
            .map_or(false, |a| a.contains("application/json"))
    }

    /// 写入一个路径参数。同名参数保留最后一次写入的值。
    pub fn add_param(&mut self, name: &str, value: &str) {
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.params.push((name.to_string(), value.to_string())),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// 整体替换路径参数，用于撤销放行路由写入的参数
    pub fn restore_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }

    pub fn add_response_header(&mut self, name: &str, value: &str) {
        self.response_headers
            .push((name.to_string(), value.to_string()));
    }

    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }
}

impl From<&Request> for RequestContext {
    fn from(request: &Request) -> Self {
        RequestContext::new(request.method(), request.path()).with_accept(request.accept())
    }
}
