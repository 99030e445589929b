// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了路由表在加载期与请求期可能产生的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：配置错误、安全错误、内部装配错误以及 HTTP 报文解析错误各自独立，
//!   调用方可以据此映射到不同的处理方式（终止启动 / 403 / 500 / 400）。
//! - **未命中不是错误**：路由未命中通过 `Resolution::NotFound` 表达，不在此处出现。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志。

use std::fmt;

/// 路由处理过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 路由配置非法：路径模板、参数名、变量、动作语法或指令有误。
    /// 只会在加载期出现，应当直接终止启动。
    Config(String),
    /// 请求路径中包含目录回溯片段（`..`）。对应 `403 Forbidden`，
    /// 绝不能被当作“未命中”继续尝试后续路由。
    PathTraversal(String),
    /// 按包路径找到了类型，但它不是一个页面控制器。说明打包出了问题，对应 `500`。
    NotAPage(String),
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了无法识别的 HTTP 方法，或请求行格式不正确。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
}

use Exception::*;

impl Exception {
    /// 宿主层应当为该异常返回的 HTTP 状态码。
    ///
    /// `Config` 在请求期理论上不会出现，若出现则按服务端错误处理。
    pub fn status_code(&self) -> u16 {
        match self {
            Config(_) | NotAPage(_) => 500,
            PathTraversal(_) => 403,
            RequestIsNotUtf8 | UnSupportedRequestMethod | UnsupportedHttpVersion => 400,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Config(msg) => write!(f, "Route configuration error: {}", msg),
            PathTraversal(path) => write!(f, "Path traversal attempt rejected: {}", path),
            NotAPage(name) => write!(f, "Type {} is registered but is not a page", name),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(Config("x".to_string()).status_code(), 500);
        assert_eq!(PathTraversal("/../etc".to_string()).status_code(), 403);
        assert_eq!(NotAPage("demo.pages.Util".to_string()).status_code(), 500);
        assert_eq!(RequestIsNotUtf8.status_code(), 400);
        assert_eq!(UnsupportedHttpVersion.status_code(), 400);
    }

    #[test]
    fn test_display_keeps_detail() {
        let e = Config("line 3: unknown directive @foo".to_string());
        assert!(e.to_string().contains("line 3"));
        let e = NotAPage("demo.pages.Helper".to_string());
        assert!(e.to_string().contains("demo.pages.Helper"));
    }
}
