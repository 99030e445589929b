// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由动作与解析结果
//!
//! 每条路由绑定一个 `RouteAction`。路径模板匹配成功后，路由表调用 `resolve`：
//! 返回 `Some(Resolution)` 表示该请求已经有了结论，返回 `None` 表示放行给后续路由。

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    context::RequestContext,
    exception::Exception,
    param::{HttpRequestMethod, DEFAULT_INDEX_FILE, DEFAULT_REDIRECT_STATUS},
    registry::{PageInstance, PageType, Registry, Router},
    resolver::{check_traversal, trailing_slash_location, PackageOutcome, PackageResolver},
    table::RouteSettings,
};

use lazy_static::lazy_static;
use log::{debug, error, warn};
use regex::{Captures, Regex};

lazy_static! {
    static ref TARGET_PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z][A-Za-z0-9_]*)?\}").unwrap();
}

/// 交给宿主层的路由结论
#[derive(Debug)]
pub enum Resolution {
    /// 一个新构造的页面实例
    Page(PageInstance),
    Redirect { location: String, status: u16 },
    Status { code: u16, message: Option<String> },
    /// 需要原样返回的静态文件
    File(PathBuf),
    /// 静态目录的文件列表
    Listing(DirectoryListing),
    /// 没有任何路由给出结论
    NotFound,
}

impl Resolution {
    pub fn status_code(&self) -> u16 {
        match self {
            Resolution::Page(_) | Resolution::File(_) | Resolution::Listing(_) => 200,
            Resolution::Redirect { status, .. } => *status,
            Resolution::Status { code, .. } => *code,
            Resolution::NotFound => 404,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryListing {
    request_path: String,
    entries: Vec<PathBuf>,
}

impl DirectoryListing {
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PathBuf> {
        self.entries
    }
}

/// `static:` 路由的根目录与选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoot {
    root: PathBuf,
    listing: bool,
    index_file: String,
}

impl StaticRoot {
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
            listing: false,
            index_file: DEFAULT_INDEX_FILE.to_string(),
        }
    }

    pub fn with_listing(mut self, listing: bool) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_index_file(mut self, index_file: &str) -> Self {
        self.index_file = index_file.to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// 解析动作时可用的只读环境
pub struct RouteEnv<'a> {
    settings: &'a RouteSettings,
    registry: &'a dyn Registry,
}

impl<'a> RouteEnv<'a> {
    pub fn new(settings: &'a RouteSettings, registry: &'a dyn Registry) -> Self {
        Self { settings, registry }
    }
}

#[derive(Clone)]
pub enum RouteAction {
    /// 固定分发到一个页面类型
    Class(PageType),
    /// 按命名空间解析页面，`redirect_status` 用于补全斜杠的重定向
    Package { root: String, redirect_status: u16 },
    /// 外部注册的自定义路由器
    Router { name: String, router: Arc<dyn Router> },
    Redirect { target: String, status: u16 },
    Status { code: u16, message: Option<String> },
    Static(StaticRoot),
    /// 追加响应头后放行
    Header { name: String, value: String },
}

impl RouteAction {
    pub fn resolve(
        &self,
        env: &RouteEnv,
        ctx: &mut RequestContext,
        suffix: Option<&str>,
    ) -> Result<Option<Resolution>, Exception> {
        match self {
            RouteAction::Class(page_type) => resolve_page(env, ctx, page_type).map(Some),
            RouteAction::Package {
                root,
                redirect_status,
            } => {
                let resolver = PackageResolver::new(env.settings, env.registry);
                match resolver.resolve(root, suffix.unwrap_or(""), ctx)? {
                    Some(PackageOutcome::Page(page_type)) => {
                        resolve_page(env, ctx, page_type).map(Some)
                    }
                    Some(PackageOutcome::Redirect(location)) => Ok(Some(Resolution::Redirect {
                        location,
                        status: *redirect_status,
                    })),
                    None => Ok(None),
                }
            }
            RouteAction::Router { name, router } => {
                debug!("路径{}交给自定义路由器{}", ctx.path(), name);
                router.route(ctx, suffix.unwrap_or(""))
            }
            RouteAction::Redirect { target, status } => Ok(Some(Resolution::Redirect {
                location: expand_target(target, ctx, suffix),
                status: *status,
            })),
            RouteAction::Status { code, message } => Ok(Some(Resolution::Status {
                code: *code,
                message: message.clone(),
            })),
            RouteAction::Static(root) => resolve_static(root, ctx, suffix.unwrap_or("")).map(Some),
            RouteAction::Header { name, value } => {
                ctx.add_response_header(name, value);
                Ok(None)
            }
        }
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAction::Class(page_type) => write!(f, "{}", page_type.name()),
            RouteAction::Package {
                root,
                redirect_status,
            } => {
                if *redirect_status == DEFAULT_REDIRECT_STATUS {
                    write!(f, "package:{}", root)
                } else {
                    write!(f, "package:{} {}", root, redirect_status)
                }
            }
            RouteAction::Router { name, .. } => write!(f, "router:{}", name),
            RouteAction::Redirect { target, status } => write!(f, "redirect:{} {}", target, status),
            RouteAction::Status { code, message } => match message {
                Some(m) => write!(f, "status:{} {}", code, m),
                None => write!(f, "status:{}", code),
            },
            RouteAction::Static(root) => {
                write!(f, "static:{}", root.root.display())?;
                if root.listing {
                    write!(f, " listing")?;
                }
                if root.index_file != DEFAULT_INDEX_FILE {
                    write!(f, " index={}", root.index_file)?;
                }
                Ok(())
            }
            RouteAction::Header { name, value } => write!(f, "@header {} {}", name, value),
        }
    }
}

impl fmt::Debug for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteAction({})", self)
    }
}

/// 构造 405 结论，并在上下文中写入 `Allow` 头
pub fn method_not_allowed(ctx: &mut RequestContext, allowed: &[HttpRequestMethod]) -> Resolution {
    let allow = allowed
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    ctx.add_response_header("Allow", &allow);
    Resolution::Status {
        code: 405,
        message: None,
    }
}

fn resolve_page(
    env: &RouteEnv,
    ctx: &mut RequestContext,
    page_type: &PageType,
) -> Result<Resolution, Exception> {
    if env.settings.method_not_allowed() && !page_type.supports_method(ctx.method()) {
        debug!("页面{}不支持{}方法", page_type.name(), ctx.method());
        return Ok(method_not_allowed(ctx, page_type.methods()));
    }
    Ok(Resolution::Page(page_type.instantiate()?))
}

/// 用路径参数替换重定向目标中的 `{name}`，`{}` 替换为终止通配符捕获的内容。
///
/// 替换后的地址不能变成指向其他主机的 `//host/...` 形式。
fn expand_target(target: &str, ctx: &RequestContext, suffix: Option<&str>) -> String {
    let location = TARGET_PLACEHOLDER
        .replace_all(target, |caps: &Captures| match caps.get(1) {
            Some(name) => ctx.param(name.as_str()).unwrap_or("").to_string(),
            None => suffix.unwrap_or("").to_string(),
        })
        .into_owned();
    let escapes_host = location.starts_with("//") || location.starts_with("/\\");
    if escapes_host && !target.starts_with("//") {
        warn!("重定向地址{}会跳转到其他主机，已合并开头的斜杠", location);
        return format!("/{}", location.trim_start_matches(['/', '\\']));
    }
    location
}

fn resolve_static(
    root: &StaticRoot,
    ctx: &RequestContext,
    suffix: &str,
) -> Result<Resolution, Exception> {
    check_traversal(suffix)?;

    let relative = suffix.trim_start_matches('/');
    if relative
        .split('/')
        .any(|segment| segment.starts_with('.'))
    {
        debug!("静态路由拒绝隐藏文件：{}", ctx.path());
        return Ok(not_found());
    }

    let full_path = root.root.join(relative);
    let metadata = match fs::metadata(&full_path) {
        Ok(m) => m,
        Err(_) => {
            debug!("静态文件{}不存在", full_path.display());
            return Ok(not_found());
        }
    };

    if metadata.is_file() {
        return Ok(Resolution::File(full_path));
    }

    if !ctx.path().ends_with('/') {
        return Ok(Resolution::Redirect {
            location: trailing_slash_location(ctx),
            status: DEFAULT_REDIRECT_STATUS,
        });
    }

    let index = full_path.join(&root.index_file);
    if index.is_file() {
        return Ok(Resolution::File(index));
    }

    if !root.listing {
        return Ok(Resolution::Status {
            code: 403,
            message: None,
        });
    }

    let entries = match fs::read_dir(&full_path) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(true, |n| n.starts_with('.'))
            })
            .collect(),
        Err(e) => {
            error!("无法读取目录{}：{}", full_path.display(), e);
            return Ok(Resolution::Status {
                code: 500,
                message: None,
            });
        }
    };

    Ok(Resolution::Listing(DirectoryListing {
        request_path: ctx.path().to_string(),
        entries,
    }))
}

fn not_found() -> Resolution {
    Resolution::Status {
        code: 404,
        message: None,
    }
}
