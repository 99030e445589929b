// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 包路由解析器
//!
//! 将终止通配符捕获到的剩余路径映射为命名空间下的页面类型全限定名：
//! `/subdir/report.html` 在根命名空间 `demo.pages` 下对应 `demo.pages.subdir.report`。
//!
//! ## 解析规则
//! 1. 含 `..` 片段的路径直接拒绝（`PathTraversal`），不会落入“未命中”。
//! 2. 以 `/` 结尾或为空的路径视为目录访问，只查找索引页。
//! 3. 配置了页面后缀时，只有带后缀的叶子路径才会做直接查找；不带后缀的叶子路径只能命中索引页。
//! 4. 以 `$` 开头的片段是私有的，永远不会被解析。
//! 5. 查找结果必须与候选名逐字相等，大小写不同视为未找到。
//! 6. 通过索引页命中、但请求路径不以 `/` 结尾时，返回补全斜杠的重定向（保留查询字符串）。

use crate::{
    context::RequestContext,
    exception::Exception,
    registry::{PageType, Registry},
    table::RouteSettings,
};

use log::{debug, warn};

/// 包路由的解析结果
#[derive(Debug)]
pub enum PackageOutcome<'a> {
    Page(&'a PageType),
    /// 目录式访问缺少结尾的斜杠，需要重定向到该地址
    Redirect(String),
}

pub struct PackageResolver<'a> {
    settings: &'a RouteSettings,
    registry: &'a dyn Registry,
}

impl<'a> PackageResolver<'a> {
    pub fn new(settings: &'a RouteSettings, registry: &'a dyn Registry) -> Self {
        Self { settings, registry }
    }

    pub fn resolve(
        &self,
        root: &str,
        suffix: &str,
        ctx: &RequestContext,
    ) -> Result<Option<PackageOutcome<'a>>, Exception> {
        check_traversal(suffix)?;

        let directory = suffix.is_empty() || suffix.ends_with('/');
        let mut name = suffix.strip_suffix('/').unwrap_or(suffix).to_string();
        let page_suffix = self.settings.suffix();

        let (direct, index) = if directory {
            (false, true)
        } else if page_suffix.is_empty() {
            (true, true)
        } else {
            match name.strip_suffix(page_suffix) {
                Some(stripped) => {
                    name = stripped.to_string();
                    (true, false)
                }
                None => (false, true),
            }
        };

        if !directory && name.is_empty() {
            return Ok(None);
        }

        if self.settings.convert_dashes() {
            name = name.replace('-', "_");
        }

        let segments: Vec<&str> = if name.is_empty() {
            Vec::new()
        } else {
            name.split('/').collect()
        };
        for segment in &segments {
            if segment.is_empty() {
                debug!("路径{}包含空片段，包路由不处理", ctx.path());
                return Ok(None);
            }
            if segment.starts_with('$') {
                debug!("路径{}包含私有片段{}，包路由不处理", ctx.path(), segment);
                return Ok(None);
            }
        }

        let candidate = if segments.is_empty() {
            root.to_string()
        } else {
            format!("{}.{}", root, segments.join("."))
        };

        if direct && !segments.is_empty() {
            if let Some(found) = self.lookup(&candidate) {
                if !found.is_page() {
                    return Err(Exception::NotAPage(candidate));
                }
                debug!("路径{}解析为页面{}", ctx.path(), candidate);
                return Ok(Some(PackageOutcome::Page(found)));
            }
        }

        if index {
            let index_name = format!("{}.{}", candidate, self.settings.index_name());
            if let Some(found) = self.lookup(&index_name) {
                if !found.is_page() {
                    return Err(Exception::NotAPage(index_name));
                }
                if !ctx.path().ends_with('/') {
                    let location = trailing_slash_location(ctx);
                    debug!("索引页{}需要以/结尾访问，重定向到{}", index_name, location);
                    return Ok(Some(PackageOutcome::Redirect(location)));
                }
                debug!("路径{}解析为索引页{}", ctx.path(), index_name);
                return Ok(Some(PackageOutcome::Page(found)));
            }
        }

        debug!("路径{}在命名空间{}下没有对应的页面", ctx.path(), root);
        Ok(None)
    }

    /// 注册表可能是大小写不敏感的，这里只接受名称完全一致的结果
    fn lookup(&self, name: &str) -> Option<&'a PageType> {
        self.registry
            .lookup_type(name)
            .filter(|found| found.name() == name)
    }
}

/// 拒绝包含目录回溯片段的路径。反斜杠同样视作分隔符。
pub fn check_traversal(path: &str) -> Result<(), Exception> {
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        warn!("拒绝包含目录回溯的路径：{}", path);
        return Err(Exception::PathTraversal(path.to_string()));
    }
    Ok(())
}

/// 在请求路径后补一个斜杠，原样保留查询字符串
pub fn trailing_slash_location(ctx: &RequestContext) -> String {
    match ctx.query() {
        Some(query) => format!("{}/?{}", ctx.path(), query),
        None => format!("{}/", ctx.path()),
    }
}
