// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表
//!
//! 有序的 (路径模板, 路由动作) 列表。加载完成后不再修改，可以通过 `Arc` 在所有工作线程间共享。
//!
//! 求值规则：
//! - 按插入顺序逐条匹配，第一个返回结果的条目胜出；
//! - 动作返回 `None`（头部修改、未命中的包路由等）时继续尝试下一条，该条目写入的路径参数随之撤销；
//! - 开启严格方法检查后，方法不匹配的条目直接得到 405，除非后面还有声明了该方法的同路径路由；
//! - 动作返回错误时立即终止，安全错误绝不会被当作未命中；
//! - 所有条目都未给出结果时返回 `Resolution::NotFound`。

use std::sync::Arc;

use crate::{
    action::{method_not_allowed, Resolution, RouteAction, RouteEnv},
    config::RoutingConfig,
    context::RequestContext,
    exception::Exception,
    param::{HttpRequestMethod, DEFAULT_INDEX_NAME, DEFAULT_SUFFIX},
    pattern::RoutePattern,
    registry::Registry,
};

use log::debug;

/// 影响包路由解析与方法检查的表级设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    suffix: String,
    index_name: String,
    convert_dashes: bool,
    method_not_allowed: bool,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            convert_dashes: false,
            method_not_allowed: false,
        }
    }
}

impl RouteSettings {
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_index_name(mut self, index_name: &str) -> Self {
        self.index_name = index_name.to_string();
        self
    }

    pub fn with_convert_dashes(mut self, enabled: bool) -> Self {
        self.convert_dashes = enabled;
        self
    }

    pub fn with_method_not_allowed(mut self, enabled: bool) -> Self {
        self.method_not_allowed = enabled;
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn convert_dashes(&self) -> bool {
        self.convert_dashes
    }

    pub fn method_not_allowed(&self) -> bool {
        self.method_not_allowed
    }
}

impl From<&RoutingConfig> for RouteSettings {
    fn from(config: &RoutingConfig) -> Self {
        RouteSettings::default()
            .with_suffix(config.suffix())
            .with_index_name(config.index_name())
            .with_convert_dashes(config.convert_dashes())
            .with_method_not_allowed(config.method_not_allowed())
    }
}

#[derive(Debug)]
struct RouteEntry {
    method: Option<HttpRequestMethod>,
    pattern: RoutePattern,
    action: RouteAction,
}

pub struct RouteTable {
    entries: Vec<RouteEntry>,
    settings: RouteSettings,
    registry: Arc<dyn Registry>,
}

impl RouteTable {
    pub fn new(registry: Arc<dyn Registry>, settings: RouteSettings) -> Self {
        Self {
            entries: Vec::new(),
            settings,
            registry,
        }
    }

    /// 追加一条不限方法的路由
    pub fn add(&mut self, pattern: RoutePattern, action: RouteAction) -> &mut Self {
        self.add_for(None, pattern, action)
    }

    /// 追加一条路由，`method` 为 `Some` 时只接受该方法的请求
    pub fn add_for(
        &mut self,
        method: Option<HttpRequestMethod>,
        pattern: RoutePattern,
        action: RouteAction,
    ) -> &mut Self {
        debug!(
            "添加路由：{} {} -> {}",
            method.map_or("*".to_string(), |m| m.to_string()),
            pattern.raw(),
            action
        );
        self.entries.push(RouteEntry {
            method,
            pattern,
            action,
        });
        self
    }

    /// 开启严格方法检查：方法不匹配时返回 405，而不是静默地落到后续路由或交给页面处理。
    /// 只有后面还有显式声明了该方法、且路径匹配的路由时，才会继续向后尝试。
    ///
    /// 是否支持某个方法只能在请求到来时判断，因此这里只设置表级开关，
    /// 具体检查发生在 `route` 与页面类动作的解析过程中。
    pub fn tune_for_method_not_allowed(&mut self) -> &mut Self {
        self.settings.method_not_allowed = true;
        self
    }

    pub fn route(&self, ctx: &mut RequestContext) -> Result<Resolution, Exception> {
        let env = RouteEnv::new(&self.settings, self.registry.as_ref());

        for (index, entry) in self.entries.iter().enumerate() {
            let matched = match entry.pattern.matches(ctx.path()) {
                Some(m) => m,
                None => continue,
            };

            if let Some(method) = entry.method {
                if !ctx.method().satisfies(method) {
                    debug!(
                        "路由{}只接受{}，当前请求方法为{}",
                        entry.pattern.raw(),
                        method,
                        ctx.method()
                    );
                    if self.settings.method_not_allowed
                        && !self.declared_later(index, ctx.path(), ctx.method())
                    {
                        debug!("{} {} 没有接受该方法的路由，返回405", ctx.method(), ctx.path());
                        let allowed = self.declared_methods(ctx.path());
                        return Ok(method_not_allowed(ctx, &allowed));
                    }
                    continue;
                }
            }

            // 动作放行时撤销本条路由写入的参数
            let saved = ctx.params().to_vec();
            for (name, value) in matched.params() {
                ctx.add_param(name, value);
            }

            match entry.action.resolve(&env, ctx, matched.suffix())? {
                Some(resolution) => {
                    debug!(
                        "{} {} 由路由{}处理：{:?}",
                        ctx.method(),
                        ctx.path(),
                        entry.pattern.raw(),
                        resolution
                    );
                    return Ok(resolution);
                }
                None => ctx.restore_params(saved),
            }
        }

        debug!("{} {} 没有匹配的路由", ctx.method(), ctx.path());
        Ok(Resolution::NotFound)
    }

    /// `index` 之后是否还有显式声明了 `method` 且匹配 `path` 的路由
    fn declared_later(&self, index: usize, path: &str, method: HttpRequestMethod) -> bool {
        self.entries[index + 1..].iter().any(|e| {
            e.method.map_or(false, |m| method.satisfies(m)) && e.pattern.matches(path).is_some()
        })
    }

    /// 匹配 `path` 的路由上声明过的全部方法，用于 `Allow` 头
    fn declared_methods(&self, path: &str) -> Vec<HttpRequestMethod> {
        let mut declared = Vec::new();
        for entry in &self.entries {
            if let Some(method) = entry.method {
                if !declared.contains(&method) && entry.pattern.matches(path).is_some() {
                    declared.push(method);
                }
            }
        }
        declared
    }

    pub fn settings(&self) -> &RouteSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按求值顺序列出 (方法, 路径模板, 动作描述)，供管理控制台展示
    pub fn routes(&self) -> Vec<(Option<HttpRequestMethod>, String, String)> {
        self.entries
            .iter()
            .map(|e| (e.method, e.pattern.raw().to_string(), e.action.to_string()))
            .collect()
    }
}
