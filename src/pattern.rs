// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径模板编译器
//!
//! 将形如 `/blog/{<\d{4}>year}/{slug}/{}` 的路径模板编译为首尾锚定的正则表达式。
//!
//! ## 占位符语法
//! - `{name}`：匹配单个路径片段 `[^/]+`。
//! - `{<regex>name}`：使用自定义正则匹配。自定义正则在第一个 `>` 处结束，因此其中不能出现 `>`，
//!   例如 `[^>]+` 会在加载时报错，需要改写为不含 `>` 的等价形式。
//! - `{}`：终止通配符，匹配剩余的任意内容，捕获名为 `routeSuffix`，只能出现在模板末尾。
//!
//! 没有 `{}` 的模板只做精确匹配，多出的尾部片段不会被吞掉。

use crate::{exception::Exception, param::ROUTE_SUFFIX};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    /// 字面前缀、花括号分组、剩余部分。`<...>` 内允许出现花括号，以便书写 `\d{4}` 之类的量词。
    static ref SCANNER: Regex = Regex::new(r"(?s)^([^{]*)\{(<[^>]*>)?([^}]*)\}(.*)$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,32}$").unwrap();
}

/// 单个路径参数默认匹配一个路径片段
const SEGMENT_PATTERN: &str = "[^/]+";

#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    regex: Regex,
    param_names: Vec<String>,
    terminated: bool,
}

/// 一次成功匹配的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    params: Vec<(String, String)>,
    suffix: Option<String>,
}

impl RouteMatch {
    /// 按模板中声明的顺序返回参数，终止通配符的内容以 `routeSuffix` 为名一并给出
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 终止通配符捕获到的剩余路径；模板不含 `{}` 时为 `None`
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

impl RoutePattern {
    pub fn compile(raw: &str) -> Result<Self, Exception> {
        let mut expr = String::from("^");
        let mut param_names = Vec::new();
        let mut terminated = false;
        let mut rest = raw;

        while let Some(caps) = SCANNER.captures(rest) {
            let literal = caps.get(1).map_or("", |m| m.as_str());
            let custom = caps.get(2).map(|m| m.as_str());
            let name = caps.get(3).map_or("", |m| m.as_str());
            let remainder = caps.get(4).map_or("", |m| m.as_str());

            expr.push_str(&regex::escape(literal));

            if custom.is_none() && name.is_empty() {
                if !remainder.is_empty() {
                    return Err(Exception::Config(format!(
                        "{}: the terminal wildcard {{}} must be the last element, found \"{}\" after it",
                        raw, remainder
                    )));
                }
                expr.push_str(&format!("(?P<{}>.*)", ROUTE_SUFFIX));
                param_names.push(ROUTE_SUFFIX.to_string());
                terminated = true;
            } else {
                validate_name(raw, name)?;
                let pattern = match custom {
                    Some(c) => &c[1..c.len() - 1],
                    None => SEGMENT_PATTERN,
                };
                if pattern.is_empty() {
                    return Err(Exception::Config(format!(
                        "{}: parameter {} declares an empty pattern",
                        raw, name
                    )));
                }
                expr.push_str(&format!("(?P<{}>{})", name, pattern));
                param_names.push(name.to_string());
            }
            rest = remainder;
        }

        expr.push_str(&regex::escape(rest));
        expr.push('$');

        let regex = match Regex::new(&expr) {
            Ok(r) => r,
            Err(e) => {
                return Err(Exception::Config(format!(
                    "{}: compiled pattern {} is not a valid regex: {}",
                    raw, expr, e
                )))
            }
        };
        debug!("路径模板{}编译为{}", raw, expr);

        Ok(Self {
            raw: raw.to_string(),
            regex,
            param_names,
            terminated,
        })
    }

    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let caps = self.regex.captures(path)?;
        let mut params = Vec::with_capacity(self.param_names.len());
        let mut suffix = None;
        for name in &self.param_names {
            let value = caps.name(name).map_or("", |m| m.as_str()).to_string();
            if self.terminated && name == ROUTE_SUFFIX {
                suffix = Some(value.clone());
            }
            params.push((name.clone(), value));
        }
        Some(RouteMatch { params, suffix })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

fn validate_name(raw: &str, name: &str) -> Result<(), Exception> {
    if name.is_empty() {
        return Err(Exception::Config(format!("{}: empty parameter name", raw)));
    }
    if name == ROUTE_SUFFIX {
        return Err(Exception::Config(format!(
            "{}: {} is reserved for the terminal wildcard",
            raw, ROUTE_SUFFIX
        )));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(Exception::Config(format!(
            "{}: invalid parameter name \"{}\"",
            raw, name
        )));
    }
    Ok(())
}
