// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由文件加载器
//!
//! 路由文件每行一条路由，`#` 开头的行与空行被忽略：
//!
//! ```text
//! # 方法前缀可选
//! [METHOD] <路径模板> <动作> [参数...]
//! @header <名称> <值>
//! ```
//!
//! 动作可以是 `package:<命名空间> [状态码]`、`router:<名称>`、`redirect:<地址> [状态码]`、
//! `status:<状态码> [消息...]`、`static:<目录> [listing] [index=<文件>]`，或者直接写页面类型名。
//!
//! 每一行先做 `${name}` 变量替换，再解析。任何一行出错都会导致整个加载失败。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::{
    action::{RouteAction, StaticRoot},
    exception::Exception,
    param::{HttpRequestMethod, DEFAULT_REDIRECT_STATUS, ROUTE_SUFFIX},
    pattern::RoutePattern,
    registry::Registry,
    table::{RouteSettings, RouteTable},
};

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

lazy_static! {
    static ref VARIABLE: Regex = Regex::new(r"\$\{([^}]*)\}").unwrap();
    static ref REPEATED_SLASHES: Regex = Regex::new(r"/{2,}").unwrap();
    static ref NAMESPACE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref HEADER_NAME: Regex = Regex::new(r"^[A-Za-z0-9!#$%&'*+.^_`|~-]+$").unwrap();
    static ref TARGET_PLACEHOLDER: Regex = Regex::new(r"\{([^}]*)\}").unwrap();
}

/// 不带路径的指令行作用于所有请求
const MATCH_ALL: &str = "/{}";

pub struct RouteTableLoader {
    registry: Arc<dyn Registry>,
    settings: RouteSettings,
    variables: HashMap<String, String>,
}

impl RouteTableLoader {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            settings: RouteSettings::default(),
            variables: HashMap::new(),
        }
    }

    pub fn with_settings(mut self, settings: RouteSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    pub fn load_file(&self, path: &Path) -> Result<RouteTable, Exception> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                return Err(Exception::Config(format!(
                    "无法读取路由文件{}：{}",
                    path.display(),
                    e
                )))
            }
        };
        let table = self.load(&text)?;
        info!("路由文件{}已载入，共{}条路由", path.display(), table.len());
        Ok(table)
    }

    pub fn load(&self, text: &str) -> Result<RouteTable, Exception> {
        let mut table = RouteTable::new(self.registry.clone(), self.settings.clone());
        for (index, raw_line) in text.lines().enumerate() {
            let number = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let line = expand_variables(trimmed, &self.variables).map_err(|e| at_line(number, e))?;
            self.parse_line(&line, &mut table)
                .map_err(|e| at_line(number, e))?;
        }
        Ok(table)
    }

    fn parse_line(&self, line: &str, table: &mut RouteTable) -> Result<(), String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(());
        }

        if tokens[0].starts_with('@') {
            let pattern = compile(MATCH_ALL)?;
            let action = parse_directive(&tokens)?;
            table.add(pattern, action);
            return Ok(());
        }

        let (method, rest) = match HttpRequestMethod::parse(tokens[0]) {
            Some(m) => (Some(m), &tokens[1..]),
            None => (None, &tokens[..]),
        };
        if rest.len() < 2 {
            return Err(format!("expected \"[METHOD] <path> <action>\", found \"{}\"", line));
        }

        let path = REPEATED_SLASHES.replace_all(rest[0], "/");
        if !path.starts_with('/') {
            return Err(format!("path \"{}\" must start with /", path));
        }
        let pattern = compile(&path)?;

        let action = if rest[1].starts_with('@') {
            parse_directive(&rest[1..])?
        } else {
            self.parse_action(rest[1], &rest[2..], &pattern)?
        };
        debug!("路由行解析完成：{}", line);
        table.add_for(method, pattern, action);
        Ok(())
    }

    fn parse_action(
        &self,
        token: &str,
        args: &[&str],
        pattern: &RoutePattern,
    ) -> Result<RouteAction, String> {
        let (kind, value) = match token.split_once(':') {
            Some((k, v)) => (k, v),
            None => return self.parse_class(token, args),
        };
        if value.is_empty() {
            return Err(format!("action \"{}\" is missing its argument", token));
        }

        match kind {
            "package" => {
                if !NAMESPACE.is_match(value) {
                    return Err(format!("invalid namespace \"{}\"", value));
                }
                let redirect_status = match args {
                    [] => DEFAULT_REDIRECT_STATUS,
                    [status] => parse_redirect_status(status)?,
                    _ => return Err(format!("unexpected arguments after {}", token)),
                };
                Ok(RouteAction::Package {
                    root: value.to_string(),
                    redirect_status,
                })
            }
            "router" => {
                if !args.is_empty() {
                    return Err(format!("unexpected arguments after {}", token));
                }
                match self.registry.router(value) {
                    Some(router) => Ok(RouteAction::Router {
                        name: value.to_string(),
                        router,
                    }),
                    None => Err(format!("router \"{}\" is not registered", value)),
                }
            }
            "redirect" => {
                let status = match args {
                    [] => DEFAULT_REDIRECT_STATUS,
                    [status] => parse_redirect_status(status)?,
                    _ => return Err(format!("unexpected arguments after {}", token)),
                };
                check_target_placeholders(value, pattern)?;
                Ok(RouteAction::Redirect {
                    target: value.to_string(),
                    status,
                })
            }
            "status" => {
                let code = match value.parse::<u16>() {
                    Ok(c) if (100..=599).contains(&c) => c,
                    _ => return Err(format!("invalid status code \"{}\"", value)),
                };
                let message = if args.is_empty() {
                    None
                } else {
                    Some(args.join(" "))
                };
                Ok(RouteAction::Status { code, message })
            }
            "static" => {
                let mut root = StaticRoot::new(value);
                for option in args {
                    if *option == "listing" {
                        root = root.with_listing(true);
                    } else if let Some(index_file) = option.strip_prefix("index=") {
                        if index_file.is_empty() || index_file.contains('/') {
                            return Err(format!("invalid static index file \"{}\"", index_file));
                        }
                        root = root.with_index_file(index_file);
                    } else {
                        return Err(format!("unknown static option \"{}\"", option));
                    }
                }
                if !root.root().is_dir() {
                    warn!("静态目录{}当前不存在", value);
                }
                Ok(RouteAction::Static(root))
            }
            _ => Err(format!("unknown action type \"{}\"", kind)),
        }
    }

    fn parse_class(&self, name: &str, args: &[&str]) -> Result<RouteAction, String> {
        if !args.is_empty() {
            return Err(format!("unexpected arguments after {}", name));
        }
        match self.registry.lookup_type(name) {
            Some(found) if found.name() == name && found.is_page() => {
                Ok(RouteAction::Class(found.clone()))
            }
            Some(found) if found.name() == name => Err(format!("{} is not a page type", name)),
            _ => Err(format!("page type \"{}\" is not registered", name)),
        }
    }
}

/// 将 `${name}` 替换为 `variables` 中的值，未定义的变量视为错误
pub fn expand_variables(line: &str, variables: &HashMap<String, String>) -> Result<String, String> {
    let mut expanded = String::with_capacity(line.len());
    let mut last = 0;
    for caps in VARIABLE.captures_iter(line) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let name = caps.get(1).map_or("", |m| m.as_str());
        let value = match variables.get(name) {
            Some(v) => v,
            None => return Err(format!("undefined variable ${{{}}}", name)),
        };
        expanded.push_str(&line[last..whole.start]);
        expanded.push_str(value);
        last = whole.end;
    }
    expanded.push_str(&line[last..]);
    Ok(expanded)
}

fn parse_directive(tokens: &[&str]) -> Result<RouteAction, String> {
    match tokens[0] {
        "@header" => {
            if tokens.len() < 3 {
                return Err("expected \"@header <name> <value>\"".to_string());
            }
            if !HEADER_NAME.is_match(tokens[1]) {
                return Err(format!("invalid header name \"{}\"", tokens[1]));
            }
            Ok(RouteAction::Header {
                name: tokens[1].to_string(),
                value: tokens[2..].join(" "),
            })
        }
        other => Err(format!("unknown directive \"{}\"", other)),
    }
}

fn parse_redirect_status(token: &str) -> Result<u16, String> {
    match token.parse::<u16>() {
        Ok(c) if (300..=399).contains(&c) => Ok(c),
        _ => Err(format!("invalid redirect status \"{}\"", token)),
    }
}

/// 重定向目标中的占位符必须能由路径模板提供
fn check_target_placeholders(target: &str, pattern: &RoutePattern) -> Result<(), String> {
    for caps in TARGET_PLACEHOLDER.captures_iter(target) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let known = if name.is_empty() {
            pattern.is_terminated()
        } else {
            name != ROUTE_SUFFIX && pattern.param_names().iter().any(|n| n == name)
        };
        if !known {
            return Err(format!(
                "redirect target {} uses {{{}}} which {} does not capture",
                target,
                name,
                pattern.raw()
            ));
        }
    }
    Ok(())
}

fn compile(path: &str) -> Result<RoutePattern, String> {
    RoutePattern::compile(path).map_err(|e| match e {
        Exception::Config(msg) => msg,
        other => other.to_string(),
    })
}

fn at_line(number: usize, message: String) -> Exception {
    Exception::Config(format!("line {}: {}", number, message))
}
