// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::prelude::*;

use crate::{
    exception::Exception,
    param::{DEFAULT_INDEX_NAME, DEFAULT_SUFFIX},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_routes_file")]
    routes_file: String,
    #[serde(default)]
    routing: RoutingConfig,
    /// 路由文件中 `${name}` 的取值
    #[serde(default)]
    variables: HashMap<String, String>,
    /// 追加或覆盖的 MIME 映射，键为后缀名
    #[serde(default)]
    mime: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_suffix")]
    suffix: String,
    #[serde(default = "default_index_name")]
    index_name: String,
    #[serde(default)]
    convert_dashes: bool,
    #[serde(default)]
    method_not_allowed: bool,
}

fn default_routes_file() -> String {
    "config/routes.conf".to_string()
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            index_name: default_index_name(),
            convert_dashes: false,
            method_not_allowed: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            worker_threads: 0,
            local: true,
            routes_file: default_routes_file(),
            routing: RoutingConfig::default(),
            variables: HashMap::new(),
            mime: HashMap::new(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                return Err(Exception::Config(format!(
                    "no such file {} exception:{}",
                    filename, e
                )))
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            return Err(Exception::Config(format!("Error Reading file: {}", e)));
        }
        let config = Self::parse(&str_val)?;
        info!("配置文件{}已载入", filename);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, Exception> {
        let mut raw_config: Config = match toml::from_str(text) {
            Ok(t) => t,
            Err(e) => return Err(Exception::Config(format!("无法解析配置文件：{}", e))),
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.routing.index_name.is_empty() {
            warn!("index_name被设置为空，将使用默认值{}", DEFAULT_INDEX_NAME);
            raw_config.routing.index_name = default_index_name();
        }
        Ok(raw_config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn routes_file(&self) -> &str {
        &self.routes_file
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn mime(&self) -> &HashMap<String, String> {
        &self.mime
    }
}

impl RoutingConfig {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let text = r#"
port = 8080
worker_threads = 2
local = false
routes_file = "conf/app.routes"

[routing]
suffix = ""
index_name = "home"
convert_dashes = true
method_not_allowed = true

[variables]
pages = "demo.pages"

[mime]
md = "text/markdown"
"#;
        let config = Config::parse(text).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.worker_threads(), 2);
        assert!(!config.local());
        assert_eq!(config.routes_file(), "conf/app.routes");
        assert_eq!(config.routing().suffix(), "");
        assert_eq!(config.routing().index_name(), "home");
        assert!(config.routing().convert_dashes());
        assert!(config.routing().method_not_allowed());
        assert_eq!(config.variables().get("pages").unwrap(), "demo.pages");
        assert_eq!(config.mime().get("md").unwrap(), "text/markdown");
    }

    #[test]
    fn test_defaults() {
        let text = "port = 7878\nworker_threads = 0\nlocal = true\n";
        let config = Config::parse(text).unwrap();
        assert!(config.worker_threads() > 0);
        assert_eq!(config.routes_file(), "config/routes.conf");
        assert_eq!(config.routing().suffix(), ".html");
        assert_eq!(config.routing().index_name(), "index");
        assert!(!config.routing().convert_dashes());
        assert!(config.variables().is_empty());
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(matches!(
            Config::parse("port = \"not a number\""),
            Err(Exception::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("/nonexistent/pagerouter.toml"),
            Err(Exception::Config(_))
        ));
    }
}
