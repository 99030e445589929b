// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面类型注册表
//!
//! 路由引擎通过点分全限定名（如 `demo.pages.subdir.index`）查找页面类型，
//! 再用注册时提供的工厂函数为每个请求构造一个全新的页面实例。
//! 注册表在启动时一次性填充，之后只读。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    action::Resolution, context::RequestContext, exception::Exception, param::HttpRequestMethod,
};

/// 页面控制器。每个实例只服务一个请求。
pub trait Page: Send {
    /// 处理请求并返回 HTML 正文
    fn handle(&mut self, ctx: &RequestContext) -> String;
}

/// 外部注册的自定义路由器，对应路由文件中的 `router:<name>`
pub trait Router: Send + Sync {
    /// `suffix` 为终止通配符捕获的内容，模板不含 `{}` 时为空字符串。
    /// 返回 `Ok(None)` 表示不处理，路由表会继续尝试后续条目。
    fn route(&self, ctx: &mut RequestContext, suffix: &str)
        -> Result<Option<Resolution>, Exception>;
}

pub type PageFactory = Arc<dyn Fn() -> Box<dyn Page> + Send + Sync>;

/// 未显式声明时页面支持的请求方法
const DEFAULT_METHODS: [HttpRequestMethod; 3] = [
    HttpRequestMethod::Get,
    HttpRequestMethod::Head,
    HttpRequestMethod::Post,
];

#[derive(Clone)]
pub enum TypeKind {
    Page {
        factory: PageFactory,
        methods: Vec<HttpRequestMethod>,
    },
    /// 存在于命名空间中、但不是页面的类型（工具类、模型等）
    Other,
}

#[derive(Clone)]
pub struct PageType {
    name: String,
    kind: TypeKind,
}

impl PageType {
    pub fn page<F, P>(name: &str, factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Page + 'static,
    {
        Self {
            name: name.to_string(),
            kind: TypeKind::Page {
                factory: Arc::new(move || Box::new(factory()) as Box<dyn Page>),
                methods: DEFAULT_METHODS.to_vec(),
            },
        }
    }

    pub fn other(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TypeKind::Other,
        }
    }

    /// 覆盖页面支持的方法列表。对非页面类型无效。
    pub fn with_methods(mut self, list: &[HttpRequestMethod]) -> Self {
        if let TypeKind::Page { methods, .. } = &mut self.kind {
            *methods = list.to_vec();
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_page(&self) -> bool {
        matches!(self.kind, TypeKind::Page { .. })
    }

    pub fn methods(&self) -> &[HttpRequestMethod] {
        match &self.kind {
            TypeKind::Page { methods, .. } => methods,
            TypeKind::Other => &[],
        }
    }

    pub fn supports_method(&self, method: HttpRequestMethod) -> bool {
        match &self.kind {
            TypeKind::Page { methods, .. } => methods.iter().any(|m| method.satisfies(*m)),
            TypeKind::Other => false,
        }
    }

    /// 构造一个全新的页面实例；非页面类型返回 `NotAPage`
    pub fn instantiate(&self) -> Result<PageInstance, Exception> {
        match &self.kind {
            TypeKind::Page { factory, .. } => Ok(PageInstance {
                type_name: self.name.clone(),
                page: factory(),
            }),
            TypeKind::Other => Err(Exception::NotAPage(self.name.clone())),
        }
    }
}

impl fmt::Debug for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TypeKind::Page { methods, .. } => format!("Page{:?}", methods),
            TypeKind::Other => "Other".to_string(),
        };
        f.debug_struct("PageType")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// 路由解析得到的页面实例
pub struct PageInstance {
    type_name: String,
    page: Box<dyn Page>,
}

impl PageInstance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn handle(&mut self, ctx: &RequestContext) -> String {
        self.page.handle(ctx)
    }
}

impl fmt::Debug for PageInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageInstance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 路由引擎消费的类型查找接口。
///
/// 实现方可以是大小写不敏感的，路由引擎在使用查找结果前会再做一次精确名称比较。
pub trait Registry: Send + Sync {
    fn lookup_type(&self, name: &str) -> Option<&PageType>;

    fn router(&self, name: &str) -> Option<Arc<dyn Router>>;
}

#[derive(Default)]
pub struct PageRegistry {
    types: HashMap<String, PageType>,
    routers: HashMap<String, Arc<dyn Router>>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, page_type: PageType) -> &mut Self {
        self.types.insert(page_type.name().to_string(), page_type);
        self
    }

    pub fn register_router<R: Router + 'static>(&mut self, name: &str, router: R) -> &mut Self {
        self.routers.insert(name.to_string(), Arc::new(router));
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Registry for PageRegistry {
    fn lookup_type(&self, name: &str) -> Option<&PageType> {
        self.types.get(name)
    }

    fn router(&self, name: &str) -> Option<Arc<dyn Router>> {
        self.routers.get(name).cloned()
    }
}
