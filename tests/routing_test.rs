// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod routing_tests {
    //! # 路由引擎端到端测试
    //!
    //! 通过路由文件构建路由表，再用各种请求路径验证最终的解析结论。

    use std::collections::HashMap;
    use std::sync::Arc;

    use pagerouter::{
        exception::Exception,
        param::HttpRequestMethod,
        registry::{Page, PageRegistry, PageType, Registry, Router},
        Resolution, RequestContext, RouteSettings, RouteTable, RouteTableLoader,
    };

    struct Named;

    impl Page for Named {
        fn handle(&mut self, ctx: &RequestContext) -> String {
            ctx.path().to_string()
        }
    }

    fn demo_registry() -> PageRegistry {
        let mut registry = PageRegistry::new();
        registry
            .register(PageType::page("demo.pages.index", || Named))
            .register(PageType::page("demo.pages.pageOne", || Named))
            .register(PageType::page("demo.pages.subdir.index", || Named))
            .register(PageType::page("demo.pages.subdir.report", || Named))
            .register(PageType::page("demo.pages.$pageFour", || Named))
            .register(PageType::page("demo.pages.$subdir.index", || Named))
            .register(PageType::page("demo.pages.user_list", || Named))
            .register(PageType::other("demo.pages.Helpers"))
            .register(
                PageType::page("demo.api.Update", || Named).with_methods(&[HttpRequestMethod::Post]),
            );
        registry
    }

    fn table(routes: &str, settings: RouteSettings) -> RouteTable {
        RouteTableLoader::new(Arc::new(demo_registry()))
            .with_settings(settings)
            .load(routes)
            .unwrap()
    }

    fn route(table: &RouteTable, method: HttpRequestMethod, target: &str) -> Resolution {
        let mut ctx = RequestContext::new(method, target);
        table.route(&mut ctx).unwrap()
    }

    fn page_name(resolution: &Resolution) -> Option<&str> {
        match resolution {
            Resolution::Page(page) => Some(page.type_name()),
            _ => None,
        }
    }

    fn redirect_location(resolution: &Resolution) -> Option<(&str, u16)> {
        match resolution {
            Resolution::Redirect { location, status } => Some((location.as_str(), *status)),
            _ => None,
        }
    }

    /// 单条 `package:` 路由，不配置后缀
    #[test]
    fn test_package_scenario() {
        let table = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        let get = HttpRequestMethod::Get;

        assert_eq!(page_name(&route(&table, get, "/")), Some("demo.pages.index"));
        assert_eq!(
            page_name(&route(&table, get, "/subdir/")),
            Some("demo.pages.subdir.index")
        );
        assert_eq!(
            redirect_location(&route(&table, get, "/subdir")),
            Some(("/subdir/", 302))
        );
        assert_eq!(
            page_name(&route(&table, get, "/pageOne")),
            Some("demo.pages.pageOne")
        );
        assert!(matches!(route(&table, get, "/pageTwo"), Resolution::NotFound));
    }

    #[test]
    fn test_index_redirect_keeps_query() {
        let table = table("/{} package:demo.pages", RouteSettings::default());
        let resolution = route(&table, HttpRequestMethod::Get, "/subdir?x=y");
        assert_eq!(redirect_location(&resolution), Some(("/subdir/?x=y", 302)));

        let resolution = route(&table, HttpRequestMethod::Get, "/subdir/?x=y");
        assert_eq!(page_name(&resolution), Some("demo.pages.subdir.index"));
    }

    #[test]
    fn test_package_redirect_status_is_configurable() {
        let table = table("/{} package:demo.pages 301", RouteSettings::default());
        let resolution = route(&table, HttpRequestMethod::Get, "/subdir");
        assert_eq!(redirect_location(&resolution), Some(("/subdir/", 301)));
    }

    #[test]
    fn test_case_sensitivity() {
        let table = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        assert!(matches!(
            route(&table, HttpRequestMethod::Get, "/PAGEONE"),
            Resolution::NotFound
        ));
        assert!(matches!(
            route(&table, HttpRequestMethod::Get, "/pageone"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_suffix_sensitivity() {
        let get = HttpRequestMethod::Get;

        let no_suffix = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        assert!(matches!(route(&no_suffix, get, "/pageOne.html"), Resolution::NotFound));

        let html = table("/{} package:demo.pages", RouteSettings::default());
        assert_eq!(
            page_name(&route(&html, get, "/pageOne.html")),
            Some("demo.pages.pageOne")
        );
        assert_eq!(
            page_name(&route(&html, get, "/subdir/report.html")),
            Some("demo.pages.subdir.report")
        );
        assert!(matches!(route(&html, get, "/pageOne"), Resolution::NotFound));
    }

    #[test]
    fn test_private_segments() {
        let table = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        for path in ["/$pageFour", "/$subdir/index", "/$subdir/"] {
            assert!(
                matches!(route(&table, HttpRequestMethod::Get, path), Resolution::NotFound),
                "{} should not resolve",
                path
            );
        }
    }

    #[test]
    fn test_dash_conversion() {
        let get = HttpRequestMethod::Get;

        let plain = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        assert!(matches!(route(&plain, get, "/user-list"), Resolution::NotFound));

        let dashed = table(
            "/{} package:demo.pages",
            RouteSettings::default()
                .with_suffix("")
                .with_convert_dashes(true),
        );
        assert_eq!(
            page_name(&route(&dashed, get, "/user-list")),
            Some("demo.pages.user_list")
        );
    }

    #[test]
    fn test_non_page_type_is_fatal() {
        let table = table("/{} package:demo.pages", RouteSettings::default().with_suffix(""));
        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/Helpers");
        assert_eq!(
            table.route(&mut ctx).unwrap_err(),
            Exception::NotAPage("demo.pages.Helpers".to_string())
        );
    }

    #[test]
    fn test_fallthrough_order() {
        let routes = r#"
/pageOne         status:410 Gone
/{}              package:demo.pages
/{}              status:404 nothing here
"#;
        let table = table(routes, RouteSettings::default().with_suffix(""));
        assert_eq!(route(&table, HttpRequestMethod::Get, "/pageOne").status_code(), 410);
        assert_eq!(
            page_name(&route(&table, HttpRequestMethod::Get, "/subdir/")),
            Some("demo.pages.subdir.index")
        );
        match route(&table, HttpRequestMethod::Get, "/missing") {
            Resolution::Status { code, message } => {
                assert_eq!(code, 404);
                assert_eq!(message.as_deref(), Some("nothing here"));
            }
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn test_path_params_reach_context() {
        let routes = "/users/{<\\d+>id}/{section} demo.pages.pageOne";
        let table = table(routes, RouteSettings::default());
        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/users/42/posts");
        let resolution = table.route(&mut ctx).unwrap();
        assert_eq!(page_name(&resolution), Some("demo.pages.pageOne"));
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("section"), Some("posts"));

        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/users/ann/posts");
        assert!(matches!(table.route(&mut ctx).unwrap(), Resolution::NotFound));
    }

    #[test]
    fn test_method_restricted_routes() {
        let routes = r#"
POST /api/update    demo.api.Update
GET  /api/update    status:200 read only
"#;
        let table = table(routes, RouteSettings::default());
        assert_eq!(
            page_name(&route(&table, HttpRequestMethod::Post, "/api/update")),
            Some("demo.api.Update")
        );
        // 后面的 GET 路由优先于前面记下的方法不匹配
        assert_eq!(
            route(&table, HttpRequestMethod::Get, "/api/update").status_code(),
            200
        );
        assert_eq!(
            route(&table, HttpRequestMethod::Head, "/api/update").status_code(),
            200
        );
        assert!(matches!(
            route(&table, HttpRequestMethod::Delete, "/api/update"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_method_not_allowed() {
        let routes = "POST /api/update demo.api.Update";
        let table = table(routes, RouteSettings::default().with_method_not_allowed(true));
        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/api/update");
        let resolution = table.route(&mut ctx).unwrap();
        assert_eq!(resolution.status_code(), 405);
        assert_eq!(
            ctx.response_headers(),
            &[("Allow".to_string(), "POST".to_string())]
        );
    }

    #[test]
    fn test_method_not_allowed_before_catch_all() {
        let routes = r#"
POST /api/update    demo.api.Update
/{}                 status:404 nothing here
"#;
        let table = table(routes, RouteSettings::default().with_method_not_allowed(true));
        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/api/update");
        assert_eq!(table.route(&mut ctx).unwrap().status_code(), 405);
        assert_eq!(
            ctx.response_headers(),
            &[("Allow".to_string(), "POST".to_string())]
        );
        assert_eq!(
            route(&table, HttpRequestMethod::Get, "/elsewhere").status_code(),
            404
        );
    }

    #[test]
    fn test_wildcard_redirect_stays_on_host() {
        let table = table("/go/{} redirect:/{}", RouteSettings::default());
        let resolution = route(&table, HttpRequestMethod::Get, "/go//evil.example/x");
        assert_eq!(
            redirect_location(&resolution),
            Some(("/evil.example/x", 302))
        );
        let resolution = route(&table, HttpRequestMethod::Get, "/go/docs/intro");
        assert_eq!(redirect_location(&resolution), Some(("/docs/intro", 302)));
    }

    #[test]
    fn test_method_not_allowed_on_page_type() {
        let routes = "/api/{} package:demo.api";
        let mut table = table(routes, RouteSettings::default().with_suffix(""));
        let get = HttpRequestMethod::Get;

        assert_eq!(page_name(&route(&table, get, "/api/Update")), Some("demo.api.Update"));

        table.tune_for_method_not_allowed();
        assert_eq!(route(&table, get, "/api/Update").status_code(), 405);
        assert_eq!(
            page_name(&route(&table, HttpRequestMethod::Post, "/api/Update")),
            Some("demo.api.Update")
        );
    }

    #[test]
    fn test_header_directives() {
        let routes = r#"
@header X-Frame-Options DENY
/admin/{} @header Cache-Control no-store
/{} package:demo.pages
"#;
        let table = table(routes, RouteSettings::default());

        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/subdir/");
        table.route(&mut ctx).unwrap();
        assert_eq!(
            ctx.response_headers(),
            &[("X-Frame-Options".to_string(), "DENY".to_string())]
        );

        let mut ctx = RequestContext::new(HttpRequestMethod::Get, "/admin/x");
        table.route(&mut ctx).unwrap();
        assert_eq!(ctx.response_headers().len(), 2);
    }

    #[test]
    fn test_variables_in_routes() {
        let mut variables = HashMap::new();
        variables.insert("pages".to_string(), "demo.pages".to_string());
        let table = RouteTableLoader::new(Arc::new(demo_registry()))
            .with_variables(variables)
            .load("/app/{} package:${pages}")
            .unwrap();
        assert_eq!(
            page_name(&route(&table, HttpRequestMethod::Get, "/app/subdir/")),
            Some("demo.pages.subdir.index")
        );
    }

    /// 大小写不敏感的注册表：路由引擎必须自行做精确名称比较
    struct CaseInsensitiveRegistry {
        types: HashMap<String, PageType>,
    }

    impl CaseInsensitiveRegistry {
        fn new(types: Vec<PageType>) -> Self {
            Self {
                types: types
                    .into_iter()
                    .map(|t| (t.name().to_lowercase(), t))
                    .collect(),
            }
        }
    }

    impl Registry for CaseInsensitiveRegistry {
        fn lookup_type(&self, name: &str) -> Option<&PageType> {
            self.types.get(&name.to_lowercase())
        }

        fn router(&self, _name: &str) -> Option<Arc<dyn Router>> {
            None
        }
    }

    #[test]
    fn test_case_insensitive_registry_needs_exact_name() {
        let registry = CaseInsensitiveRegistry::new(vec![
            PageType::page("demo.pages.pageOne", || Named),
            PageType::page("demo.pages.subdir.index", || Named),
        ]);
        let table = RouteTableLoader::new(Arc::new(registry))
            .with_settings(RouteSettings::default().with_suffix(""))
            .load("/{} package:demo.pages")
            .unwrap();
        let get = HttpRequestMethod::Get;

        assert_eq!(
            page_name(&route(&table, get, "/pageOne")),
            Some("demo.pages.pageOne")
        );
        assert!(matches!(route(&table, get, "/PAGEONE"), Resolution::NotFound));
        assert!(matches!(route(&table, get, "/SubDir/"), Resolution::NotFound));
    }
}
