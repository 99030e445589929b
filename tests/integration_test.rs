// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::fs::{self, File};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pagerouter::{
    mime::MimeTypes,
    registry::{Page, PageRegistry, PageType},
    request::Request,
    response::Response,
    param::HttpRequestMethod,
    RequestContext, RouteSettings, RouteTable, RouteTableLoader,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Hello;

impl Page for Hello {
    fn handle(&mut self, ctx: &RequestContext) -> String {
        format!("<p>hello {}</p>", ctx.param("name").unwrap_or("index"))
    }
}

/// 在随机端口上启动一个最小宿主，每个连接只处理一个请求
async fn spawn_server(table: RouteTable) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let table = Arc::new(table);
    let mime = Arc::new(MimeTypes::new());
    tokio::spawn(async move {
        let mut id: u128 = 0;
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let table = Arc::clone(&table);
            let mime = Arc::clone(&mime);
            tokio::spawn(async move {
                let mut buffer = vec![0; 4096];
                let n = stream.read(&mut buffer).await.unwrap_or(0);
                let response = match Request::try_from(&buffer[..n], id) {
                    Ok(request) => {
                        let mut ctx = RequestContext::from(&request);
                        match table.route(&mut ctx) {
                            Ok(resolution) => Response::from_resolution(resolution, &ctx, &mime, id),
                            Err(e) => Response::from_exception(&e),
                        }
                    }
                    Err(e) => Response::from_exception(&e),
                };
                let _ = stream.write_all(&response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
            id += 1;
        }
    });
    addr
}

async fn send_request(addr: SocketAddr, request: &str) -> Result<String, String> {
    let mut stream = TcpStream::connect(addr).await.map_err(|e| e.to_string())?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| e.to_string())?;

    let mut buffer = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buffer))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

fn parse_response(response: &str) -> (u16, Vec<(String, String)>, String) {
    let (head, body) = response.split_once("\r\n\r\n").unwrap_or((response, ""));
    let lines: Vec<&str> = head.split("\r\n").collect();

    // 解析状态行
    let status_code = lines[0]
        .split_whitespace()
        .nth(1)
        .unwrap_or("0")
        .parse::<u16>()
        .unwrap_or(0);

    // 解析头部
    let headers = lines[1..]
        .iter()
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    (status_code, headers, body.to_string())
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn demo_table(static_root: &str) -> RouteTable {
    let mut registry = PageRegistry::new();
    registry
        .register(PageType::page("demo.pages.index", || Hello))
        .register(PageType::page("demo.pages.subdir.index", || Hello))
        .register(PageType::page("demo.pages.Hello", || Hello))
        .register(PageType::page("demo.api.Update", || Hello).with_methods(&[HttpRequestMethod::Post]));
    let routes = format!(
        r#"
@header X-Content-Type-Options nosniff
/hello/{{name}}     demo.pages.Hello
POST /api/update    demo.api.Update
/old/{{}}           redirect:/new/{{}} 301
/files/{{}}         static:{} listing
/{{}}               package:demo.pages
"#,
        static_root
    );
    RouteTableLoader::new(Arc::new(registry))
        .with_settings(RouteSettings::default().with_method_not_allowed(true))
        .load(&routes)
        .unwrap()
}

fn static_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut file = File::create(dir.path().join("app.js")).unwrap();
    write!(file, "console.log(1);").unwrap();
    fs::create_dir(dir.path().join("img")).unwrap();
    dir
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_page_with_param() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "GET /hello/ann HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, 200);
        assert_eq!(header(&headers, "Server"), Some("pagerouter"));
        assert_eq!(header(&headers, "X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(body, "<p>hello ann</p>");
    }

    #[tokio::test]
    async fn test_head_request() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "HEAD / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, 200);
        assert_eq!(header(&headers, "Content-Length"), Some("18"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_index_redirect() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "GET /subdir?x=y HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, _) = parse_response(&response);
        assert_eq!(status, 302);
        assert_eq!(header(&headers, "Location"), Some("/subdir/?x=y"));
    }

    #[tokio::test]
    async fn test_redirect_route() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "GET /old/a/b HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, _) = parse_response(&response);
        assert_eq!(status, 301);
        assert_eq!(header(&headers, "Location"), Some("/new/a/b"));
    }

    #[tokio::test]
    async fn test_405_with_allow() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "GET /api/update HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, _) = parse_response(&response);
        assert_eq!(status, 405);
        assert_eq!(header(&headers, "Allow"), Some("POST"));

        let response = send_request(addr, "POST /api/update HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(parse_response(&response).0, 200);
    }

    #[tokio::test]
    async fn test_404_not_found() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "GET /nope/ HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, 404);
        assert_eq!(header(&headers, "Content-Type"), Some("text/html;charset=utf-8"));
        assert!(body.contains("404"));
    }

    #[tokio::test]
    async fn test_static_file_and_listing() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;

        let response = send_request(addr, "GET /files/app.js HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, 200);
        assert!(header(&headers, "Content-Type").unwrap().contains("javascript"));
        assert_eq!(body, "console.log(1);");

        let response = send_request(addr, "GET /files/img HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let (status, headers, _) = parse_response(&response);
        assert_eq!(status, 302);
        assert_eq!(header(&headers, "Location"), Some("/files/img/"));

        let response = send_request(
            addr,
            "GET /files/ HTTP/1.1\r\nHost: localhost\r\nAccept: application/json\r\n\r\n",
        )
        .await
        .unwrap();
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, 200);
        assert_eq!(header(&headers, "Content-Type"), Some("application/json"));
        let listing: serde_json::Value = serde_json::from_str(&body).unwrap();
        let names: Vec<&str> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"app.js"));
        assert!(names.contains(&"img"));
    }

    #[tokio::test]
    async fn test_bad_request() {
        let dir = static_tree();
        let addr = spawn_server(demo_table(&dir.path().display().to_string())).await;
        let response = send_request(addr, "BREW /pot HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(parse_response(&response).0, 400);
    }

    #[test]
    fn test_parse_response_with_headers() {
        let response = "HTTP/1.1 302 Found\r\nLocation: /x/\r\nContent-Length: 0\r\n\r\n";
        let (status, headers, body) = parse_response(response);
        assert_eq!(status, 302);
        assert_eq!(header(&headers, "location"), Some("/x/"));
        assert!(body.is_empty());
    }
}
