// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面路由演示服务器
//!
//! 基于 Tokio 运行时的多线程 HTTP 宿主，把每个请求交给路由表解析：
//! - 启动时从 TOML 配置与路由文件构建只读的 `RouteTable`
//! - 注册一组演示页面，供 `package:` 与页面类型路由使用
//! - 后台管理控制台（CLI 指令交互）

use pagerouter::{
    config::Config,
    exception::Exception,
    loader::RouteTableLoader,
    mime::MimeTypes,
    param::HttpRequestMethod,
    registry::{Page, PageRegistry, PageType},
    request::Request,
    response::Response,
    table::{RouteSettings, RouteTable},
    RequestContext,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    path::Path,
    process,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};

fn main() {
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
        process::exit(1);
    }

    let config = match Config::from_toml("config/development.toml") {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let mut registry = PageRegistry::new();
    register_demo_pages(&mut registry);
    info!("已注册{}个页面类型", registry.len());

    // 路由文件有任何错误都直接终止启动
    let table = match RouteTableLoader::new(Arc::new(registry))
        .with_settings(RouteSettings::from(config.routing()))
        .with_variables(config.variables().clone())
        .load_file(Path::new(config.routes_file()))
    {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let mime = Arc::new(MimeTypes::with_overrides(config.mime()));

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            process::exit(1);
        }
    };
    info!("工作线程数：{}", config.worker_threads());

    runtime.block_on(serve(config, table, mime));
}

async fn serve(config: Config, table: Arc<RouteTable>, mime: Arc<MimeTypes>) {
    let port: u16 = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let socket = SocketAddrV4::new(address, port);

    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            return;
        }
    };
    info!("端口{}绑定完成", port);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let active_connection = Arc::new(AtomicU32::new(0));

    tokio::spawn({
        let shutdown_flag = Arc::clone(&shutdown_flag);
        let active_connection = Arc::clone(&active_connection);
        let table = Arc::clone(&table);
        async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                match reader.read_line(&mut input).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let cmd = input.trim();
                match cmd {
                    "stop" => {
                        shutdown_flag.store(true, Ordering::SeqCst);
                        println!("停机指令已激活，服务器将在处理完下一个请求后关闭...");
                        break;
                    }
                    "help" => {
                        println!("== pagerouter Help ==");
                        println!("stop   - 发出停机信号");
                        println!("status - 查看当前服务器运行状态");
                        println!("routes - 列出路由表");
                        println!("help   - 显示此帮助信息");
                        println!("=====================");
                    }
                    "status" => {
                        println!("== pagerouter 状态 ==");
                        println!("当前活跃连接数: {}", active_connection.load(Ordering::SeqCst));
                        println!("路由条目数: {}", table.len());
                        println!("=====================");
                    }
                    "routes" => {
                        for (method, pattern, action) in table.routes() {
                            let method = method.map(|m| m.to_string()).unwrap_or_default();
                            println!("{:<8}{:<32}{}", method, pattern, action);
                        }
                    }
                    "" => {}
                    _ => {
                        println!("无效的命令：{}", cmd);
                    }
                }
            }
        }
    });

    let mut id: u128 = 0;

    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            info!("主循环接收到停机指令，正在退出...");
            break;
        }

        let (mut stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("接受连接失败：{}", e);
                continue;
            }
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let active_connection = Arc::clone(&active_connection);
        let table = Arc::clone(&table);
        let mime = Arc::clone(&mime);

        tokio::spawn(async move {
            active_connection.fetch_add(1, Ordering::SeqCst);
            handle_connection(&mut stream, id, &table, &mime).await;
            active_connection.fetch_sub(1, Ordering::SeqCst);
        });
        id += 1;
    }
}

async fn handle_connection(stream: &mut TcpStream, id: u128, table: &RouteTable, mime: &MimeTypes) {
    let mut buffer = vec![0; 4096];

    if let Err(e) = stream.readable().await {
        error!("[ID{}]等待TCPStream可读时遇到错误: {}", id, e);
        return;
    }
    match stream.try_read(&mut buffer) {
        Ok(0) => return,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
        _ => {}
    }

    let start_time = Instant::now();

    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = Response::from_exception(&e);
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
    };

    let mut ctx = RequestContext::from(&request);
    let response = match table.route(&mut ctx) {
        Ok(resolution) => Response::from_resolution(resolution, &ctx, mime, id),
        Err(e @ Exception::PathTraversal(_)) => {
            warn!("[ID{}]拒绝请求{}：{}", id, request.path(), e);
            Response::from_exception(&e)
        }
        Err(e) => {
            error!("[ID{}]路由{}时出错：{}", id, request.path(), e);
            Response::from_exception(&e)
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    if let Err(e) = stream.write_all(&response.as_bytes()).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

struct IndexPage;

impl Page for IndexPage {
    fn handle(&mut self, ctx: &RequestContext) -> String {
        format!(
            "<h1>pagerouter</h1><p>当前路径：{}</p><ul><li><a href=\"/pageOne.html\">pageOne</a></li><li><a href=\"/subdir/\">subdir</a></li></ul>",
            pagerouter::util::escape_html(ctx.path())
        )
    }
}

struct PageOne {
    visits: u32,
}

impl Page for PageOne {
    fn handle(&mut self, _ctx: &RequestContext) -> String {
        self.visits += 1;
        format!("<h1>Page One</h1><p>本实例处理的请求数：{}</p>", self.visits)
    }
}

struct SubdirIndex;

impl Page for SubdirIndex {
    fn handle(&mut self, ctx: &RequestContext) -> String {
        let query = ctx.query().unwrap_or("");
        format!(
            "<h1>subdir</h1><p>查询字符串：{}</p>",
            pagerouter::util::escape_html(query)
        )
    }
}

struct Greeting;

impl Page for Greeting {
    fn handle(&mut self, ctx: &RequestContext) -> String {
        let name = ctx.param("name").unwrap_or("world");
        format!("<h1>Hello, {}!</h1>", pagerouter::util::escape_html(name))
    }
}

struct UpdateApi;

impl Page for UpdateApi {
    fn handle(&mut self, ctx: &RequestContext) -> String {
        format!("<p>已处理{}请求</p>", ctx.method())
    }
}

fn register_demo_pages(registry: &mut PageRegistry) {
    registry
        .register(PageType::page("demo.pages.index", || IndexPage))
        .register(PageType::page("demo.pages.pageOne", || PageOne { visits: 0 }))
        .register(PageType::page("demo.pages.subdir.index", || SubdirIndex))
        .register(PageType::page("demo.pages.Greeting", || Greeting))
        .register(
            PageType::page("demo.api.Update", || UpdateApi).with_methods(&[HttpRequestMethod::Post]),
        )
        .register(PageType::other("demo.pages.Helpers"));
}
