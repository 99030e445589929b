pub mod action;
pub mod config;
pub mod context;
pub mod exception;
pub mod loader;
pub mod mime;
pub mod param;
pub mod pattern;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod table;
pub mod util;

pub use action::{DirectoryListing, Resolution, RouteAction, StaticRoot};
pub use context::RequestContext;
pub use exception::Exception;
pub use loader::RouteTableLoader;
pub use mime::MimeTypes;
pub use param::{HttpRequestMethod, HttpVersion};
pub use pattern::{RouteMatch, RoutePattern};
pub use registry::{Page, PageRegistry, PageType, Registry, Router};
pub use request::Request;
pub use resolver::PackageResolver;
pub use response::Response;
pub use table::{RouteSettings, RouteTable};
pub use util::HtmlBuilder;
