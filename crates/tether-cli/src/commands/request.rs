//! Request command - one call through the resilient request layer.

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tether_config::Config;
use tether_core::{HttpResponse, Method};
use tether_request::{RequestDescriptor, ReqwestTransport, ResilientRequest};
use url::Url;

use crate::config_bridge;
use crate::theme::Theme;

/// What to send.
pub(crate) struct RequestArgs {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Option<String>,
    pub(crate) cache: bool,
}

fn build_descriptor(base_url: &str, args: RequestArgs) -> anyhow::Result<RequestDescriptor> {
    let url = Url::parse(base_url)
        .and_then(|base| base.join(&args.path))
        .with_context(|| format!("cannot resolve '{}' against {base_url}", args.path))?;

    let mut descriptor = RequestDescriptor::new(args.method, url.as_str());
    if let Some(body) = args.body {
        let body: Value = serde_json::from_str(&body).context("--body is not valid JSON")?;
        descriptor = descriptor.with_body(body);
    }
    if args.cache {
        descriptor = descriptor.read_through();
    }
    Ok(descriptor)
}

fn render_body(response: &HttpResponse) -> String {
    response
        .json::<Value>()
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| response.body.clone())
}

/// Execute the request and print the status and body.
pub(crate) async fn run_request(config: &Config, args: RequestArgs) -> anyhow::Result<()> {
    let descriptor = build_descriptor(&config.server.base_url, args)?;

    let transport = ReqwestTransport::with_timeout(config.request.timeout())?;
    let requests = ResilientRequest::new(Arc::new(transport))
        .with_config(config_bridge::request_config(config))
        .with_credentials(config_bridge::credentials(config));

    let response = requests.execute(descriptor).await?;
    eprintln!("{}", Theme::success(&format!("HTTP {}", response.status)));
    println!("{}", render_body(&response));
    Ok(())
}
