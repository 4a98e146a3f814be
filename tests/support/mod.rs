//! In-process HTTP fakes shared by the integration suites.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chainscope_core::{HttpClient, HttpError, HttpRequest, HttpResponse, Router};

pub const VITALIK: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const NODE_URL: &str = "http://node.test:8545";

#[derive(Debug, Clone)]
enum Reply {
    Json(String),
    Status(u16),
    Transport(String),
}

#[derive(Debug)]
struct Route {
    fragment: String,
    replies: Vec<Reply>,
    served: usize,
}

/// Answers requests whose `url + body` contains a registered fragment.
///
/// Each route replays its replies in order and then repeats the last one.
/// Unmatched requests get a 404.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn json(self: &Arc<Self>, fragment: &str, body: &str) -> Arc<Self> {
        self.push(fragment, Reply::Json(body.to_owned()))
    }

    pub fn status(self: &Arc<Self>, fragment: &str, status: u16) -> Arc<Self> {
        self.push(fragment, Reply::Status(status))
    }

    pub fn transport_error(self: &Arc<Self>, fragment: &str, message: &str) -> Arc<Self> {
        self.push(fragment, Reply::Transport(message.to_owned()))
    }

    /// Number of requests whose `url + body` contained `fragment`.
    pub fn calls(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .iter()
            .filter(|request| haystack(request).contains(fragment))
            .count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .clone()
    }

    fn push(self: &Arc<Self>, fragment: &str, reply: Reply) -> Arc<Self> {
        {
            let mut routes = self.routes.lock().expect("routes should not be poisoned");
            match routes.iter_mut().find(|route| route.fragment == fragment) {
                Some(route) => route.replies.push(reply),
                None => routes.push(Route {
                    fragment: fragment.to_owned(),
                    replies: vec![reply],
                    served: 0,
                }),
            }
        }
        Arc::clone(self)
    }

    fn reply_for(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let text = haystack(request);
        let mut routes = self.routes.lock().expect("routes should not be poisoned");
        let Some(route) = routes
            .iter_mut()
            .find(|route| text.contains(route.fragment.as_str()))
        else {
            return Ok(HttpResponse::with_status(404, ""));
        };

        let index = route.served.min(route.replies.len() - 1);
        route.served += 1;
        match &route.replies[index] {
            Reply::Json(body) => Ok(HttpResponse::ok_json(body.clone())),
            Reply::Status(status) => Ok(HttpResponse::with_status(*status, "")),
            Reply::Transport(message) => Err(HttpError::new(message.clone())),
        }
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = self.reply_for(&request);
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(request);
        Box::pin(async move { reply })
    }
}

fn haystack(request: &HttpRequest) -> String {
    format!("{} {}", request.url, request.body.as_deref().unwrap_or(""))
}

/// Router over `http` with no keys and no node.
pub fn keyless_router(http: &Arc<ScriptedHttp>) -> Router {
    Router::builder().with_http_client(http.clone()).build()
}

pub fn coingecko_price(coin_id: &str, usd: f64) -> String {
    format!(
        r#"{{"{coin_id}":{{"usd":{usd},"usd_24h_change":1.5,"usd_market_cap":360000000000}}}}"#
    )
}

pub fn defillama_price(key: &str, price: f64) -> String {
    format!(r#"{{"coins":{{"{key}":{{"price":{price},"symbol":"X","confidence":0.99}}}}}}"#)
}

pub fn etherscan_ok(result: &str) -> String {
    format!(r#"{{"status":"1","message":"OK","result":{result}}}"#)
}

pub fn rpc_ok(result: &str) -> String {
    format!(r#"{{"jsonrpc":"2.0","id":1,"result":{result}}}"#)
}
