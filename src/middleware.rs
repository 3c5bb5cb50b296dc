//! HTTP handler instrumentation.
//!
//! Framework-agnostic wrapper over `http` request types: request metadata is
//! extracted up front (headers reshaped into the fixed `HTTP_`-prefix CGI
//! mapping, query parameters, full URL), the handler runs under a panic
//! guard, and a panic is notified with that metadata, flushed, then
//! re-raised unchanged.

use crate::client::Client;
use crate::fault::Fault;
use crate::notice::{CgiData, Extra, Params};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Reshape request headers into CGI-style variables: upper-cased, dashes
/// replaced with underscores, prefixed with `HTTP_`. The first value wins
/// for repeated header names.
pub fn cgi_data(headers: &http::HeaderMap) -> CgiData {
    let mut cgi = CgiData::new();
    for (name, value) in headers {
        let key = format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_"));
        if let Ok(value) = value.to_str() {
            cgi.set(key, value);
        }
    }
    cgi
}

/// Query parameters of `uri`, decoded from its query string.
pub fn query_params(uri: &http::Uri) -> Params {
    let mut params = Params::new();
    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.add(key, value);
        }
    }
    params
}

/// The extras a wrapped handler reports on panic: query parameters, CGI
/// data, and the request URL.
pub fn request_extras<B>(request: &http::Request<B>) -> Vec<Extra> {
    vec![
        Extra::Params(query_params(request.uri())),
        Extra::CgiData(cgi_data(request.headers())),
        Extra::Url(request.uri().to_string()),
    ]
}

/// Wrap a request handler so that a panic inside it is reported with the
/// request's metadata, flushed, and then re-raised unchanged.
pub fn wrap<B, R, H>(client: Arc<Client>, handler: H) -> impl Fn(http::Request<B>) -> R
where
    H: Fn(http::Request<B>) -> R,
{
    move |request: http::Request<B>| {
        let extras = request_extras(&request);
        match catch_unwind(AssertUnwindSafe(|| handler(request))) {
            Ok(response) => response,
            Err(payload) => {
                let fault = Fault::of_panic(payload.as_ref(), 1);
                if let Err(err) = client.notify_fault(fault, extras) {
                    client.logger().log(&format!("panic notify error: {err}"));
                }
                client.flush();
                resume_unwind(payload)
            }
        }
    }
}
