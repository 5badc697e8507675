use dirg::transport::{GridTransport, HttpReply};
use dirg::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// `GridTransport` over `window.fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct FetchTransport;

impl GridTransport for FetchTransport {
    async fn get(&self, url: &str) -> dirg::Result<HttpReply> {
        let resp = fetch(url, "GET", None).await.map_err(Error::Transport)?;
        let body = response_text(&resp).await.map_err(Error::Transport)?;
        Ok(HttpReply::new(resp.status(), body))
    }

    async fn post(&self, url: &str, content_type: &str, body: String) -> dirg::Result<()> {
        let resp = fetch(url, "POST", Some((content_type, body)))
            .await
            .map_err(Error::Transport)?;
        if resp.status() >= 400 {
            tracing::debug!("POST {} returned {}", url, resp.status());
        }
        Ok(())
    }
}

async fn fetch(
    url: &str,
    method: &str,
    body: Option<(&str, String)>,
) -> Result<web_sys::Response, String> {
    let window = web_sys::window().ok_or("no window".to_string())?;

    let init = web_sys::RequestInit::new();
    init.set_method(method);
    if let Some((content_type, body)) = body {
        let headers =
            web_sys::Headers::new().map_err(|_| "fetch: Headers::new failed".to_string())?;
        headers
            .set("Content-Type", content_type)
            .map_err(|_| "fetch: bad Content-Type".to_string())?;
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));
    }

    let req = web_sys::Request::new_with_str_and_init(url, &init)
        .map_err(|e| format!("fetch: bad request for {url}: {}", js_error_message(&e)))?;

    let v = JsFuture::from(window.fetch_with_request(&req))
        .await
        .map_err(|e| format!("fetch {url}: {}", js_error_message(&e)))?;
    v.dyn_into::<web_sys::Response>()
        .map_err(|_| "fetch: expected Response".to_string())
}

async fn response_text(resp: &web_sys::Response) -> Result<String, String> {
    let promise = resp
        .text()
        .map_err(|_| "fetch: body already used".to_string())?;
    let v = JsFuture::from(promise)
        .await
        .map_err(|e| format!("fetch: reading body failed: {}", js_error_message(&e)))?;
    Ok(v.as_string().unwrap_or_default())
}

fn js_error_message(v: &JsValue) -> String {
    if let Some(err) = v.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    v.as_string().unwrap_or_else(|| "unknown error".to_string())
}
