//! The seam between the sync loop and whatever actually speaks HTTP.
//!
//! The browser build implements this over `fetch`; tests script it in memory.
//! Futures are not `Send`: everything runs on a single-threaded event loop.

use crate::error::Result;

/// A completed HTTP exchange. Any status counts, including 4xx/5xx;
/// only failures that never produced a status are `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait GridTransport {
    async fn get(&self, url: &str) -> Result<HttpReply>;

    /// The reply is not interesting to the caller; errors are.
    async fn post(&self, url: &str, content_type: &str, body: String) -> Result<()>;
}

impl<T: GridTransport + ?Sized> GridTransport for &T {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        (**self).get(url).await
    }

    async fn post(&self, url: &str, content_type: &str, body: String) -> Result<()> {
        (**self).post(url, content_type, body).await
    }
}

impl<T: GridTransport + ?Sized> GridTransport for std::rc::Rc<T> {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        (**self).get(url).await
    }

    async fn post(&self, url: &str, content_type: &str, body: String) -> Result<()> {
        (**self).post(url, content_type, body).await
    }
}
