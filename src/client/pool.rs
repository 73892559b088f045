//! Round-robin endpoint pool.

use std::collections::VecDeque;

use super::RequestError;

/// Ordered backend base URLs. Never empty.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    urls: VecDeque<String>,
}

impl EndpointPool {
    pub fn new<I, S>(urls: I) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: VecDeque<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(RequestError::EmptyPool);
        }
        Ok(Self { urls })
    }

    /// Return the head endpoint and move it to the tail.
    pub fn rotate(&mut self) -> String {
        let url = self.urls[0].clone();
        self.urls.rotate_left(1);
        url
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}
