//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookfinder_core::transport::{
    Method, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse,
};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// A canned response served by [`StubTransport`].
#[derive(Debug, Clone)]
pub struct StubReply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub chunks: Vec<Bytes>,
    /// Fail the body read once the chunks run out.
    pub reset_after_chunks: bool,
}

impl StubReply {
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            chunks: Vec::new(),
            reset_after_chunks: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok()
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn chunk(mut self, bytes: impl Into<Bytes>) -> Self {
        self.chunks.push(bytes.into());
        self
    }

    pub fn reset_after_chunks(mut self) -> Self {
        self.reset_after_chunks = true;
        self
    }
}

/// Observations about one served body.
#[derive(Debug, Default)]
pub struct BodyProbe {
    closed: AtomicBool,
    chunks_served: AtomicUsize,
}

impl BodyProbe {
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn chunks_served(&self) -> usize {
        self.chunks_served.load(Ordering::SeqCst)
    }
}

struct StubBody {
    chunks: VecDeque<Bytes>,
    reset_after_chunks: bool,
    probe: Arc<BodyProbe>,
}

#[async_trait]
impl ResponseBody for StubBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        if self.probe.closed() {
            return Ok(None);
        }
        let next = self.chunks.pop_front();
        if next.is_some() {
            self.probe.chunks_served.fetch_add(1, Ordering::SeqCst);
        } else if self.reset_after_chunks {
            return Err(TransportError::network("stub", "connection reset by peer"));
        }
        Ok(next)
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// In-memory transport: routes by method and exact URL, records every request.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<(Method, String, StubReply)>>,
    sent: Mutex<Vec<TransportRequest>>,
    probes: Mutex<Vec<(Method, String, Arc<BodyProbe>)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, method: Method, url: &str, reply: StubReply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((method, url.to_string(), reply));
        self
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Probe of the last body served for `method` + `url`.
    pub fn probe(&self, method: Method, url: &str) -> Arc<BodyProbe> {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, u, _)| *m == method && u == url)
            .map(|(_, _, probe)| Arc::clone(probe))
            .expect("no body served for route")
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let key = request.url.to_string();
        let reply = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(method, url, _)| *method == request.method && *url == key)
            .map(|(_, _, reply)| reply.clone())
            .unwrap_or_else(|| StubReply::status(404));

        let mut headers = HeaderMap::new();
        for (name, value) in &reply.headers {
            headers.insert(
                HeaderName::from_str(name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let probe = Arc::new(BodyProbe::default());
        self.probes
            .lock()
            .unwrap()
            .push((request.method, key, Arc::clone(&probe)));
        let body = StubBody {
            chunks: reply.chunks.into_iter().collect(),
            reset_after_chunks: reply.reset_after_chunks,
            probe,
        };
        Ok(TransportResponse::new(
            reply.status,
            request.url,
            headers,
            Box::new(body),
        ))
    }
}

/// Transport whose every request panics, for worker-failure tests.
pub struct PanickingTransport;

#[async_trait]
impl Transport for PanickingTransport {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
        panic!("transport exploded");
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}
