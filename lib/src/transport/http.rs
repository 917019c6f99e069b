//! Blocking HTTP transport with conservative content negotiation.
//!
//! The response format is taken from the media type first, then from the URL extension,
//! and finally from light-weight content sniffing, so servers with imperfect metadata
//! still work.

use super::{Payload, Transport};
use crate::config::Config;
use crate::errors::TransportError;
use log::{debug, warn};
use oxigraph::io::RdfFormat;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Refuse every request when `true`.
    pub offline: bool,
    pub timeout: Duration,
    pub user_agent: String,
    /// Media types to negotiate, highest priority first.
    pub accept_order: Vec<&'static str>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        const DEFAULT_ACCEPT: &[&str] = &[
            "application/rdf+xml",
            "text/turtle",
            "text/n3",
            "application/n-triples",
            "application/ld+json",
            "application/xhtml+xml",
        ];
        Self {
            offline: false,
            timeout: Duration::from_secs(30),
            user_agent: crate::consts::USER_AGENT.to_string(),
            accept_order: DEFAULT_ACCEPT.to_vec(),
        }
    }
}

impl From<&Config> for HttpOptions {
    fn from(config: &Config) -> Self {
        HttpOptions {
            offline: config.offline,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            ..HttpOptions::default()
        }
    }
}

/// Builds a weighted `Accept` header string honoring the provided priority order.
fn build_accept(accept_order: &[&'static str]) -> String {
    if accept_order.is_empty() {
        return "*/*".to_string();
    }
    let mut parts = Vec::new();
    let mut q = 1.0f32;
    for t in accept_order {
        parts.push(format!("{t}; q={:.1}", q));
        q = (q - 0.1f32).max(0.1f32);
    }
    parts.push("*/*; q=0.1".to_string());
    parts.join(", ")
}

/// Attempts to identify an RDF serialization from the supplied media type.
fn detect_format(ct: &str) -> Option<RdfFormat> {
    let ct = ct.split(';').next().unwrap_or(ct).trim();
    match ct {
        // many servers don't negotiate and answer RDF/XML as text/plain
        "text/plain" => Some(RdfFormat::RdfXml),
        "text/rdf+n3" => Some(RdfFormat::N3),
        _ => RdfFormat::from_media_type(ct),
    }
}

/// Attempts to infer an RDF format from the URL path extension.
fn detect_format_from_url(url: &str) -> Option<RdfFormat> {
    let trimmed = url.split('#').next().unwrap_or(url);
    let path = trimmed.split('?').next().unwrap_or(trimmed);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext {
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            other => RdfFormat::from_extension(other),
        })
}

/// Last-resort guess at the RDF serialization by peeking at the payload.
fn sniff_format(bytes: &[u8]) -> Option<RdfFormat> {
    let sample_len = bytes.len().min(4096);
    let sample = &bytes[..sample_len];
    // the cut may split a multi-byte character
    let sample = std::str::from_utf8(sample)
        .or_else(|e| std::str::from_utf8(&sample[..e.valid_up_to()]))
        .ok()?;
    let trimmed = sample.trim_start();

    if trimmed.starts_with('{') && sample.contains("\"@context\"") {
        return detect_format("application/ld+json");
    }
    if trimmed.starts_with('<') && (sample.contains("<rdf:RDF") || sample.contains("xmlns:rdf")) {
        return Some(RdfFormat::RdfXml);
    }
    if sample.contains("@prefix") || sample.contains("@base") || sample.contains("PREFIX ") {
        return Some(RdfFormat::Turtle);
    }
    None
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    if let Some(status) = err.status() {
        return TransportError::Status(status.as_u16());
    }
    TransportError::Io(err.to_string())
}

pub struct HttpTransport {
    options: HttpOptions,
    client: Option<Client>,
    content_type: Option<String>,
}

impl HttpTransport {
    pub fn new(options: HttpOptions) -> Self {
        HttpTransport {
            options,
            client: None,
            content_type: None,
        }
    }

    fn client(&mut self) -> Result<&Client, TransportError> {
        if self.client.is_none() {
            let client = Client::builder()
                .timeout(self.options.timeout)
                .build()
                .map_err(classify)?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| TransportError::Io("HTTP client unavailable".to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(HttpOptions::default())
    }
}

impl Transport for HttpTransport {
    fn fetch(&mut self, iri: &str) -> Result<Payload, TransportError> {
        if self.options.offline {
            return Err(TransportError::Offline(iri.to_string()));
        }
        let accept = build_accept(&self.options.accept_order);
        let user_agent = self.options.user_agent.clone();
        let resp = self
            .client()?
            .get(iri)
            .header(ACCEPT, accept)
            .header(USER_AGENT, user_agent)
            .send()
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes().map_err(classify)?.to_vec();

        let mut format = content_type.as_deref().and_then(detect_format);
        if format.is_none() {
            format = detect_format_from_url(&final_url);
        }
        if format.is_none() {
            format = sniff_format(&bytes);
        }
        match format {
            Some(f) => debug!("{} negotiated as {}", iri, f.media_type()),
            None => warn!("{:?} from {} is not a supported RDF format", content_type, iri),
        }
        self.content_type = format.map(|f| f.media_type().to_string());
        Ok(Payload {
            bytes,
            format,
            content_type,
        })
    }

    fn store(&mut self, iri: &str, payload: &Payload) -> Result<(), TransportError> {
        if self.options.offline {
            return Err(TransportError::Offline(iri.to_string()));
        }
        let content_type = payload
            .format
            .map(|f| f.media_type().to_string())
            .or_else(|| self.content_type.clone())
            .ok_or_else(|| {
                TransportError::Negotiation(format!("no content type known for {iri}"))
            })?;
        let user_agent = self.options.user_agent.clone();
        let resp = self
            .client()?
            .put(iri)
            .header(CONTENT_TYPE, content_type)
            .header(USER_AGENT, user_agent)
            .body(payload.bytes.clone())
            .send()
            .map_err(classify)?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "HttpTransport"
    }
}
