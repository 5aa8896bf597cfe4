// Realtime readings over GraphQL subscriptions (GraphQL over Server-Sent Events)
use crate::application::reading_feed::{ReadingFeed, ReadingStream};
use crate::domain::device::DevAddr;
use crate::domain::reading::SensorReading;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

const SUBSCRIPTION: &str = r#"subscription OnNodeDataAdded($DevAddr: Int!) {
  onNodeDataAdded(DevAddr: $DevAddr) {
    DevAddr
    timestamp
    co2
    battery
    fire
    humidity
    maxT
    temperature
  }
}"#;

#[derive(Debug, Clone)]
pub struct GraphQlFeed {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphQlFeed {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl ReadingFeed for GraphQlFeed {
    async fn subscribe(&self, dev_addr: DevAddr, bearer: &str) -> Result<ReadingStream> {
        let body = serde_json::json!({
            "query": SUBSCRIPTION,
            "variables": { "DevAddr": dev_addr.get() },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, bearer)
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .context("Failed to open subscription")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Subscription rejected with status {}: {}", status, body);
        }

        let mut chunks = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut decoder = SseDecoder::default();
            'events: while let Some(chunk) = chunks.next().await {
                let chunk = chunk.context("Subscription stream failed")?;
                for event in decoder.feed(&chunk) {
                    match interpret(&event)? {
                        FeedEvent::Reading(reading) => {
                            if reading.dev_addr.is_some_and(|a| a != dev_addr.get()) {
                                tracing::warn!(
                                    "Ignoring reading for device {:?} on subscription for {}",
                                    reading.dev_addr,
                                    dev_addr
                                );
                                continue;
                            }
                            yield reading;
                        }
                        FeedEvent::Complete => break 'events,
                        FeedEvent::Ignored => {}
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// One Server-Sent Event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Splits a byte stream into events. Chunks may end anywhere, including
/// mid-line or mid-character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((end, separator)) = find_boundary(&self.buffer) {
            let block = self.buffer.split_to(end + separator);
            let text = String::from_utf8_lossy(&block[..end]);
            if let Some(event) = parse_block(&text) {
                events.push(event);
            }
        }
        events
    }
}

fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_block(text: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data = Vec::new();
    for line in text.lines() {
        // Comments start with ':' and serve as keep-alives
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

#[derive(Debug, PartialEq)]
enum FeedEvent {
    Reading(SensorReading),
    Complete,
    Ignored,
}

#[derive(Debug, Deserialize)]
struct GraphQlPayload {
    #[serde(default)]
    data: Option<SubscriptionData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionData {
    #[serde(rename = "onNodeDataAdded", default)]
    on_node_data_added: Option<SensorReading>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn interpret(event: &SseEvent) -> Result<FeedEvent> {
    match event.event.as_deref() {
        Some("complete") => Ok(FeedEvent::Complete),
        Some("next") | None => {
            if event.data.is_empty() {
                return Ok(FeedEvent::Ignored);
            }
            let payload: GraphQlPayload =
                serde_json::from_str(&event.data).context("Malformed subscription payload")?;
            if let Some(error) = payload.errors.as_ref().and_then(|e| e.first()) {
                anyhow::bail!("GraphQL error: {}", error.message);
            }
            match payload.data.and_then(|d| d.on_node_data_added) {
                Some(reading) => Ok(FeedEvent::Reading(reading)),
                None => {
                    tracing::warn!("Subscription message without data: {}", event.data);
                    Ok(FeedEvent::Ignored)
                }
            }
        }
        Some(other) => {
            tracing::debug!("Ignoring subscription event {:?}", other);
            Ok(FeedEvent::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"event: next\nda").is_empty());
        assert!(decoder.feed(b"ta: {\"a\":1}\n").is_empty());
        let events = decoder.feed(b"\n: keep-alive\n\nevent: complete\r\n\r\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("next".to_string()),
                    data: "{\"a\":1}".to_string(),
                },
                SseEvent {
                    event: Some("complete".to_string()),
                    data: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: line one\ndata:line two\n\n");
        assert_eq!(events[0].event, None);
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn test_split_utf8_character() {
        let payload = "data: CO₂\n\n".as_bytes();
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(&payload[..9]).is_empty());
        let events = decoder.feed(&payload[9..]);
        assert_eq!(events[0].data, "CO₂");
    }

    #[test]
    fn test_interpret_reading() {
        let event = SseEvent {
            event: Some("next".to_string()),
            data: r#"{"data":{"onNodeDataAdded":{"DevAddr":1,"temperature":45,"fire":false}}}"#
                .to_string(),
        };
        let FeedEvent::Reading(reading) = interpret(&event).unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(reading.temperature, Some(45.0));
        assert_eq!(reading.fire, Some(false));
    }

    #[test]
    fn test_interpret_errors_and_control_events() {
        let error = SseEvent {
            event: Some("next".to_string()),
            data: r#"{"errors":[{"message":"Unauthorized"}]}"#.to_string(),
        };
        let err = interpret(&error).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));

        let empty = SseEvent {
            event: Some("next".to_string()),
            data: r#"{"data":{"onNodeDataAdded":null}}"#.to_string(),
        };
        assert_eq!(interpret(&empty).unwrap(), FeedEvent::Ignored);

        let complete = SseEvent {
            event: Some("complete".to_string()),
            data: String::new(),
        };
        assert_eq!(interpret(&complete).unwrap(), FeedEvent::Complete);

        let garbage = SseEvent {
            event: None,
            data: "not json".to_string(),
        };
        assert!(interpret(&garbage).is_err());
    }
}
