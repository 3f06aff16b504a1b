//! Incremental decoder for `text/event-stream` bodies
//!
//! Bytes arrive in arbitrary chunks; the decoder buffers partial lines and
//! hands back complete frame payloads. Bare JSON lines outside an event are
//! accepted as frames too, so NDJSON backends work unchanged.

/// Upper bound on a single frame payload
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

/// Output of the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    /// Data of one `message` frame
    Frame(String),
    /// Frame dropped by the decoder
    Rejected(String),
}

#[derive(Debug)]
pub struct SseDecoder {
    max_frame_bytes: usize,
    pending: Vec<u8>,
    data: Option<String>,
    event: Option<String>,
    /// Dropping the rest of an oversized line
    discarding: bool,
}

impl SseDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            pending: Vec::new(),
            data: None,
            event: None,
            discarding: false,
        }
    }

    /// Feed a chunk, returning every item it completed
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        let mut items = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            match chunk.iter().position(|byte| *byte == b'\n') {
                Some(newline_idx) => {
                    self.discarding = false;
                    chunk = &chunk[newline_idx + 1..];
                }
                None => return items,
            }
        }

        self.pending.extend_from_slice(chunk);

        while let Some(newline_idx) = self.pending.iter().position(|byte| *byte == b'\n') {
            let mut line = self.pending.drain(..=newline_idx).collect::<Vec<u8>>();
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            self.process_line(&line, &mut items);
        }

        if self.pending.len() > self.max_frame_bytes {
            items.push(SseItem::Rejected(format!(
                "line of {} bytes exceeds limit of {}",
                self.pending.len(),
                self.max_frame_bytes
            )));
            self.pending.clear();
            self.discarding = true;
        }

        items
    }

    /// Flush whatever is left once the body ends
    pub fn finish(&mut self) -> Vec<SseItem> {
        let mut items = Vec::new();
        self.discarding = false;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(line.trim_end_matches('\r'), &mut items);
        }
        self.dispatch(&mut items);
        items
    }

    fn process_line(&mut self, line: &str, items: &mut Vec<SseItem>) {
        if line.is_empty() {
            self.dispatch(items);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if line.starts_with('{') && self.data.is_none() {
            self.emit(line.to_string(), items);
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                let data = self.data.get_or_insert_with(String::new);
                data.push_str(value);
                data.push('\n');
                if data.len() > self.max_frame_bytes {
                    let size = data.len();
                    self.data = None;
                    self.event = None;
                    items.push(SseItem::Rejected(format!(
                        "frame of {size} bytes exceeds limit of {}",
                        self.max_frame_bytes
                    )));
                }
            }
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self, items: &mut Vec<SseItem>) {
        let event = self.event.take();
        let Some(mut data) = self.data.take() else {
            return;
        };
        if data.ends_with('\n') {
            data.pop();
        }
        if data.is_empty() {
            return;
        }
        match event.as_deref() {
            None | Some("") | Some("message") => self.emit(data, items),
            Some(_) => {}
        }
    }

    fn emit(&self, data: String, items: &mut Vec<SseItem>) {
        if data.len() > self.max_frame_bytes {
            items.push(SseItem::Rejected(format!(
                "frame of {} bytes exceeds limit of {}",
                data.len(),
                self.max_frame_bytes
            )));
        } else {
            items.push(SseItem::Frame(data));
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(items: Vec<SseItem>) -> Vec<String> {
        items
            .into_iter()
            .filter_map(|item| match item {
                SseItem::Frame(data) => Some(data),
                SseItem::Rejected(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::default();
        let items = decoder.push_chunk(b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(items, vec![SseItem::Frame("{\"type\":\"done\"}".into())]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"type\":").is_empty());
        assert!(decoder.push_chunk(b"\"heartbeat\"}\n").is_empty());
        let items = decoder.push_chunk(b"\n");
        assert_eq!(frames(items), vec!["{\"type\":\"heartbeat\"}"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let payload = "data: {\"message\":\"Working…\"}\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xE2).unwrap() + 1;

        let mut items = decoder.push_chunk(&payload[..split]);
        items.extend(decoder.push_chunk(&payload[split..]));
        assert_eq!(frames(items), vec!["{\"message\":\"Working…\"}"]);
    }

    #[test]
    fn test_crlf_comments_and_ignored_fields() {
        let mut decoder = SseDecoder::default();
        let body = b": keep-alive\r\nid: 7\r\nretry: 1000\r\ndata: {\"a\":1}\r\n\r\n";
        assert_eq!(frames(decoder.push_chunk(body)), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::default();
        let items = decoder.push_chunk(b"data: {\"a\":\ndata: 1}\n\n");
        assert_eq!(frames(items), vec!["{\"a\":\n1}"]);
    }

    #[test]
    fn test_named_events_are_skipped() {
        let mut decoder = SseDecoder::default();
        let body = b"event: ping\ndata: {}\n\nevent: message\ndata: {\"b\":2}\n\n";
        assert_eq!(frames(decoder.push_chunk(body)), vec!["{\"b\":2}"]);
    }

    #[test]
    fn test_ndjson_lines() {
        let mut decoder = SseDecoder::default();
        let items = decoder.push_chunk(b"{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(frames(items), vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn test_finish_flushes_pending_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"type\":\"done\"}").is_empty());
        assert_eq!(frames(decoder.finish()), vec!["{\"type\":\"done\"}"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected_and_decoding_continues() {
        let mut decoder = SseDecoder::new(16);
        let body = format!("data: {}\n\ndata: ok\n\n", "x".repeat(64));

        let items = decoder.push_chunk(body.as_bytes());
        assert!(matches!(items[0], SseItem::Rejected(_)));
        assert_eq!(frames(items), vec!["ok"]);
    }

    #[test]
    fn test_oversized_partial_line_rejected() {
        let mut decoder = SseDecoder::new(8);
        let items = decoder.push_chunk(b"data: 0123456789");
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], SseItem::Rejected(_)));
        assert_eq!(frames(decoder.push_chunk(b"\ndata: ok\n\n")), vec!["ok"]);
    }

    #[test]
    fn test_oversized_line_across_chunks_rejected_once() {
        let mut decoder = SseDecoder::new(16);
        let mut items = decoder.push_chunk(b"{\"type\":\"agent_done\",\"result\":");
        items.extend(decoder.push_chunk(b"0123456789012345678901234567"));
        items.extend(decoder.push_chunk(b"{\"type\":\"done\"}\n"));

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], SseItem::Rejected(_)));

        assert_eq!(frames(decoder.push_chunk(b"{\"a\":1}\n")), vec!["{\"a\":1}"]);
    }
}
