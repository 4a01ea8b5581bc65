//! Client side of the push channel.
//!
//! The server pushes server-sent events; a viewer feeds whatever chunks the
//! HTTP body yields into an [`EventDecoder`] and gets complete messages back.
//! Only the `event` and `data` fields matter here; `id` and `retry` are
//! ignored because the channel never replays.

/// One dispatched push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub event: String,
    pub data: String,
}

const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Default)]
pub struct EventDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body; returns every message it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<PushMessage> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(message) = self.process_line(line) {
                out.push(message);
            }
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<PushMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<PushMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(PushMessage { event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()), data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = EventDecoder::new();
        let messages = decoder.feed(b"event: sensorData\ndata: Turbidity: 641\n\n");
        assert_eq!(
            messages,
            vec![PushMessage { event: "sensorData".into(), data: "Turbidity: 641".into() }]
        );
    }

    #[test]
    fn test_chunks_split_anywhere() {
        let body = b"event: sensorData\r\ndata: 42\r\n\r\n: keep-alive\n\nevent: sensorData\ndata: abc\n\n";
        let mut decoder = EventDecoder::new();
        let mut messages = Vec::new();
        for byte in body.chunks(3) {
            messages.extend(decoder.feed(byte));
        }
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].data, "42");
        assert_eq!(messages[1].data, "abc");
    }

    #[test]
    fn test_default_event_and_multiline_data() {
        let mut decoder = EventDecoder::new();
        let messages = decoder.feed(b"data: one\ndata:two\n\n");
        assert_eq!(messages[0].event, "message");
        assert_eq!(messages[0].data, "one\ntwo");
    }

    #[test]
    fn test_event_without_data_is_not_dispatched() {
        let mut decoder = EventDecoder::new();
        assert!(decoder.feed(b"event: sensorData\n\n").is_empty());
        // the stale event name must not leak into the next message
        let messages = decoder.feed(b"data: 5\n\n");
        assert_eq!(messages[0].event, "message");
    }

    #[test]
    fn test_empty_data_field_is_dispatched() {
        let mut decoder = EventDecoder::new();
        let messages = decoder.feed(b"event: sensorData\ndata: \n\n");
        assert_eq!(messages[0].data, "");
    }
}
