// ABOUTME: Incremental Server-Sent Events decoder for streaming agent responses.
// ABOUTME: Turns an HTTP byte stream into a stream of complete `data:` payloads.

use futures::stream::{BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

/// Line-oriented SSE parser that only keeps `data:` fields.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the payloads of every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line);
                self.handle_line(&line, &mut frames);
            } else {
                self.line.push(byte);
            }
        }
        frames
    }

    /// Flush a trailing event that was not terminated by a blank line
    pub fn finish(&mut self) -> Option<String> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            let mut frames = Vec::new();
            self.handle_line(&line, &mut frames);
        }
        if self.has_data {
            self.has_data = false;
            Some(std::mem::take(&mut self.data))
        } else {
            None
        }
    }

    fn handle_line(&mut self, line: &[u8], frames: &mut Vec<String>) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.is_empty() {
            if self.has_data {
                self.has_data = false;
                frames.push(std::mem::take(&mut self.data));
            }
            return;
        }

        // Comment / keep-alive
        if line.starts_with(b":") {
            return;
        }

        let text = String::from_utf8_lossy(line);
        let (field, value) = match text.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (text.as_ref(), ""),
        };

        // event:, id: and retry: carry nothing the agent protocol uses
        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
    }
}

struct FrameState<B, E> {
    inner: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Adapt a chunked byte stream into a stream of SSE data payloads.
///
/// A transport error is yielded once and ends the stream.
pub fn data_frames<S, B, E>(stream: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let state = FrameState {
        inner: stream.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(chunk.as_ref());
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(frames, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert!(decoder.push(b":1}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\nevent: message\r\nid: 7\r\ndata: x\r\n\r\n");
        assert_eq!(frames, vec!["x"]);
    }

    #[test]
    fn test_multi_line_data_is_joined_with_newline() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: first\ndata: second\n\n");
        assert_eq!(frames, vec!["first\nsecond"]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: 1\n\ndata: 2\n\n");
        assert_eq!(frames, vec!["1", "2"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        // split inside the two-byte 'é'
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["héllo"]);
    }

    #[test]
    fn test_blank_lines_without_data_emit_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"\n\n: ping\n\n").is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn test_data_frames_stream() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: a\n".to_vec()),
            Ok(b"\ndata: b".to_vec()),
        ];
        let frames: Vec<_> = data_frames(futures::stream::iter(chunks)).collect().await;
        assert_eq!(frames, vec![Ok("a".to_string()), Ok("b".to_string())]);
    }

    #[tokio::test]
    async fn test_data_frames_stops_after_error() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: a\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: never\n\n".to_vec()),
        ];
        let frames: Vec<_> = data_frames(futures::stream::iter(chunks)).collect().await;
        assert_eq!(
            frames,
            vec![Ok("a".to_string()), Err("connection reset".to_string())]
        );
    }
}
