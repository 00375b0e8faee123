use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Map, Value};
use spectra_llm::streaming::{ErrorEvent, StreamEndEvent};
use spectra_llm::{SpectraError, StreamEvent, Usage};

use super::WireAdapter;

/// JSON-lines UI message stream (`x-vercel-ai-ui-message-stream: v1`).
///
/// Events are translated into the external chunk vocabulary; kinds without a
/// counterpart (tool-call deltas, provider tool activity, artifacts) are not
/// written.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataProtocolAdapter;

const HEADERS: &[(&str, &str)] = &[
    ("content-type", "text/plain; charset=utf-8"),
    ("cache-control", "no-cache, no-transform"),
    ("x-accel-buffering", "no"),
    ("x-vercel-ai-ui-message-stream", "v1"),
];

const DONE: &str = "data: [DONE]\n\n";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum UiChunk<'a> {
    Start {
        #[serde(rename = "messageId")]
        message_id: &'a str,
    },
    TextStart {
        id: &'a str,
    },
    TextDelta {
        id: &'a str,
        delta: &'a str,
    },
    TextEnd {
        id: &'a str,
    },
    ReasoningStart {
        id: &'a str,
    },
    ReasoningDelta {
        id: &'a str,
        delta: &'a str,
    },
    ReasoningEnd {
        id: &'a str,
    },
    ToolInputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: &'a str,
        #[serde(rename = "toolName")]
        tool_name: &'a str,
        input: Map<String, Value>,
    },
    ToolOutputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: &'a str,
        output: &'a Value,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: &'a str,
    },
    Finish {
        #[serde(rename = "messageMetadata")]
        message_metadata: FinishMetadata,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishMetadata {
    finish_reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<UiUsage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_write_input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_read_input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought_tokens: Option<u32>,
}

impl From<Usage> for UiUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            cache_write_input_tokens: usage.cache_write_input_tokens,
            cache_read_input_tokens: usage.cache_read_input_tokens,
            thought_tokens: usage.thought_tokens,
        }
    }
}

fn finish(end: &StreamEndEvent) -> UiChunk<'static> {
    UiChunk::Finish {
        message_metadata: FinishMetadata {
            finish_reason: end.finish_reason.as_str(),
            usage: end.usage.map(UiUsage::from),
        },
    }
}

fn translate(event: &StreamEvent) -> spectra_llm::Result<Option<UiChunk<'_>>> {
    let chunk = match event {
        StreamEvent::StreamStart(e) => UiChunk::Start { message_id: &e.id },
        StreamEvent::TextStart(e) => UiChunk::TextStart { id: &e.message_id },
        StreamEvent::TextDelta(e) => UiChunk::TextDelta {
            id: &e.message_id,
            delta: &e.delta,
        },
        StreamEvent::TextComplete(e) => UiChunk::TextEnd { id: &e.message_id },
        StreamEvent::ThinkingStart(e) => UiChunk::ReasoningStart { id: &e.reasoning_id },
        StreamEvent::ThinkingDelta(e) => UiChunk::ReasoningDelta {
            id: &e.reasoning_id,
            delta: &e.delta,
        },
        StreamEvent::ThinkingComplete(e) => UiChunk::ReasoningEnd { id: &e.reasoning_id },
        StreamEvent::ToolCall(e) => UiChunk::ToolInputAvailable {
            tool_call_id: &e.tool_call.id,
            tool_name: &e.tool_call.name,
            input: e
                .tool_call
                .arguments()
                .map_err(|err| SpectraError::Encoding(err.to_string()))?,
        },
        StreamEvent::ToolResult(e) => UiChunk::ToolOutputAvailable {
            tool_call_id: &e.tool_result.tool_call_id,
            output: &e.tool_result.result,
        },
        StreamEvent::Error(e) => UiChunk::Error {
            error_text: &e.message,
        },
        StreamEvent::StreamEnd(e) => finish(e),
        StreamEvent::ToolCallDelta(_) | StreamEvent::ProviderTool(_) | StreamEvent::Artifact(_) => {
            return Ok(None)
        }
    };
    Ok(Some(chunk))
}

fn frame(json: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", json))
}

impl WireAdapter for DataProtocolAdapter {
    fn headers(&self) -> &'static [(&'static str, &'static str)] {
        HEADERS
    }

    fn encode(&self, event: &StreamEvent) -> spectra_llm::Result<Option<Bytes>> {
        let Some(chunk) = translate(event)? else {
            return Ok(None);
        };
        let json =
            serde_json::to_string(&chunk).map_err(|err| SpectraError::Encoding(err.to_string()))?;
        Ok(Some(frame(&json)))
    }

    fn encode_error(&self, error: &ErrorEvent) -> Bytes {
        frame(&json!({ "type": "error", "errorText": error.message }).to_string())
    }

    fn terminator(&self) -> Option<Bytes> {
        Some(Bytes::from_static(DONE.as_bytes()))
    }
}
