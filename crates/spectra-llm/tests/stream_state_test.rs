use serde_json::json;
use spectra_llm::streaming::PendingToolCall;
use spectra_llm::types::{Citation, MessagePartWithCitations};
use spectra_llm::{FinishReason, OllamaStreamState, StreamState, Usage};

fn populated_state() -> StreamState {
    let mut state = StreamState::new();
    state
        .with_message_id("msg-1")
        .with_reasoning_id("reason-1")
        .with_model("gpt-4")
        .with_provider("openai")
        .mark_stream_started()
        .mark_text_started()
        .mark_thinking_started()
        .append_text("Hello")
        .append_thinking("Hmm")
        .with_block_context(2, "text")
        .add_tool_call(0, PendingToolCall::new().with_id("call-1").with_name("search"))
        .with_usage(Usage::new(10, 5))
        .with_finish_reason(FinishReason::ToolCalls);
    state
}

#[test]
fn test_initial_state() {
    let state = StreamState::new();

    assert!(state.should_emit_stream_start());
    assert!(state.should_emit_text_start());
    assert!(state.should_emit_thinking_start());
    assert_eq!(state.current_text(), "");
    assert!(state.tool_calls().is_empty());
    assert!(state.usage().is_none());
    assert!(state.finish_reason().is_none());
}

#[test]
fn test_start_predicates_toggle_once() {
    let mut state = StreamState::new();
    state.mark_text_started();

    assert!(!state.should_emit_text_start());
    assert!(state.should_emit_thinking_start());

    state.mark_text_started();
    assert!(!state.should_emit_text_start());
}

#[test]
fn test_reset_keeps_stream_started_usage_and_finish_reason() {
    let mut state = populated_state();
    state.reset();

    assert!(state.has_stream_started());
    assert!(!state.has_text_started());
    assert!(!state.has_thinking_started());
    assert_eq!(state.current_text(), "");
    assert_eq!(state.current_thinking(), "");
    assert_eq!(state.message_id(), "");
    assert_eq!(state.model(), "");
    assert!(state.tool_calls().is_empty());
    assert!(state.current_block_index().is_none());
    assert_eq!(state.usage(), Some(&Usage::new(10, 5)));
    assert_eq!(state.finish_reason(), Some(FinishReason::ToolCalls));
}

fn apply_mutation(state: &mut StreamState, step: usize) {
    match step {
        0 => state.append_text("abc"),
        1 => state.mark_thinking_started(),
        2 => state.append_tool_call_input(3, "{"),
        3 => state.mark_text_started(),
        _ => state.with_block_context(1, "thinking"),
    };
}

#[test]
fn test_reset_holds_for_any_prefix_of_mutations() {
    for len in 0..=5 {
        let mut state = StreamState::new();
        state.mark_stream_started();
        for step in 0..len {
            apply_mutation(&mut state, step);
        }
        state.reset();

        assert!(state.has_stream_started());
        assert!(!state.has_text_started());
        assert!(!state.has_thinking_started());
        assert_eq!(state.current_text(), "");
        assert!(state.tool_calls().is_empty());
    }
}

#[test]
fn test_reset_text_state_only_touches_text() {
    let mut state = populated_state();
    state.reset_text_state();

    assert_eq!(state.message_id(), "");
    assert!(!state.has_text_started());
    assert!(!state.has_thinking_started());
    assert_eq!(state.current_text(), "");
    assert_eq!(state.current_thinking(), "");

    assert_eq!(state.reasoning_id(), "reason-1");
    assert_eq!(state.model(), "gpt-4");
    assert_eq!(state.current_block_type(), Some("text"));
    assert_eq!(state.tool_calls().len(), 1);
}

#[test]
fn test_reset_block_only_touches_block_context() {
    let mut state = populated_state();
    state.reset_block();

    assert!(state.current_block_index().is_none());
    assert!(state.current_block_type().is_none());
    assert_eq!(state.current_text(), "Hello");
    assert!(state.has_text_started());
}

#[test]
fn test_finish_block_reopens_only_the_closed_kind() {
    let mut state = populated_state();
    state.finish_block();

    assert!(state.current_block_type().is_none());
    assert!(state.should_emit_text_start());
    assert!(!state.should_emit_thinking_start());
    assert_eq!(state.current_text(), "Hello");
    assert_eq!(state.message_id(), "msg-1");
}

#[test]
fn test_append_tool_call_input_creates_then_concatenates() {
    let mut state = StreamState::new();
    state
        .append_tool_call_input(1, "{\"city\":")
        .append_tool_call_input(1, "\"Paris\"}");

    let call = state.tool_call(1).unwrap();
    assert_eq!(call.input.as_deref(), Some("{\"city\":\"Paris\"}"));
    assert!(call.id.is_none());
    assert!(call.name.is_none());
}

#[test]
fn test_update_tool_call_merges_without_clobbering() {
    let mut state = StreamState::new();
    state
        .update_tool_call(0, PendingToolCall::new().with_id("call-1").with_name("weather"))
        .append_tool_call_input(0, "{}")
        .update_tool_call(0, PendingToolCall::new().with_extra("status", json!("done")));

    let call = state.tool_call(0).unwrap();
    assert_eq!(call.id.as_deref(), Some("call-1"));
    assert_eq!(call.name.as_deref(), Some("weather"));
    assert_eq!(call.input.as_deref(), Some("{}"));
    assert_eq!(call.extra["status"], json!("done"));

    let finalized = call.to_tool_call().unwrap();
    assert_eq!(finalized.arguments, "{}");
}

#[test]
fn test_add_tool_call_replaces_and_keeps_insertion_order() {
    let mut state = StreamState::new();
    state
        .add_tool_call(5, PendingToolCall::new().with_id("late"))
        .add_tool_call(1, PendingToolCall::new().with_id("early"))
        .add_tool_call(5, PendingToolCall::new().with_id("replaced"));

    let ids: Vec<_> = state
        .tool_calls()
        .iter()
        .map(|(index, call)| (*index, call.id.clone().unwrap()))
        .collect();
    assert_eq!(ids, vec![(5, "replaced".to_string()), (1, "early".to_string())]);
}

#[test]
fn test_citations_are_collected_and_cleared_by_reset() {
    let mut state = StreamState::new();
    state.add_citation(
        MessagePartWithCitations::new("Rust is fast")
            .with_citations(vec![Citation::new("https://www.rust-lang.org")]),
    );
    assert_eq!(state.citations().len(), 1);

    state.reset();
    assert!(state.citations().is_empty());
}

#[test]
fn test_ollama_counters_survive_every_reset() {
    let mut state = OllamaStreamState::new();
    state.add_prompt_tokens(10).add_completion_tokens(4);
    state.append_text("partial").mark_text_started();

    state.reset();
    state.reset_text_state();
    state.reset_block();

    assert_eq!(state.prompt_tokens(), 10);
    assert_eq!(state.completion_tokens(), 4);
    assert_eq!(state.current_text(), "");

    state.add_prompt_tokens(5).add_completion_tokens(1);
    assert_eq!(state.accumulated_usage(), Usage::new(15, 5));
}

#[test]
fn test_ollama_counters_saturate() {
    let mut state = OllamaStreamState::new();
    state.add_prompt_tokens(u32::MAX).add_prompt_tokens(12);
    state.add_completion_tokens(3);

    assert_eq!(state.prompt_tokens(), u32::MAX);
    assert_eq!(state.accumulated_usage().total_tokens(), u32::MAX);
}
