use anyhow::Result;
use futures::StreamExt;
use spectra_llm::testing::FakeStreamingClient;
use spectra_llm::{ChatRequest, Message, StreamCollector, StreamingClient};

/// Rebuilds message history from a replayed stream, no provider needed
#[tokio::main]
async fn main() -> Result<()> {
    let client = FakeStreamingClient::from_text("Streams are folded back into messages.");
    let request = ChatRequest::new("fake-model", vec![Message::user("What happens to streams?")]);

    let events = client.stream(request.clone()).await?;
    let mut events = StreamCollector::new()
        .with_request(request)
        .on_complete(|request, messages, response| {
            println!("\n\nRequest model: {:?}", request.map(|r| r.model.as_str()));
            println!("Messages rebuilt: {}", messages.len());
            println!("Final text: {}", response.text);
            println!("Finish reason: {}", response.finish_reason.as_str());
        })
        .collect(events);

    while let Some(event) = events.next().await {
        let event = event?;
        println!("{:<16} {}", event.event_type(), event.to_data()?);
    }

    Ok(())
}
