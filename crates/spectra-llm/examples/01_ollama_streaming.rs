use anyhow::Result;
use futures::StreamExt;
use spectra_llm::{ChatRequest, Message, OllamaClient, StreamEvent, StreamingClient};

#[tokio::main]
async fn main() -> Result<()> {
    let base_url = std::env::var("OLLAMA_BASE_URL")
        .unwrap_or_else(|_| spectra_llm::ollama::DEFAULT_BASE_URL.to_string());
    let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
    let client = OllamaClient::new(base_url)?;

    let request = ChatRequest::new(
        model,
        vec![Message::user("Explain how photosynthesis works in two sentences.")],
    );

    println!("Streaming from Ollama:\n");

    let mut stream = client.stream(request).await?;
    let mut thinking = false;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::ThinkingDelta(e) => {
                if !thinking {
                    println!("[THINKING]");
                    thinking = true;
                }
                print!("{}", e.delta);
                std::io::Write::flush(&mut std::io::stdout())?;
            }
            StreamEvent::TextDelta(e) => {
                if thinking {
                    println!("\n\n[RESPONSE]");
                    thinking = false;
                }
                print!("{}", e.delta);
                std::io::Write::flush(&mut std::io::stdout())?;
            }
            StreamEvent::StreamEnd(e) => {
                println!("\n\nDone ({}).", e.finish_reason.as_str());
                if let Some(usage) = e.usage {
                    println!("Tokens: {} in, {} out", usage.prompt_tokens, usage.completion_tokens);
                }
            }
            _ => {}
        }
    }

    Ok(())
}
