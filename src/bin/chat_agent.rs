use std::error::Error;
use std::io;

use agent_samples_rs::config::{AZURE_OPENAI_ENDPOINT, EnvConfig};
use agent_samples_rs::render::{write_response, write_stream};
use agent_samples_rs::samples::{init_tracing, prompt_from_args};
use agent_samples_rs::{AIAgent, ChatAgent, ChatMessage, OpenAiChatModel, RunOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let prompt = prompt_from_args("Tell me a joke about a pirate.");

    // Azure OpenAI when its endpoint is configured, OpenAI otherwise.
    let model = if EnvConfig::from_env().optional(AZURE_OPENAI_ENDPOINT).is_some() {
        OpenAiChatModel::azure_from_env()?
    } else {
        OpenAiChatModel::from_env()?
    };

    let agent = ChatAgent::builder()
        .model(model)
        .name("Joker")
        .instructions("You are good at telling jokes.")
        .build()?;

    let messages = [ChatMessage::user(prompt)];
    let options = RunOptions::default();
    let mut stdout = io::stdout();

    println!("--- run ---");
    let response = agent.run(&messages, &options).await?;
    write_response(&response, &mut stdout)?;

    println!("--- run_streaming ---");
    write_stream(agent.run_streaming(&messages, &options), &mut stdout).await?;

    agent.delete().await;
    Ok(())
}
