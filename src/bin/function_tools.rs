use std::error::Error;
use std::io;

use agent_samples_rs::render::write_stream;
use agent_samples_rs::samples::{init_tracing, prompt_from_args};
use agent_samples_rs::tools::menu::menu_tools;
use agent_samples_rs::{AIAgent, AgentUpdate, ChatAgent, ChatMessage, OpenAiChatModel, RunOptions};
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let prompt = prompt_from_args("What is the special soup and how much does it cost?");

    let agent = ChatAgent::builder()
        .model(OpenAiChatModel::from_env()?)
        .name("Host")
        .instructions("Answer questions about the menu.")
        .tools(menu_tools())
        .build()?;

    let messages = [ChatMessage::user(prompt)];
    let options = RunOptions::default();

    // Tool activity goes to stderr so the answer on stdout stays clean.
    let traced = agent.run_streaming(&messages, &options).inspect(|update| {
        match update {
            Ok(AgentUpdate::ToolCall {
                tool, args_json, ..
            }) => eprintln!("tool-call {tool}: {args_json}"),
            Ok(AgentUpdate::ToolResult {
                tool,
                result_text,
                is_error,
                ..
            }) => eprintln!("tool-result {tool} (error={is_error}): {result_text}"),
            _ => {}
        }
    });

    write_stream(traced.boxed(), &mut io::stdout()).await?;
    Ok(())
}
