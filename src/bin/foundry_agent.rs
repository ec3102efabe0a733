use std::error::Error;
use std::io;

use agent_samples_rs::render::write_stream;
use agent_samples_rs::samples::{init_tracing, prompt_from_args};
use agent_samples_rs::tools::menu::menu_tools;
use agent_samples_rs::{
    AIAgent, ChatMessage, EnvConfig, FoundryClient, FoundryConfig, HostedTool, PersistentAgent,
    RunOptions,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let prompt = prompt_from_args("What is the special soup? Also, what's the weather in Seattle today?");

    let env = EnvConfig::from_env();
    let client = FoundryClient::new(FoundryConfig::from_config(&env)?)?;
    let hosted = HostedTool::from_config(&env, "samples")?;

    if hosted.is_empty() {
        eprintln!("no hosted tool connections configured; using function tools only");
    }
    for tool in &hosted {
        eprintln!("hosted tool: {}", tool.kind());
    }

    let agent = PersistentAgent::builder(client)
        .name("Concierge")
        .instructions(
            "Answer questions about the menu with the menu tools. Use the search tools \
             for anything else and cite your sources.",
        )
        .tools(menu_tools())
        .tools(hosted)
        .build()?;

    let agent_id = agent.create().await?;
    eprintln!("created agent {agent_id}");

    let messages = [ChatMessage::user(prompt)];
    let result = write_stream(
        agent.run_streaming(&messages, &RunOptions::default()),
        &mut io::stdout(),
    )
    .await;

    agent.delete().await;
    eprintln!("deleted agent {agent_id}");

    result?;
    Ok(())
}
