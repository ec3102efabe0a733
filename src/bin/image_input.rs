use std::error::Error;
use std::{env, fs, io};

use agent_samples_rs::render::write_response;
use agent_samples_rs::samples::init_tracing;
use agent_samples_rs::{AIAgent, ChatAgent, ChatMessage, OpenAiChatModel, RunOptions};

const SAMPLE_IMAGE_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/4/47/PNG_transparency_demonstration_1.png";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let message = ChatMessage::user("What do you see in this image?");
    // A local file path as the first argument is sent inline; otherwise a public URL.
    let message = match env::args().nth(1) {
        Some(path) => message.with_image(media_type(&path), fs::read(&path)?),
        None => message.with_image_url(SAMPLE_IMAGE_URL),
    };

    let agent = ChatAgent::builder()
        .model(OpenAiChatModel::from_env()?)
        .name("Vision")
        .instructions("Describe images briefly.")
        .build()?;

    let response = agent.run(&[message], &RunOptions::default()).await?;
    write_response(&response, &mut io::stdout())?;
    Ok(())
}

fn media_type(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
