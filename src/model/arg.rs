use clap::Parser;

/// Terminal client for Mistral conversations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// List named conversations and exit
    #[arg(short, long, conflicts_with = "resume")]
    pub list: bool,

    /// Resume an existing conversation by id
    #[arg(short, long, value_name = "CONVERSATION_ID")]
    pub resume: Option<String>,

    /// Message to send as soon as the chat opens
    pub message: Option<String>,
}
