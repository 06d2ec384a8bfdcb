use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "culinary", version, about = "Recipe generation client")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the verified session
    Status,
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "")]
        recaptcha: String,
    },
    Logout,
    /// Start a recipe and follow it until it is ready
    Generate {
        #[arg(long)]
        prompt: String,
    },
    /// Follow an existing recipe job
    Watch { recipe_id: String },
}

#[derive(Parser, Debug)]
#[command(name = "stub_service", about = "In-memory recipe service for local runs")]
pub struct StubCli {
    #[arg(long)]
    pub settings: Option<String>,
}
