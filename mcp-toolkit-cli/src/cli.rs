use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mcp-toolkit",
    version,
    about = "Expose stdio MCP servers as callable tools"
)]
pub struct Cli {
    /// Configuration file path (defaults to config/toolkit.toml)
    #[arg(long, short, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the tools offered by each configured server
    List {
        /// Only this server
        #[arg(long, short)]
        server: Option<String>,
    },
    /// Call one tool and print its result
    Call {
        #[arg(long, short)]
        server: String,
        #[arg(long, short)]
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Keep every configured server running until SIGINT/SIGTERM
    Watch,
}
