use clap::{Parser, ValueEnum};
use log::{error, info};
use shared::{Command, Request};
use std::time::Duration;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CommandArg {
    Info,
    Fetch,
}

impl From<CommandArg> for Command {
    fn from(arg: CommandArg) -> Self {
        match arg {
            CommandArg::Info => Command::Info,
            CommandArg::Fetch => Command::Fetch,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:16000")]
    server: String,

    /// Seconds to wait for the reply
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    /// Request to send
    #[arg(value_enum, ignore_case = true)]
    command: CommandArg,

    /// Day token naming the daily board
    day: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let request = Request::new(args.command.into(), args.day);

    info!("Sending {} {} to {}", request.command, request.day, args.server);
    let reply =
        client::send_request_timeout(&args.server, &request, Duration::from_secs(args.timeout))
            .await?;

    if reply.is_empty() {
        error!("Server closed the connection without a reply");
        std::process::exit(1);
    }

    print!("{}", reply);
    Ok(())
}
