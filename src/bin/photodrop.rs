use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use photodrop::protocol::write_frame;

#[derive(Parser)]
#[command(name = "photodrop")]
#[command(about = "Send a photo to a photodropd server")]
struct Cli {
    /// Image file to send
    file: PathBuf,

    /// Server host name or IP address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 5001)]
    port: u16,

    /// Connect timeout in seconds (at least 1)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
}

fn send(cli: &Cli) -> Result<usize> {
    let bytes = std::fs::read(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let addr = (cli.host.as_str(), cli.port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}", cli.host))?
        .next()
        .ok_or_else(|| anyhow!("no address found for {}", cli.host))?;

    let mut stream = TcpStream::connect_timeout(&addr, Duration::from_secs(cli.timeout))
        .with_context(|| format!("failed to connect to {}", addr))?;

    write_frame(&mut stream, &bytes).context("failed to send photo")?;
    stream
        .shutdown(std::net::Shutdown::Write)
        .context("failed to finish transfer")?;

    Ok(bytes.len())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match send(&cli) {
        Ok(len) => {
            println!("sent: {} ({} bytes) to {}:{}", cli.file.display(), len, cli.host, cli.port);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
