use clap::Parser;
use stream_reveal::Cli;
use stream_reveal::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}
