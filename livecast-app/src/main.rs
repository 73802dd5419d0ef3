use clap::Parser;

use livecast_lib::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    livecast_lib::init_logging();
    livecast_lib::run(Args::parse()).await
}
