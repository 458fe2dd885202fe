use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = cli::Cli::parse();
    args.run()?;
    Ok(())
}
