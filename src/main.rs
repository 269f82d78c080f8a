use anyhow::Result;
use sha256report::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
