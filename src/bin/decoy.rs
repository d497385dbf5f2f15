fn main() -> anyhow::Result<()> {
    decoy::cli::run_cli()
}
