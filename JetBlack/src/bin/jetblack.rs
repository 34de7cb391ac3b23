fn main() -> anyhow::Result<()> {
    jetblack::cli::run_cli()
}
