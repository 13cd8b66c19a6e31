//! Binary entrypoint for the vdiff command-line interface.

#[tokio::main]
async fn main() {
    let exit_code = vdiff_cli::run().await;
    std::process::exit(exit_code);
}
