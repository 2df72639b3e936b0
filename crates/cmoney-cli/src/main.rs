mod cli;
mod logging;

use cmoney_core::ApiError;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        if requires_login(&e) {
            eprintln!("Your session has ended. Run `cmoney login` to sign in again.");
        }
        std::process::exit(1);
    }
}

fn requires_login(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ApiError>())
        .any(ApiError::requires_login)
}
