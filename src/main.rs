fn main() {
    if let Err(e) = volleymed_lib::run() {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("volleymed: {e}");
        std::process::exit(1);
    }
}
