fn main() {
    if let Err(err) = aquabill::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
