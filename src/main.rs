fn main() {
    if let Err(err) = csv_curate::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
