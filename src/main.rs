fn main() {
    if let Err(e) = gazewarp_lib::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
