fn main() {
    if let Err(e) = docfinder_lib::run() {
        eprintln!("docfinder: {e}");
        std::process::exit(1);
    }
}
