fn main() {
    if let Err(error) = teller::cli::main() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
