fn main() {
    if let Err(err) = table_extract::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
