fn main() {
    if let Err(err) = catalog_mapper::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
