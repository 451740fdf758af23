fn main() {
    eprintln!("Use `cargo run --bin dashboard` or `cargo run --bin demo`.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  cargo run --bin dashboard -- --mode web --layout separate --bind 127.0.0.1 --port 8050");
    eprintln!("  cargo run --bin dashboard -- --mode both --layout combined --interval-secs 2 --history 20");
    eprintln!("  cargo run --bin demo -- --interval-secs 2 --history 50");
    std::process::exit(2);
}
