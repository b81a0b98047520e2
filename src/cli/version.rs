use confirmgate::proposals::{CONFIRM_PHRASE, DEFAULT_CONFIRM_WINDOW};

/// Display version information
pub fn execute() {
    println!("confirmgate {}", env!("CARGO_PKG_VERSION"));
    println!("Two-step confirmation for destructive operations");
    println!(
        "Confirm phrase: \"{}\", default window: {}s",
        CONFIRM_PHRASE,
        DEFAULT_CONFIRM_WINDOW.as_secs()
    );
}
