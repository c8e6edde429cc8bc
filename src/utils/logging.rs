use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Install the terminal logger. Fails if a logger is already set.
pub fn init() -> Result<(), log::SetLoggerError> {
    TermLogger::init(
        default_level(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}

/// Same as [`init`], but ignores an already-installed logger.
#[cfg(test)]
pub fn initialize_for_tests() {
    let _ = init();
}
