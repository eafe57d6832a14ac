pub mod monitors;
pub mod problem;
pub mod queues;
pub mod search;

/// dimensional analysis types
pub type Fraction = f64;
pub type Seconds = f64;
pub type Deviation = f64;

/// control index. values in 0..n_c name a control,
/// n_c itself is the "nothing active" sentinel.
pub type Control = usize;

/// input validation parameters
pub(crate) const COLUMN_SUM_TOLERANCE: f64 = 1e-6;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// initialize terminal logging at a verbosity-mapped level.
/// 0 keeps the engine quiet, 1 gives run summaries, 2 gives
/// a line per incumbent update.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let _ = simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
}
