//! One-time logging setup shared by every `#[cfg(test)]` module in this
//! crate, so `log::info!`/`log::warn!` calls made by the code under test are
//! visible under `cargo test -- --nocapture` instead of silently discarded
//! (no logger is ever installed outside of a binary — see `src/main.rs`).
//!
//! Grounded on the teacher's habit of declaring `ctor` as a dev-dependency
//! for exactly this purpose (`crates/core/Cargo.toml`); this crate wires it
//! up rather than leaving it declared-but-unused.

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    let stdout = log4rs::append::console::ConsoleAppender::builder()
        .encoder(Box::new(log4rs::encode::pattern::PatternEncoder::new("[{h({l})}]\t{m}{n}")))
        .build();
    let config = log4rs::Config::builder()
        .appender(log4rs::config::Appender::builder().build("stdout", Box::new(stdout)))
        .build(log4rs::config::Root::builder().appender("stdout").build(log::LevelFilter::Debug))
        .expect("test logging config is well-formed");
    let _ = log4rs::init_config(config);
}
