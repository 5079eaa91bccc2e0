#[cfg(not(target_arch = "wasm32"))]
pub fn init_logger() {
    use std::io::Write;

    use env_logger::{Builder, Env};

    let mut builder = Builder::from_env(Env::default().default_filter_or("wakeclock=info"));
    builder.filter_module("eframe", log::LevelFilter::Warn);
    builder.filter_module("egui_glow", log::LevelFilter::Warn);
    builder.format(|buf, record| {
        let module_path = record.module_path().unwrap_or("<unknown>");
        writeln!(buf, "[{}][{}] {}", record.level(), module_path, record.args())
    });

    let _ = builder.try_init();
}

/// Forwards `log` records to the browser console.
#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] {}",
            record.module_path().unwrap_or("<unknown>"),
            record.args()
        );
        match record.level() {
            log::Level::Error => gloo::console::error!(line),
            log::Level::Warn => gloo::console::warn!(line),
            log::Level::Info => gloo::console::info!(line),
            log::Level::Debug | log::Level::Trace => gloo::console::debug!(line),
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

#[cfg(target_arch = "wasm32")]
pub fn init_logger() {
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        let level = if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        log::set_max_level(level);
    }
}
