#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::Parser;

    use wakeclock::desktop::{self, DesktopOptions};
    use wakeclock::logging::init_logger;

    #[derive(Parser, Debug)]
    #[command(
        name = "wakeclock",
        version,
        about = "Full-screen clock that keeps the display awake"
    )]
    struct Cli {
        /// Directory holding the persisted settings record.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        #[arg(long)]
        fullscreen: bool,

        /// Print the merged settings and resolved theme, then exit.
        #[arg(long)]
        print_settings: bool,
    }

    pub fn main() {
        if let Err(err) = run() {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }

    fn run() -> Result<()> {
        let cli = Cli::parse();
        init_logger();

        if cli.data_dir.exists() && !cli.data_dir.is_dir() {
            bail!("--data-dir {} is not a directory", cli.data_dir.display());
        }

        if cli.print_settings {
            let report = desktop::settings_report(&cli.data_dir).with_context(|| {
                format!("failed to read settings from {}", cli.data_dir.display())
            })?;
            println!("{report}");
            return Ok(());
        }

        desktop::run_gui(DesktopOptions {
            data_dir: cli.data_dir,
            fullscreen: cli.fullscreen,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    cli::main();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    wakeclock::web::start();
}
