use std::process::ExitCode;

use vpn_automator::{cli, error::Error, report};

fn main() -> ExitCode {
    let matches = cli::init().get_matches();

    if matches.get_flag("verbose") && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "debug");
    }
    pretty_env_logger::init();

    let Err(err) = cli::run(&matches) else {
        return ExitCode::SUCCESS;
    };

    match err.downcast_ref::<Error>() {
        Some(Error::Interrupted) => report::aborted(),
        Some(inner) => {
            log::debug!("{err:?}");
            report::fatal(inner);
        }
        None => report::fatal_message("Error", format!("{err:#}")),
    }

    ExitCode::from(cli::exit_code(&err))
}
