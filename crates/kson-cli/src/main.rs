use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = kson_cli::cli().run();

    kson_cli::install_tracing();

    match kson_cli::run(&cli.command) {
        Ok(had_errors) => {
            if had_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}
