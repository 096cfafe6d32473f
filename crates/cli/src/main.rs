use std::process::ExitCode;

fn main() -> ExitCode {
    match syswallet_cli::run(std::env::args_os()) {
        Ok(outcome) => {
            print!("{}", outcome.stdout);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
