use std::process::ExitCode;

fn main() -> ExitCode {
    match brcbench::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
