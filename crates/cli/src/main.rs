use std::process::ExitCode;

fn main() -> ExitCode {
    printdesk_cli::run()
}
