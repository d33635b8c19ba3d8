use std::process::ExitCode;

fn main() -> ExitCode {
    infragraph::cli::run()
}
