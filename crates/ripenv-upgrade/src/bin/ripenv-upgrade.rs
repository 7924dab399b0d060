use std::process::ExitCode;

use ripenv_upgrade::main as ripenv_upgrade_main;

fn main() -> ExitCode {
    ripenv_upgrade_main(std::env::args_os())
}
