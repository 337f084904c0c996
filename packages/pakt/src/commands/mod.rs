use std::process::ExitCode;

use clipanion::{prelude::*, Environment};

pub mod install;

#[cli::program(async)]
enum PaktCli {
    Install(install::Install),
}

pub async fn run_default() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let env = Environment::default()
        .with_program_name("pakt".to_string())
        .with_binary_name("pakt".to_string())
        .with_version(env!("CARGO_PKG_VERSION").to_string())
        .with_argv(args);

    PaktCli::run(env).await
}
