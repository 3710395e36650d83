//
// main.rs
//
// Binary entry point
//

use std::env;
use std::sync::Arc;

use ink_lsp::backend;
use ink_lsp::compiler::ProcessCompilerFactory;

/// Environment variable consulted when `--compiler` is not given.
const COMPILER_ENV: &str = "INK_LSP_COMPILER";
const DEFAULT_COMPILER: &str = "inklecate";

fn print_usage() {
    println!("ink-lsp {}, a language server for ink stories.", env!("CARGO_PKG_VERSION"));
    print!(
        r#"
Usage: ink-lsp [OPTIONS]

Available options:

--stdio                      Start the LSP server using stdio transport
--compiler <command>         Compiler command line (default: ${COMPILER_ENV} or inklecate)
--version                    Print the version
--help                       Print this help message

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;
    let mut compiler_command = None;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--compiler" => {
                let Some(command) = argv.next() else {
                    return Err(anyhow::anyhow!("--compiler expects a command"));
                };
                compiler_command = Some(command);
            }
            "--version" => {
                println!("ink-lsp {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    env_logger::init();

    let command = compiler_command
        .or_else(|| env::var(COMPILER_ENV).ok())
        .unwrap_or_else(|| DEFAULT_COMPILER.to_string());
    let Some(compiler) = ProcessCompilerFactory::from_command_line(&command) else {
        return Err(anyhow::anyhow!("Empty compiler command"));
    };
    log::info!("Using compiler {}", compiler.program().display());

    backend::start_lsp(Arc::new(compiler)).await
}
