use {
    anyhow::{Context, Error, anyhow},
    arguments::Arguments,
    clap::Parser,
    std::{
        env,
        io::{self, Write},
        process,
        time::Duration,
    },
    stratum::{Client, ClientConfig, Event, Job},
    tokio::{runtime::Runtime, sync::broadcast},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt},
};

mod arguments;
mod logs;
mod signal;
pub mod subcommand;

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let _guard = logs::init();

    let args = Arguments::parse();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to create tokio runtime: {err}");
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let cancel_token = signal::setup_signal_handler();

        match args.run(cancel_token).await {
            Err(err) => {
                eprintln!("error: {err}");

                for (i, cause) in err.chain().skip(1).enumerate() {
                    if i == 0 {
                        eprintln!();
                        eprintln!("because:");
                    }
                    eprintln!("- {cause}");
                }

                if env::var_os("RUST_BACKTRACE")
                    .map(|val| val == "1")
                    .unwrap_or_default()
                {
                    eprintln!();
                    eprintln!("{}", err.backtrace());
                }
                process::exit(1);
            }
            Ok(_) => {
                process::exit(0);
            }
        }
    });
}
