use std;
use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use log::{error, info, LevelFilter};

use clap;
use clap::{arg, ArgAction, command};
use clap::parser::ValueSource;
use simplelog::{ColorChoice, CombinedLogger, TerminalMode, TermLogger, WriteLogger, Config};

use eso_world_lib::{http, DecodeLimits, WorldArchive};


struct Options {
    data_path: String,
    limits_path: Option<String>,
    listen: SocketAddr,
}


fn run_service(options: Options) {
    let start = Instant::now();

    let limits = match &options.limits_path {
        Some(path) => match DecodeLimits::load(Path::new(path)) {
            Ok(limits) => limits,
            Err(err) => {
                error!("unable to read limits from {path}: {err}");
                return;
            }
        },
        None => DecodeLimits::default(),
    };
    info!("serving world files from {} with {limits:?}", options.data_path);
    let archive = Arc::new(WorldArchive::new(Path::new(&options.data_path), limits));

    let (http_stop_tx, http_stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = {
        let archive = archive.clone();
        let listen = options.listen;
        std::thread::spawn(move || {
            http::http_server_service(archive, listen, http_stop_rx);
        })
    };

    wait_for_ctrl_c();

    info!("stopping after {:?}", start.elapsed());
    // the receiver is gone if the server already stopped on its own
    let _ = http_stop_tx.send(());
    if handle.join().is_err() {
        error!("http server thread panicked");
    }
}


fn wait_for_ctrl_c() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();

    match rt {
        Ok(rt) => {
            if let Err(err) = rt.block_on(tokio::signal::ctrl_c()) {
                error!("unable to listen for ctrl-c: {err}");
            }
        }
        Err(err) => error!("unable to start signal runtime: {err}"),
    }
}


fn initialize() -> Options {
    let matches = command!()
        .next_line_help(true)
        .arg(
            arg!(--data <DIR>)
                .required(false)
                .default_value(".")
                .action(ArgAction::Set)
                .help("Directory with the world .dat files")
        )
        .arg(
            arg!(--limits [FILE_NAME])
                .required(false)
                .action(ArgAction::Set)
                .help("JSON file with decode limits (max_fixtures, max_layer_bytes)")
        )
        .arg(
            arg!(--listen <ADDR>)
                .required(false)
                .default_value("127.0.0.1:3000")
                .value_parser(clap::value_parser!(SocketAddr))
                .action(ArgAction::Set)
        )
        .arg(
            arg!(--loglevel <LEVEL>)
                .required(false)
                .default_value("debug")
                .value_parser(["trace", "debug", "info", "warn", "error", "off" ])
                .action(ArgAction::Set)
        )
        .arg(
            arg!(--logfile [FILE_NAME])
                .required(false)
                .default_value("eso_world.log")
                .action(ArgAction::Set)
                .help("Enables logging to a file. Disabled by default")
        )
        .arg(
            arg!(-q --quiet)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Disables output to the terminal")
        )
        .get_matches();


    let loglevel = match matches.get_one::<String>("loglevel") {
        None => LevelFilter::Off,
        Some(level) => {
            match level.as_str() {
                "trace" => LevelFilter::Trace,
                "debug" => LevelFilter::Debug,
                "info" => LevelFilter::Info,
                "warn" => LevelFilter::Warn,
                "error" => LevelFilter::Error,
                "off" => LevelFilter::Off,
                _ => unreachable!(),
            }
        }
    };
    let quiet = matches.get_flag("quiet");
    let term_loglevel = if quiet { LevelFilter::Off } else { loglevel };

    let logfile = match (matches.value_source("logfile"), matches.get_one::<String>("logfile")) {
        (Some(ValueSource::CommandLine), Some(file_name)) => {
            Some(file_name)
        },
        _ => None,
    };

    let log_file = logfile.and_then(|logfile| match File::create(logfile) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("unable to create log file {logfile}: {err}");
            None
        }
    });

    let initialized = if let Some(log_file) = log_file {
        CombinedLogger::init(
            vec![
                TermLogger::new(term_loglevel, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
                WriteLogger::new(loglevel, Config::default(), log_file)
            ]
        )
    } else {
        TermLogger::init(term_loglevel, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
    };
    if let Err(err) = initialized {
        eprintln!("unable to initialize logging: {err}");
    }

    Options {
        data_path: matches.get_one::<String>("data").cloned().unwrap_or_else(|| ".".to_string()),
        limits_path: matches.get_one::<String>("limits").cloned(),
        listen: matches.get_one::<SocketAddr>("listen").copied().unwrap_or_else(|| ([127, 0, 0, 1], 3000).into()),
    }
}

fn main() {
    let options = initialize();
    run_service(options);
}
