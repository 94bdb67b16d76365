mod actions;
mod backup;
mod cli;
mod config;
mod error;
mod logging;
mod monitor;
mod permissions;
mod platform;
mod report;
mod session;

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;
use log::{debug, error, warn};

use backup::BackupStore;
use cli::Args;
use config::Options;
use monitor::SysinfoSampler;
use permissions::ConsoleElevation;
use platform::HostSystem;
use report::ReportKind;
use session::Session;

fn main() -> ExitCode {
    let args = Args::parse();
    let options = Options::from_args(&args);
    logging::init(&options.log_file);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\n[GPTboost] Interrupt received, stopping after the current step");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let mut system = HostSystem::new();
    let mut gate = ConsoleElevation::new(cli::relaunch_args(&args));
    let mut sampler = SysinfoSampler::new();
    let store = BackupStore::new(options.backup_file.clone());

    let mut session = Session::new(
        options,
        store,
        &mut system,
        &mut gate,
        &mut sampler,
        running.clone(),
    );

    let code = match session.run() {
        Ok(report) => {
            println!("\n{}", report);
            match (report.kind, report.exit_code) {
                (ReportKind::Relaunched, Some(child)) => ExitCode::from(u8::try_from(child).unwrap_or(1)),
                _ if report.interrupted => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            error!("{}", e);
            if e.is_permission_denied() {
                eprintln!("[GPTboost] Run from an administrator prompt or pass --admin");
            }
            ExitCode::from(e.exit_code())
        }
    };
    debug!("Session ended in state {:?}", session.state());

    if args.pause_on_exit {
        println!("Press Enter to close this window...");
        let _ = io::stdin().lock().read_line(&mut String::new());
    }
    code
}
