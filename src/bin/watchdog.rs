//! Kaufbot - Watchdog
//!
//! External supervisor for the bot process. Any exit, clean or not, is
//! followed by a restart; crashes count against an hourly limit.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const BOT_BINARY: &str = "./target/release/kaufbot";
const MAX_RESTARTS_PER_HOUR: u32 = 5;
const RESTART_DELAY_SECS: u64 = 10;

fn start_bot(args: &[String]) -> Option<Child> {
    println!("[WATCHDOG] Starting {}...", BOT_BINARY);

    match Command::new(BOT_BINARY)
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
    {
        Ok(child) => {
            println!("[WATCHDOG] Bot started (PID: {})", child.id());
            Some(child)
        }
        Err(e) => {
            println!("[WATCHDOG] Failed to start: {}", e);
            None
        }
    }
}

fn main() {
    println!("═══════════════════════════════════════════════════════════");
    println!("  KAUFBOT WATCHDOG");
    println!("═══════════════════════════════════════════════════════════");

    // forwarded to the bot, e.g. the config path
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut restart_count: u32 = 0;
    let mut hour_start = Instant::now();

    loop {
        if hour_start.elapsed() > Duration::from_secs(3600) {
            restart_count = 0;
            hour_start = Instant::now();
        }

        if restart_count >= MAX_RESTARTS_PER_HOUR {
            println!("[WATCHDOG] Too many restarts! Waiting for next hour...");
            thread::sleep(Duration::from_secs(3600));
            restart_count = 0;
            hour_start = Instant::now();
            continue;
        }

        let mut child = match start_bot(&args) {
            Some(c) => c,
            None => {
                thread::sleep(Duration::from_secs(RESTART_DELAY_SECS));
                restart_count += 1;
                continue;
            }
        };

        match child.wait() {
            Ok(status) if status.success() => {
                println!("[WATCHDOG] Bot exited normally (scheduled restart or shutdown)");
            }
            Ok(status) => {
                println!("[WATCHDOG] Bot crashed! Exit code: {:?}", status.code());
                restart_count += 1;
            }
            Err(e) => {
                println!("[WATCHDOG] Error waiting for process: {}", e);
                restart_count += 1;
            }
        }

        println!("[WATCHDOG] Restarting in {} seconds...", RESTART_DELAY_SECS);
        thread::sleep(Duration::from_secs(RESTART_DELAY_SECS));
    }
}
