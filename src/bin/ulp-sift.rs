use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use ulp_sift::constants::CLI_PROGRESS_INTERVAL_MS;
use ulp_sift::utils::{format_duration, lines_per_second, setup_logging};
use ulp_sift::{Controller, FieldSplit, PipelineState, ProgressSnapshot, RejectReason, SiftConfig};

#[derive(Parser)]
#[command(name = "ulp-sift")]
#[command(about = "🧹 ULP Sift: validates url:user:pass lines into a deduplicated master file ✨")]
#[command(version)]
struct Args {
    #[arg(short, long, help = "Target file to validate")]
    target: PathBuf,

    #[arg(short, long, help = "Master file that receives accepted lines")]
    master: PathBuf,

    #[arg(short, long, help = "Root folder for per-run rejection logs")]
    logs: Option<PathBuf>,

    #[arg(short, long, help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Accept extra colons inside the last field")]
    tolerant: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

fn print_progress(snapshot: &ProgressSnapshot, elapsed: Duration) {
    let percent = snapshot
        .percent_complete()
        .map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| "?".to_string());
    let total = snapshot
        .total_lines
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());

    println!(
        "⏳ [{}] {} {}/{} lines | ✅ {} valid | 🗑️ {} rejected | {:.0} lines/s",
        snapshot.state,
        percent,
        snapshot.processed_lines,
        total,
        snapshot.valid_count,
        snapshot.rejected_count,
        lines_per_second(snapshot.processed_lines, elapsed)
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let mut config = match &args.config {
        Some(path) => {
            println!("📚 Loading configuration from {}", path.display());
            SiftConfig::load(path).await?
        }
        None => SiftConfig::default(),
    };
    if let Some(logs) = &args.logs {
        config.logs_root = logs.clone();
    }
    if args.tolerant {
        config.field_split = FieldSplit::Tolerant;
    }
    config.verbose |= args.verbose;

    let verbosity = if config.verbose { "verbose" } else { "normal" };
    setup_logging(verbosity)?;

    if !args.target.is_file() {
        anyhow::bail!("Target file does not exist: {}", args.target.display());
    }

    println!("\n🧙 ULP Sift is awakening...");
    println!("🔍 Target: {}", args.target.display());
    println!("📜 Master: {}", args.master.display());
    println!("🗂️ Logs:   {}", config.logs_root.display());

    let controller = Controller::new(config)?;
    controller.start(&args.target, &args.master)?;

    let finished = controller.wait();
    tokio::pin!(finished);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(CLI_PROGRESS_INTERVAL_MS));
    let mut stopping = false;

    let snapshot = loop {
        tokio::select! {
            snapshot = &mut finished => break snapshot,
            _ = &mut ctrl_c, if !stopping => {
                println!("\n🛑 Stop requested, finishing the current line and flushing logs...");
                if let Err(e) = controller.stop() {
                    eprintln!("⚠️ Could not stop: {}", e);
                }
                stopping = true;
            }
            _ = ticker.tick() => {
                print_progress(&controller.snapshot(), start_time.elapsed());
            }
        }
    };
    controller.join();

    let elapsed = start_time.elapsed();
    println!("\n=======================================");
    match snapshot.state {
        PipelineState::Completed => println!("🎉 Sifting completed successfully! 🎉"),
        PipelineState::Stopped => println!("🛑 Sifting stopped early."),
        _ => println!("💥 Sifting failed."),
    }
    println!("📊 Lines processed: {}", snapshot.processed_lines);
    println!("✨ Valid lines appended: {}", snapshot.valid_count);
    println!("🗑️ Lines rejected: {}", snapshot.rejected_count);
    for reason in RejectReason::ALL {
        println!("   • {}: {}", reason, snapshot.rejected(reason));
    }
    println!("⏱️ Processing time: {}", format_duration(elapsed));
    println!(
        "🔄 Processing rate: {:.2} lines/sec",
        lines_per_second(snapshot.processed_lines, elapsed)
    );
    if let Some(log_directory) = &snapshot.log_directory {
        println!("📂 Rejection logs written to: {}", log_directory.display());
    }

    if let Some(cause) = snapshot.failure {
        anyhow::bail!("Run failed: {}", cause);
    }

    Ok(())
}
