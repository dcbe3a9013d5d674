mod cli;

use segforge::config::{self, Config};
use segforge::pipeline::{Pipeline, RunReport, RunRequest};
use segforge::validate::ValidationReport;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Flags that override values from the config file.
#[derive(Default)]
struct Overrides {
    framerate: Option<u32>,
    strict: bool,
    decode_probe: bool,
}

fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let mut config = config::load_config_or_default(path)?;
    if let Some(framerate) = overrides.framerate {
        config.assembly.framerate = framerate;
    }
    if overrides.strict {
        config.assembly.strict = true;
    }
    if overrides.decode_probe {
        config.validation.decode_probe = true;
    }
    config::validate_config(&config)?;
    Ok(config)
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current step");
            token.cancel();
        }
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "segforge=trace,segforge_av=debug,segforge_manifest=debug,segforge_common=debug".to_string()
        } else {
            "segforge=info,segforge_av=info,segforge_manifest=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            manifest,
            base_url,
            output_dir,
            video,
            framerate,
            kind,
            no_combine,
            force_combine,
            decode_probe,
            strict,
            json,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                Overrides {
                    framerate,
                    strict,
                    decode_probe,
                },
            )?;
            let request = RunRequest {
                manifest,
                base_url,
                output_dir,
                output_file: video,
                kind: kind.resolve(),
                combine: !no_combine,
                skip_validation: force_combine,
            };
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(async {
                let cancel = CancellationToken::new();
                cancel_on_interrupt(cancel.clone());
                Pipeline::new(config).run(&request, &cancel).await
            })?;
            finish(&report, json)
        }
        Commands::Combine {
            dir,
            video,
            framerate,
            kind,
            force,
            strict,
            json,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                Overrides {
                    framerate,
                    strict,
                    ..Default::default()
                },
            )?;
            if !dir.is_dir() {
                anyhow::bail!("Segment directory does not exist: {:?}", dir);
            }
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(async {
                let cancel = CancellationToken::new();
                cancel_on_interrupt(cancel.clone());
                Pipeline::new(config)
                    .combine(&dir, kind.resolve(), &video, force, &cancel)
                    .await
            })?;
            finish(&report, json)
        }
        Commands::Validate {
            dir,
            kind,
            decode_probe,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                Overrides {
                    decode_probe,
                    ..Default::default()
                },
            )?;
            if !dir.is_dir() {
                anyhow::bail!("Segment directory does not exist: {:?}", dir);
            }
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(async {
                let cancel = CancellationToken::new();
                cancel_on_interrupt(cancel.clone());
                Pipeline::new(config).validate(&dir, kind.resolve(), &cancel).await
            })?;
            print_validation(&report);
            Ok(())
        }
        Commands::CheckTools => check_tools(),
        Commands::Version => {
            println!("segforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Print the report and turn a failed assembly into a non-zero exit.
fn finish(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }

    if report.cancelled() {
        anyhow::bail!("Cancelled");
    }
    if !report.succeeded() {
        anyhow::bail!("Every assembly strategy failed");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Segment kind: {}", report.kind);

    if let Some(ref manifest) = report.manifest {
        println!("Manifest: {} segments", manifest.segments);
        if let Some(ref encryption) = manifest.encryption {
            println!("  Encrypted: {}", encryption.method);
        }
        for warning in &manifest.warnings {
            println!("  Warning: {}", warning);
        }
    }

    if let Some(ref fetch) = report.fetch {
        println!(
            "Download: {} downloaded, {} already present, {} failed ({:.2} MB)",
            fetch.downloaded,
            fetch.skipped,
            fetch.failed,
            fetch.bytes as f64 / (1024.0 * 1024.0)
        );
        for failure in &fetch.failures {
            println!("  ✗ [{}] {}: {}", failure.index, failure.location, failure.error);
        }
    }

    if let Some(ref validation) = report.validation {
        print_validation(validation);
    }

    if let Some(ref assembly) = report.assembly {
        println!();
        if let Some(ref warning) = assembly.format_warning {
            println!("Warning: {}", warning);
        }
        match assembly.outcome {
            Some(ref outcome) if outcome.success => {
                println!("✓ Assembled with {}", outcome.strategy);
                println!("  Output: {}", outcome.output_path.display());
                println!("  Size: {:.2} MB", outcome.output_size_mb());
            }
            ref last => {
                let tried: Vec<String> = assembly.attempted.iter().map(ToString::to_string).collect();
                println!("✗ Assembly failed (tried: {})", tried.join(", "));
                if let Some(outcome) = last.as_ref().filter(|o| !o.diagnostic.is_empty()) {
                    println!("  Last error: {}", outcome.diagnostic);
                }
            }
        }
        if let Some(ref hint) = assembly.hint {
            println!("  {}", hint);
        }
    }
}

fn print_validation(report: &ValidationReport) {
    println!(
        "Validation: {} valid, {} removed{}",
        report.valid,
        report.removed,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for rejection in &report.rejections {
        println!("  ✗ {}: {}", display_name(&rejection.path), rejection.reason);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = segforge_av::check_tools();
    let mut ffmpeg_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            if tool.name == "ffmpeg" {
                ffmpeg_ok = false;
            }
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if ffmpeg_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it to validate and combine segments.");
    }

    Ok(())
}
