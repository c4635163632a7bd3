//! `kidtalk` - CLI for the kidtalk backend
//!
//! This binary runs the HTTP API server and offers a few commands to inspect
//! the database and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use kidtalk::cli::{Cli, Command, ConfigCommand};
use kidtalk::{init_logging, Config, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd.bind),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Doctors(doctors_cmd) => handle_doctors(&config, doctors_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_serve(mut config: Config, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
        config.validate().context("invalid --bind address")?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime
        .block_on(kidtalk::server::serve(&config))
        .with_context(|| format!("server on {} failed", config.server.bind))
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "upload_root": config.upload_root(),
            "bind": config.server.bind,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("kidtalk status");
        println!("--------------");
        println!("Database:          {}", config.database_path().display());
        println!("Uploads:           {}", config.upload_root().display());
        println!("Bind:              {}", config.server.bind);
        println!();
        println!("Doctors:           {}", stats.doctors);
        println!("Kids:              {}", stats.kids);
        println!("Weeks:             {}", stats.weeks);
        println!("Media files:       {}", stats.media);
        println!("Voice recordings:  {}", stats.voice_recordings);
        println!("Feedback:          {}", stats.feedback);
        println!("Database size:     {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_doctors(config: &Config, json: bool) -> anyhow::Result<()> {
    let doctors = open_storage(config)?.list_doctors()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doctors)?);
    } else if doctors.is_empty() {
        println!("No doctors registered.");
    } else {
        println!("{:<10} {:<30} {:<30} {:<12}", "JOB ID", "NAME", "EMAIL", "PHONE");
        for doctor in &doctors {
            println!(
                "{:<10} {:<30} {:<30} {:<12}",
                doctor.job_id, doctor.full_name, doctor.email, doctor.phone
            );
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!("  Max body bytes:     {}", config.server.max_body_bytes);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Uploads]");
                println!("  Root:               {}", config.upload_root().display());
                println!("  URL prefix:         {}", config.uploads.url_prefix);
                println!(
                    "  Max file bytes:     {}",
                    config.uploads.max_file_size_bytes
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
