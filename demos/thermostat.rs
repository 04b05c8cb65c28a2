use std::error::Error;

use clap::{Parser, Subcommand};
use nest_client::{Connection, TemperatureTarget};

/// Inspect and adjust Nest thermostats.
///
/// Credentials are read from NEST_USERNAME and NEST_PASSWORD.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Base URL of the login service.
    #[arg(long, default_value = nest_client::DEFAULT_AUTH_URL)]
    auth_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List users, structures and devices (default).
    Status,
    /// Move a setpoint by DELTA degrees.
    Temp {
        device: String,
        #[arg(allow_hyphen_values = true)]
        delta: f64,
        /// target, high or low
        #[arg(long, default_value = "target")]
        target: TemperatureTarget,
    },
    /// Switch a device's fan between on and auto.
    Fan { device: String },
    /// Toggle a structure's away status.
    Away { structure: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Enable logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let username = std::env::var("NEST_USERNAME")?;

    let connection = Connection::builder()
        .auth_url(&cli.auth_url)
        .username(username)
        .password_from_env("NEST_PASSWORD")
        .connect()
        .await?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => print_status(&connection)?,
        Command::Temp {
            device,
            delta,
            target,
        } => {
            let value = connection.device(&device).change_temperature(delta, target).await?;
            println!("{device}: {} set to {value:.1}", target.field());
        }
        Command::Fan { device } => {
            let mode = connection.device(&device).toggle_fan().await?;
            println!("{device}: fan {mode}");
        }
        Command::Away { structure } => {
            let away = connection.structure(&structure).toggle_away().await?;
            println!("{structure}: {}", if away { "away" } else { "home" });
        }
    }

    Ok(())
}

fn print_status(connection: &Connection) -> Result<(), Box<dyn Error>> {
    for (id, user) in connection.users() {
        println!("User {id}: {}", user.email().unwrap_or_default());
    }

    for (id, structure) in connection.structures()? {
        let away = match structure.away() {
            Ok(true) => "away",
            Ok(false) => "home",
            Err(_) => "unknown",
        };
        println!("Structure {id} ({away})");

        for (device_id, device) in structure.devices()? {
            println!(
                "  {device_id} {:<20} {:>5.1} -> {:>5.1} ({})",
                device.name().unwrap_or_default(),
                device.current_temperature()?,
                device.target_temperature()?,
                device.target_temperature_type().unwrap_or_default(),
            );
        }
    }

    Ok(())
}
