mod sim;

use std::{fs, path::PathBuf, process::ExitCode};

use braitenberg_core::utils::{
    controllers::{Polarity, Wiring},
    math::kinematics::Pose,
    run, Braitenberg, SessionConfig,
};
use clap::{Parser, ValueEnum};
use sim::{Light, MockSimulator};
use tracing::{error, info};
use tracing_subscriber;

#[derive(Clone, Copy, ValueEnum)]
enum WiringArg {
    Ipsilateral,
    Contralateral,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolarityArg {
    Inhibitory,
    Excitatory,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// start x position (m)
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    x: f32,
    /// start y position (m)
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    y: f32,
    /// start heading (rad)
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    theta: f32,
    /// number of control steps
    #[clap(long, default_value_t = 200)]
    duration: usize,
    #[clap(long, value_enum, default_value = "ipsilateral")]
    wiring: WiringArg,
    #[clap(long, value_enum, default_value = "inhibitory")]
    polarity: PolarityArg,
    /// sensor-to-motor gain (defaults to 30/255)
    #[clap(long)]
    gain: Option<f32>,
    /// JSON session config; missing keys keep their defaults
    #[clap(long)]
    config: Option<PathBuf>,
    /// light source position
    #[clap(long, default_value_t = 2.0, allow_hyphen_values = true)]
    light_x: f32,
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    light_y: f32,
    /// distance at which the light reads half intensity (m)
    #[clap(long, default_value_t = 1.0)]
    light_spread: f32,
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig, String> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    SessionConfig::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let opts: Opts = Opts::parse();

    let config = match load_config(opts.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let wiring = match opts.wiring {
        WiringArg::Ipsilateral => Wiring::Ipsilateral,
        WiringArg::Contralateral => Wiring::Contralateral,
    };
    let polarity = match opts.polarity {
        PolarityArg::Inhibitory => Polarity::Inhibitory,
        PolarityArg::Excitatory => Polarity::Excitatory,
    };
    let controller = Braitenberg::new(opts.gain, wiring, polarity);

    let mut simulator = MockSimulator::new(
        config.port,
        &config.entities,
        Light {
            x: opts.light_x,
            y: opts.light_y,
            spread: opts.light_spread,
        },
    );
    info!(?controller, "running {} steps", opts.duration);

    let start = Pose::new(opts.x, opts.y, opts.theta);
    match run(&mut simulator, &config, start, opts.duration, &controller) {
        Ok(trajectory) => match serde_json::to_string(&trajectory) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("could not serialize trajectory: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
