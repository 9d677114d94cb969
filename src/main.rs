use std::io;
use std::process::ExitCode;

use ascii_reel::cancel::InterruptHandler;
use ascii_reel::cli::Cli;
use ascii_reel::config::Config;
use ascii_reel::session::{run_loop, Player, SessionSettings};
use ascii_reel::terminal::{parse_color, CrosstermTerminal};
use clap::Parser;
use crossterm::style::Color;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    let color = parse_color(&config.playback.color).unwrap_or_else(|| {
        log::warn!(
            "unknown colour '{}', using white",
            config.playback.color
        );
        Color::White
    });

    let interrupts = match InterruptHandler::install() {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: failed to set Ctrl+C handler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut player = Player::new(
        SessionSettings::from_config(&config),
        CrosstermTerminal::stdout(color),
    )
    .with_interrupts(interrupts);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match run_loop(&mut input, &mut out, cli.video.clone(), cli.once, |video| {
        player.play_file(video)
    }) {
        Ok(exit) => {
            log::debug!("exiting: {:?}", exit);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
