use anyhow::{anyhow, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use std::io::{stdin, stdout, Stdin, Write};
use std::time::Duration;

use hex_ai::board::{HexBoard, Move, Side};
use hex_ai::evaluator::{EvaluatorConfig, ObstructionScale, OpponentCells};
use hex_ai::solver::{SearchConfig, Solver, DEFAULT_MAX_DEPTH};
use hex_ai::DEFAULT_SIZE;

mod display;
use display::*;

/// Play Hex against a time-bounded alpha-beta agent
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Board side length
    #[arg(short, long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    /// Thinking time per AI move, in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    time_ms: u64,

    /// Deepest search iteration
    #[arg(short = 'd', long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Treat opponent stones as walls in the distance heuristic
    #[arg(long)]
    blocking_distance: bool,

    /// Count every contact with an opponent stone in the obstruction heuristic
    #[arg(long)]
    full_obstruction: bool,
}

fn ask_yes_no(stdin: &Stdin, question: &str) -> Result<bool> {
    loop {
        let mut buffer = String::new();
        print!("{} y/n: ", question);
        stdout().flush()?;
        if stdin.read_line(&mut buffer)? == 0 {
            return Err(anyhow!("input closed before an answer was given"));
        }
        match buffer.to_lowercase().chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let evaluator = EvaluatorConfig {
        opponent_cells: if args.blocking_distance {
            OpponentCells::Blocking
        } else {
            OpponentCells::Passable
        },
        obstruction: if args.full_obstruction {
            ObstructionScale::Full
        } else {
            ObstructionScale::Halved
        },
    };
    let config = SearchConfig::default()
        .with_max_depth(args.max_depth)
        .with_evaluator(evaluator);
    let time_budget = Duration::from_millis(args.time_ms);

    let mut solver = Solver::new(HexBoard::new(args.size)?).with_config(config);
    let stdin = stdin();

    println!("Welcome to Hex\n");
    println!("Player 1 (red) connects top and bottom, Player 2 (blue) connects left and right.\n");

    let ai_players = (
        ask_yes_no(&stdin, "Is player 1 AI controlled?")?,
        ask_yes_no(&stdin, "Is player 2 AI controlled?")?,
    );

    let mut last_move: Option<Move> = None;

    // game loop
    loop {
        display(&solver, last_move)?;

        if let Some(winner) = solver.winner() {
            println!("{} wins!", winner);
            break;
        }

        let side = solver.side_to_move();
        let ai_turn = match side {
            Side::PlayerOne => ai_players.0,
            Side::PlayerTwo => ai_players.1,
        };

        let next_move = if ai_turn {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}"));
            spinner.set_message("AI is thinking...");
            spinner.enable_steady_tick(100);

            let outcome = solver.select_move(time_budget);
            spinner.finish_and_clear();

            match outcome.best_move {
                Some(mv) => {
                    println!(
                        "{} plays {} (depth {}, {} positions, {:?})",
                        side, mv, outcome.depth_reached, outcome.node_count, outcome.mode
                    );
                    mv
                }
                None => {
                    println!("{} has no move left", side);
                    break;
                }
            }

        // human player
        } else {
            print!("{} move input > ", side);
            stdout().flush()?;
            let mut input_str = String::new();
            if stdin.read_line(&mut input_str)? == 0 {
                println!("Input closed, leaving the game");
                break;
            }

            match input_str.trim().parse::<Move>() {
                Err(err) => {
                    println!("{}", err);
                    continue;
                }
                Ok(mv) => mv,
            }
        };

        if let Err(err) = solver.play(next_move) {
            println!("{}", err);
            // try the move again
            continue;
        }
        last_move = Some(next_move);
    }
    Ok(())
}
