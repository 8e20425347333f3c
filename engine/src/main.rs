use minelayer::{Deduction, Game, GameMode, GameState, Pos};
use rand::prelude::IndexedRandom;
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    // --- 1. Initialization ---
    let mut game = Game::new(10, 10, 15, GameMode::Training, 0);
    let mut rng = rand::rng();

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: Prioritize logically safe moves, guess randomly otherwise.");
    println!("Initial Board:");
    print_board(&game);
    thread::sleep(Duration::from_secs(2));

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while game.state == GameState::Playing {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        // --- 3. Bot's Decision Logic ---

        // First, classify the frontier to find logically forced moves.
        let hints = game.cell_hints();
        let safe_move = hints
            .iter()
            .find(|h| h.deduction == Deduction::Safe)
            .map(|h| h.pos);

        let point_to_reveal = if safe_move.is_some() {
            println!("Logic found a guaranteed safe cell.");
            safe_move
        } else {
            // No safe move found, so make a random guess.
            println!("No logically safe move found. Making a random guess...");
            let hidden_cells: Vec<Pos> = (0..game.board.rows)
                .flat_map(|row| (0..game.board.cols).map(move |col| Pos { row, col }))
                .filter(|&at| !game.board.cell(at).is_revealed)
                .collect();
            hidden_cells.choose(&mut rng).copied()
        };

        // --- 4. Execute the Chosen Move ---
        if let Some(point) = point_to_reveal {
            println!("Bot reveals ({}, {})...", point.row, point.col);

            game.reveal_cell(point, &mut rng).unwrap();

            print_board(&game);
        } else {
            // This happens if there are no hidden cells left to click,
            // which usually means the game has been won or is in a strange state.
            println!("No valid moves left for the bot to make.");
            break;
        }

        // Add a delay to make the game watchable
        thread::sleep(Duration::from_millis(500));
    }

    // --- 5. Final Result ---
    println!("\n--- Game Over ---");

    match game.state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }
}

fn print_board(game: &Game) {
    // Print header
    print!("   ");
    for col in 0..game.board.cols {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(game.board.cols));

    // Print rows
    for (row, cells) in game.board.cells.iter().enumerate() {
        print!("{:^2}|", row);
        for cell in cells {
            let display = if cell.is_revealed {
                format!(" {} ", cell.neighbor_mines)
            } else if cell.is_flagged {
                " ⚑ ".to_string()
            } else {
                " ■ ".to_string()
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
