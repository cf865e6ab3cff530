use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use hex_ai::board::{Cell, HexBoard, Move, Side};

fn side_color(side: Side) -> Color {
    match side {
        Side::PlayerOne => Color::Red,
        Side::PlayerTwo => Color::Blue,
    }
}

fn column_labels(size: usize) -> String {
    let labels: String = (0..size)
        .map(|col| format!(" {}", (b'a' + col as u8) as char))
        .collect();
    format!("   {}\n", labels)
}

/// Draws the board as a rhombus, the edges coloured after the player who
/// has to connect them
pub fn display(board: &HexBoard, last_move: Option<Move>) -> Result<()> {
    let mut stdout = stdout();
    let size = board.size();

    stdout.queue(PrintStyledContent(
        style(column_labels(size)).with(side_color(Side::PlayerOne)),
    ))?;
    for row in 0..size {
        stdout.queue(PrintStyledContent(
            style(format!("{:>width$}{:>3}", "", row + 1, width = row))
                .with(side_color(Side::PlayerTwo)),
        ))?;
        for col in 0..size {
            let cell = board.cell(row, col);
            let mut glyph = match cell {
                Cell::Empty => style(" ."),
                Cell::Stone(side) => style(" O")
                    .attribute(Attribute::Bold)
                    .with(side_color(side)),
            };
            if last_move == Some(Move::new(row, col)) {
                glyph = glyph.attribute(Attribute::Underlined);
            }
            stdout.queue(PrintStyledContent(glyph))?;
        }
        stdout.queue(PrintStyledContent(
            style(format!(" {}\n", row + 1)).with(side_color(Side::PlayerTwo)),
        ))?;
    }
    stdout.queue(PrintStyledContent(
        style(format!("{:>width$}{}", "", column_labels(size), width = size))
            .with(side_color(Side::PlayerOne)),
    ))?;
    stdout.flush()?;
    Ok(())
}
