#[cfg(test)]
pub mod test {
    use anyhow::{anyhow, Result};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::board::{HexBoard, Move, Side};
    use crate::evaluator::Evaluator;
    use crate::solver::{order_moves, SearchConfig, SearchMode, Solver};
    use crate::transposition_table::{Bound, Entry, TranspositionTable};
    use crate::WIN_SCORE;

    fn search(board: &HexBoard, config: SearchConfig, depth: u32) -> Result<(i32, Move, u64)> {
        let mut solver = Solver::new(board.clone()).with_config(config);
        let (score, best) = solver
            .search(depth)
            .ok_or_else(|| anyhow!("no move found at depth {}", depth))?;
        Ok((score, best, solver.node_count))
    }

    #[test]
    pub fn pruning_matches_full_minimax() -> Result<()> {
        let full = SearchConfig::default()
            .with_pruning(false)
            .with_transpositions(false);

        for moves in &["b2 c3", "a1 d4 b3", "c2 b3 a4 d1"] {
            let board = HexBoard::from_moves(4, moves)?;
            let (pruned_score, _, pruned_nodes) = search(&board, SearchConfig::default(), 3)?;
            let (full_score, _, full_nodes) = search(&board, full, 3)?;

            assert_eq!(pruned_score, full_score, "position {}", moves);
            assert!(pruned_nodes <= full_nodes);
        }
        Ok(())
    }

    #[test]
    pub fn move_ordering_does_not_change_the_result() -> Result<()> {
        let unordered = SearchConfig::default().with_move_ordering(false);

        let board = HexBoard::from_moves(4, "b2 c3 a3")?;
        let (ordered_score, _, _) = search(&board, SearchConfig::default(), 3)?;
        let (unordered_score, _, _) = search(&board, unordered, 3)?;
        assert_eq!(ordered_score, unordered_score);

        // a single winning move is found either way
        let board = HexBoard::from_moves(3, "a1 b1 a2 b2")?;
        let (_, ordered_move, _) = search(&board, SearchConfig::default(), 2)?;
        let (_, unordered_move, _) = search(&board, unordered, 2)?;
        assert_eq!(ordered_move, Move::new(2, 0));
        assert_eq!(unordered_move, Move::new(2, 0));
        Ok(())
    }

    #[test]
    pub fn shallow_transposition_entries_are_ignored() -> Result<()> {
        let board = HexBoard::from_moves(4, "b2 c3")?;
        let bait = Move::new(0, 0);

        let mut child = board.clone();
        child.play(bait);
        let mut poisoned = TranspositionTable::with_capacity(1 << 12);
        poisoned.store(
            child.fingerprint(),
            Entry {
                value: WIN_SCORE / 2,
                bound: Bound::Exact,
                depth: 0,
            },
        );

        // a horizon-depth entry answers a horizon-depth query
        let mut solver = Solver::new_with_transposition_table(board.clone(), poisoned.clone());
        assert_eq!(solver.search(1), Some((WIN_SCORE / 2, bait)));

        // but never a deeper one
        let mut solver = Solver::new_with_transposition_table(board.clone(), poisoned);
        let with_entry = solver.search(2);
        let mut clean = Solver::new(board);
        assert_eq!(with_entry, clean.search(2));
        assert_ne!(with_entry.map(|(score, _)| score), Some(WIN_SCORE / 2));
        Ok(())
    }

    #[test]
    pub fn iterative_deepening_keeps_last_completed_depth() -> Result<()> {
        let board = HexBoard::from_moves(4, "b2 c3")?;
        let budget = Duration::from_secs(60);

        let config = SearchConfig::default().with_max_depth(2);
        let two_ply = Solver::new(board.clone())
            .with_config(config)
            .select_move(budget);
        assert_eq!(two_ply.depth_reached, 2);
        assert_eq!(two_ply.mode, SearchMode::IterativeDeepening);

        // allow depth 3 a single node past everything depth 1 and 2 needed
        let config = SearchConfig::default()
            .with_max_depth(3)
            .with_node_limit(two_ply.node_count + 1);
        let interrupted = Solver::new(board).with_config(config).select_move(budget);

        assert_eq!(interrupted.depth_reached, 2);
        assert_eq!(interrupted.best_move, two_ply.best_move);
        assert_eq!(interrupted.score, two_ply.score);
        assert_eq!(interrupted.mode, SearchMode::IterativeDeepening);
        Ok(())
    }

    #[test]
    pub fn faster_wins_are_preferred() -> Result<()> {
        // player 1 wins at once on a3, or later through other lines
        let board = HexBoard::from_moves(3, "a1 b1 a2 b2")?;
        let config = SearchConfig::default().with_immediate_wins(false);

        let (score, best, _) = search(&board, config, 3)?;
        assert_eq!(best, Move::new(2, 0));
        assert_eq!(score, WIN_SCORE - 1);

        let outcome = Solver::new(board)
            .with_config(config)
            .select_move(Duration::from_secs(60));
        assert_eq!(outcome.best_move, Some(Move::new(2, 0)));
        // a proven win ends the deepening
        assert_eq!(outcome.depth_reached, 1);
        Ok(())
    }

    #[test]
    pub fn opponent_immediate_win_is_blocked() -> Result<()> {
        let mut board = HexBoard::new(4)?;
        for col in 0..3 {
            board.place_stone(Move::new(1, col), Side::PlayerTwo)?;
        }
        board.place_stone(Move::new(0, 3), Side::PlayerOne)?;
        board.place_stone(Move::new(3, 0), Side::PlayerOne)?;
        board.set_side_to_move(Side::PlayerOne);
        let block = Move::new(1, 3);

        let outcome = Solver::new(board.clone()).select_move(Duration::from_secs(60));
        assert_eq!(outcome.best_move, Some(block));
        assert_eq!(outcome.mode, SearchMode::Forced);

        // the search alone finds it too
        let config = SearchConfig::default()
            .with_immediate_wins(false)
            .with_max_depth(2);
        let outcome = Solver::new(board)
            .with_config(config)
            .select_move(Duration::from_secs(60));
        assert_eq!(outcome.best_move, Some(block));
        assert_eq!(outcome.mode, SearchMode::IterativeDeepening);
        Ok(())
    }

    #[test]
    pub fn immediate_win_is_played_without_search() -> Result<()> {
        let board = HexBoard::from_moves(3, "a1 b1 a2 b2")?;

        let outcome = Solver::new(board).select_move(Duration::from_secs(60));
        assert_eq!(outcome.best_move, Some(Move::new(2, 0)));
        assert_eq!(outcome.mode, SearchMode::Forced);
        assert_eq!(outcome.node_count, 0);
        Ok(())
    }

    #[test]
    pub fn zero_budget_falls_back_to_best_ordered_move() -> Result<()> {
        let mut board = HexBoard::from_moves(5, "c3")?;
        let legal = board.legal_moves();
        let expected = order_moves(&mut board, &legal, &Evaluator::default())[0];

        let outcome = Solver::new(board).select_move(Duration::from_millis(0));
        assert_eq!(outcome.mode, SearchMode::Fallback);
        assert_eq!(outcome.best_move, Some(expected));
        assert_eq!(outcome.depth_reached, 0);
        assert_eq!(outcome.score, None);
        Ok(())
    }

    #[test]
    pub fn finished_game_has_no_move() -> Result<()> {
        let board = HexBoard::from_moves(3, "a1 b1 a2 b2 a3")?;
        assert_eq!(board.winner(), Some(Side::PlayerOne));

        let outcome = Solver::new(board).select_move(Duration::from_secs(1));
        assert_eq!(outcome.best_move, None);
        assert_eq!(outcome.mode, SearchMode::NoMoves);
        assert_eq!(outcome.node_count, 0);
        Ok(())
    }

    #[test]
    pub fn time_expiry_notified_from_another_thread() -> Result<()> {
        let mut solver = Solver::new(HexBoard::new(9)?);
        let handle = solver.stop_handle();

        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.notify_time_expired();
        });
        let start_time = Instant::now();
        let outcome = solver.select_move(Duration::from_secs(120));
        let elapsed = start_time.elapsed();
        timer.join().map_err(|_| anyhow!("timer thread panicked"))?;

        assert!(outcome.best_move.is_some());
        assert!(elapsed < Duration::from_secs(30));
        println!(
            "Stopped after {:?} at depth {} with {} nodes",
            elapsed, outcome.depth_reached, outcome.node_count
        );
        Ok(())
    }

    #[test]
    pub fn self_play_reaches_a_winner() -> Result<()> {
        let mut solver = Solver::new(HexBoard::new(5)?);
        let mut times = vec![];
        let mut posis = vec![];

        while !solver.is_terminal() {
            let start_time = Instant::now();
            let outcome = solver.select_move(Duration::from_millis(20));
            times.push(start_time.elapsed());
            posis.push(outcome.node_count);

            let mv = outcome
                .best_move
                .ok_or_else(|| anyhow!("no move in a running game"))?;
            solver.play(mv)?;
        }
        assert!(solver.winner().is_some());
        assert!(solver.stone_count() <= 25);

        println!(
            "Self-play:\nMean time: {:.6}ms, Mean no. of positions: {}",
            (times.iter().sum::<Duration>() / times.len() as u32).as_secs_f64() * 1000.0,
            posis.iter().sum::<u64>() as f64 / posis.len() as f64,
        );
        Ok(())
    }
}
