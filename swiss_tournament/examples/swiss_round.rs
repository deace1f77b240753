//! Run a small Swiss event in memory and print each round.
//!
//! ```text
//! cargo run -p swiss_tournament --example swiss_round
//! ```

use std::sync::Arc;
use swiss_tournament::db::MemoryTournamentStore;
use swiss_tournament::tournament::{TournamentManager, TournamentResult};

#[tokio::main]
async fn main() -> TournamentResult<()> {
    let manager = TournamentManager::new(Arc::new(MemoryTournamentStore::new()));

    for name in [
        "Bruno Walton",
        "Boots O'Neal",
        "Cathy Burton",
        "Diane Grant",
        "Markov Chaney",
    ] {
        manager.register_player(name, None).await?;
    }

    for round in 1..=3 {
        println!("Round {round}");
        for pairing in manager.pairings(None).await? {
            println!("  {} vs {}", pairing.name_a, pairing.name_b);
            // the first-named player wins every board
            manager
                .report_match(pairing.player_a, pairing.player_b, None)
                .await?;
        }
    }

    println!("\nFinal standings");
    for (rank, row) in manager.standings(None).await?.iter().enumerate() {
        println!(
            "{:>2}. {:<16} {:>2} pts  {} played  tb {:.2}",
            rank + 1,
            row.name,
            row.points,
            row.matches,
            row.tie_break
        );
    }

    Ok(())
}
