//! Command parsing and execution.
//!
//! A command line is parsed into an [`Invocation`], executed against a
//! [`TournamentManager`] and rendered either as text or as JSON.

use anyhow::{Context, bail};
use pico_args::Arguments;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt::Write as _;
use swiss_tournament::db::Database;
use swiss_tournament::tournament::{
    ByePolicy, MatchId, MatchOutcome, Pairing, PlayerId, RecordedMatch, RosterEntry, Standing,
    TournamentId, TournamentInfo, TournamentManager,
};

pub const HELP: &str = "\
Administer Swiss-system tournaments

USAGE:
  swiss_admin [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  init-db                  Create the tournament tables
  health                   Check database connectivity
  create-tournament        Start a new tournament
  list                     List all tournaments
  register NAME            Register a new player
  attach PLAYER            Attach an existing player
  deactivate PLAYER        Remove a player from standings and pairing
  deactivate-all           Deactivate every player
  count                    Count active players
  roster                   Show every membership
  report-match WIN LOSE    Record a win
  report-draw A B          Record a draw
  report-bye PLAYER        Record a bye
  standings                Show ranked standings
  pairings                 Pair the next round (awards a bye if needed)
  history                  Show the match log
  wipe-matches             Delete the tournament's matches
  wipe-players             Delete all players everywhere

OPTIONS:
  --tournament N           Tournament id  [default: most recent]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --bye-policy POLICY      cycle or strict  [default: env SWISS_BYE_POLICY or cycle]

FLAGS:
  --json                   Print results as JSON
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size
  DB_QUERY_TIMEOUT         Per-query timeout in seconds
  SWISS_BYE_POLICY         Bye policy once every player holds a bye
  RUST_LOG                 Log filter
";

/// One admin command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InitDb,
    Health,
    CreateTournament,
    List,
    Register { name: String },
    Attach { player: PlayerId },
    Deactivate { player: PlayerId },
    DeactivateAll,
    Count,
    Roster,
    ReportMatch { winner: PlayerId, loser: PlayerId },
    ReportDraw { player_a: PlayerId, player_b: PlayerId },
    ReportBye { player: PlayerId },
    Standings,
    Pairings,
    History,
    WipeMatches,
    WipePlayers,
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitDb => "init-db",
            Command::Health => "health",
            Command::CreateTournament => "create-tournament",
            Command::List => "list",
            Command::Register { .. } => "register",
            Command::Attach { .. } => "attach",
            Command::Deactivate { .. } => "deactivate",
            Command::DeactivateAll => "deactivate-all",
            Command::Count => "count",
            Command::Roster => "roster",
            Command::ReportMatch { .. } => "report-match",
            Command::ReportDraw { .. } => "report-draw",
            Command::ReportBye { .. } => "report-bye",
            Command::Standings => "standings",
            Command::Pairings => "pairings",
            Command::History => "history",
            Command::WipeMatches => "wipe-matches",
            Command::WipePlayers => "wipe-players",
        }
    }
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub tournament: Option<TournamentId>,
    pub database_url: Option<String>,
    pub bye_policy: Option<ByePolicy>,
    pub json: bool,
}

/// Parse command line arguments
///
/// Returns `Ok(None)` when help was requested.
pub fn parse_args(mut pargs: Arguments) -> anyhow::Result<Option<Invocation>> {
    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let json = pargs.contains("--json");
    let tournament = pargs.opt_value_from_str("--tournament")?;
    let database_url = pargs.opt_value_from_str("--db-url")?;
    let bye_policy = pargs
        .opt_value_from_fn("--bye-policy", |s| s.parse::<ByePolicy>())
        .context("Invalid --bye-policy")?;

    let Some(name) = pargs.subcommand()? else {
        bail!("Missing command, see --help");
    };

    let command = match name.as_str() {
        "init-db" => Command::InitDb,
        "health" => Command::Health,
        "create-tournament" => Command::CreateTournament,
        "list" => Command::List,
        "register" => Command::Register {
            name: pargs.free_from_str().context("register needs a NAME")?,
        },
        "attach" => Command::Attach {
            player: player_arg(&mut pargs, "PLAYER")?,
        },
        "deactivate" => Command::Deactivate {
            player: player_arg(&mut pargs, "PLAYER")?,
        },
        "deactivate-all" => Command::DeactivateAll,
        "count" => Command::Count,
        "roster" => Command::Roster,
        "report-match" => Command::ReportMatch {
            winner: player_arg(&mut pargs, "WINNER")?,
            loser: player_arg(&mut pargs, "LOSER")?,
        },
        "report-draw" => Command::ReportDraw {
            player_a: player_arg(&mut pargs, "A")?,
            player_b: player_arg(&mut pargs, "B")?,
        },
        "report-bye" => Command::ReportBye {
            player: player_arg(&mut pargs, "PLAYER")?,
        },
        "standings" => Command::Standings,
        "pairings" => Command::Pairings,
        "history" => Command::History,
        "wipe-matches" => Command::WipeMatches,
        "wipe-players" => Command::WipePlayers,
        other => bail!("Unknown command: {other}"),
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        bail!("Unexpected arguments: {}", join_os(&rest));
    }

    Ok(Some(Invocation {
        command,
        tournament,
        database_url,
        bye_policy,
        json,
    }))
}

fn player_arg(pargs: &mut Arguments, what: &str) -> anyhow::Result<PlayerId> {
    pargs
        .free_from_str()
        .with_context(|| format!("Expected a numeric player id for {what}"))
}

fn join_os(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of one command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    Done(String),
    Tournament(TournamentId),
    Tournaments(Vec<TournamentInfo>),
    Player(PlayerId),
    Count(usize),
    Changed(u64),
    Match(MatchId),
    Roster(Vec<RosterEntry>),
    #[serde(serialize_with = "serialize_standings")]
    Standings(Vec<Standing>),
    Pairings(Vec<Pairing>),
    History(Vec<RecordedMatch>),
}

/// A standings row as printed, with points expressed in wins
#[derive(Serialize)]
struct StandingView<'a> {
    #[serde(flatten)]
    standing: &'a Standing,
    win_fraction: f64,
}

fn serialize_standings<S>(rows: &[Standing], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(rows.iter().map(|standing| StandingView {
        standing,
        win_fraction: standing.win_fraction(),
    }))
}

/// Run a command
///
/// `database` is only consulted by commands that manage the database itself.
pub async fn execute(
    command: &Command,
    tournament: Option<TournamentId>,
    manager: &TournamentManager,
    database: Option<&Database>,
) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::InitDb | Command::Health => {
            let Some(db) = database else {
                bail!("{} needs a database connection", command.name());
            };
            if *command == Command::InitDb {
                db.apply_schema().await.context("Failed to apply schema")?;
                Outcome::Done("Schema applied".to_string())
            } else {
                let latency = db.health_check().await.context("Database health check failed")?;
                let schema = if db.schema_present().await? {
                    "schema present"
                } else {
                    "schema missing, run init-db"
                };
                Outcome::Done(format!(
                    "Database is healthy ({} ms, {schema})",
                    latency.as_millis()
                ))
            }
        }
        Command::CreateTournament => Outcome::Tournament(manager.create_tournament().await?),
        Command::List => Outcome::Tournaments(manager.list_tournaments().await?),
        Command::Register { name } => {
            Outcome::Player(manager.register_player(name, tournament).await?)
        }
        Command::Attach { player } => {
            manager.attach_player(*player, tournament).await?;
            Outcome::Done(format!("Attached player {player}"))
        }
        Command::Deactivate { player } => {
            manager.deactivate_player(*player, tournament).await?;
            Outcome::Done(format!("Deactivated player {player}"))
        }
        Command::DeactivateAll => {
            Outcome::Changed(manager.deactivate_all_players(tournament).await?)
        }
        Command::Count => Outcome::Count(manager.count_active_players(tournament).await?),
        Command::Roster => Outcome::Roster(manager.roster(tournament).await?),
        Command::ReportMatch { winner, loser } => {
            Outcome::Match(manager.report_match(*winner, *loser, tournament).await?)
        }
        Command::ReportDraw { player_a, player_b } => {
            Outcome::Match(manager.report_draw(*player_a, *player_b, tournament).await?)
        }
        Command::ReportBye { player } => {
            Outcome::Match(manager.report_bye(*player, tournament).await?)
        }
        Command::Standings => Outcome::Standings(manager.standings(tournament).await?),
        Command::Pairings => Outcome::Pairings(manager.pairings(tournament).await?),
        Command::History => Outcome::History(manager.match_history(tournament).await?),
        Command::WipeMatches => Outcome::Changed(manager.wipe_matches(tournament).await?),
        Command::WipePlayers => Outcome::Changed(manager.wipe_all_players().await?),
    };

    Ok(outcome)
}

/// Render an outcome for the terminal
pub fn render(outcome: &Outcome, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(outcome)?);
    }

    let mut out = String::new();
    match outcome {
        Outcome::Done(message) => out.push_str(message),
        Outcome::Tournament(id) => write!(out, "Tournament {id}")?,
        Outcome::Player(id) => write!(out, "Player {id}")?,
        Outcome::Count(n) => write!(out, "{n}")?,
        Outcome::Changed(n) => write!(out, "{n} row(s) affected")?,
        Outcome::Match(id) => write!(out, "Match {id}")?,
        Outcome::Tournaments(list) => {
            writeln!(out, "{:>4}  {:<20}  {:>6}  {:>7}", "ID", "CREATED", "ACTIVE", "MATCHES")?;
            for t in list {
                writeln!(
                    out,
                    "{:>4}  {:<20}  {:>6}  {:>7}",
                    t.id,
                    t.created_at.format("%Y-%m-%d %H:%M:%S"),
                    t.active_count,
                    t.match_count
                )?;
            }
        }
        Outcome::Roster(entries) => {
            writeln!(out, "{:>4}  {:<24}  {:<8}  {}", "ID", "NAME", "STATUS", "BYE")?;
            for e in entries {
                writeln!(
                    out,
                    "{:>4}  {:<24}  {:<8}  {}",
                    e.player_id,
                    e.name,
                    if e.active { "active" } else { "inactive" },
                    if e.bye_awarded { "yes" } else { "no" }
                )?;
            }
        }
        Outcome::Standings(rows) => {
            writeln!(
                out,
                "{:>4}  {:>4}  {:<24}  {:>6}  {:>5}  {:>7}  {:>9}",
                "RANK", "ID", "NAME", "POINTS", "WINS", "MATCHES", "TIE-BREAK"
            )?;
            for (rank, s) in rows.iter().enumerate() {
                writeln!(
                    out,
                    "{:>4}  {:>4}  {:<24}  {:>6}  {:>5.2}  {:>7}  {:>9.2}",
                    rank + 1,
                    s.player_id,
                    s.name,
                    s.points,
                    s.win_fraction(),
                    s.matches,
                    s.tie_break
                )?;
            }
        }
        Outcome::Pairings(pairs) => {
            for p in pairs {
                writeln!(
                    out,
                    "{} ({}) vs {} ({})",
                    p.name_a, p.player_a, p.name_b, p.player_b
                )?;
            }
        }
        Outcome::History(matches) => {
            for m in matches {
                let line = match m.outcome {
                    MatchOutcome::Win { winner, loser } => format!("{winner} beat {loser}"),
                    MatchOutcome::Draw { player_a, player_b } => {
                        format!("{player_a} drew with {player_b}")
                    }
                    MatchOutcome::Bye { player } => format!("{player} received a bye"),
                };
                writeln!(out, "#{:<5} {line}", m.match_id)?;
            }
        }
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Arguments {
        Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    #[test]
    fn test_parse_simple_command() {
        let inv = parse_args(args(&["standings"])).unwrap().unwrap();
        assert_eq!(inv.command, Command::Standings);
        assert_eq!(inv.tournament, None);
        assert!(!inv.json);
    }

    #[test]
    fn test_parse_options_before_command() {
        let inv = parse_args(args(&[
            "--json",
            "--tournament",
            "3",
            "--bye-policy",
            "strict",
            "report-match",
            "7",
            "9",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(inv.command, Command::ReportMatch { winner: 7, loser: 9 });
        assert_eq!(inv.tournament, Some(3));
        assert_eq!(inv.bye_policy, Some(ByePolicy::Strict));
        assert!(inv.json);
    }

    #[test]
    fn test_parse_register_name_with_spaces() {
        let inv = parse_args(args(&["register", "Bruno Walton"])).unwrap().unwrap();
        assert_eq!(
            inv.command,
            Command::Register {
                name: "Bruno Walton".to_string()
            }
        );
    }

    #[test]
    fn test_parse_help() {
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["shuffle"])).is_err());
        assert!(parse_args(args(&["attach", "bob"])).is_err());
        assert!(parse_args(args(&["report-draw", "1"])).is_err());
        assert!(parse_args(args(&["count", "extra"])).is_err());
        assert!(parse_args(args(&["--bye-policy", "never", "count"])).is_err());
    }

    #[test]
    fn test_render_count_and_json() {
        assert_eq!(render(&Outcome::Count(4), false).unwrap(), "4");

        let json = render(&Outcome::Match(12), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "match");
        assert_eq!(value["data"], 12);
    }

    #[test]
    fn test_render_history() {
        let history = Outcome::History(vec![
            RecordedMatch {
                match_id: 1,
                outcome: MatchOutcome::Win { winner: 1, loser: 2 },
            },
            RecordedMatch {
                match_id: 2,
                outcome: MatchOutcome::Bye { player: 3 },
            },
        ]);
        let text = render(&history, false).unwrap();
        assert!(text.contains("1 beat 2"));
        assert!(text.contains("3 received a bye"));
    }

    #[test]
    fn test_render_standings_shows_wins() {
        let standings = Outcome::Standings(vec![Standing {
            player_id: 4,
            name: "Cathy Burton".to_string(),
            points: 7,
            matches: 3,
            tie_break: 2.5,
        }]);

        let text = render(&standings, false).unwrap();
        assert!(text.lines().next().unwrap().contains("WINS"));
        assert!(text.contains("2.33"));

        let json = render(&standings, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "standings");
        assert_eq!(value["data"][0]["player_id"], 4);
        assert_eq!(value["data"][0]["points"], 7);
        let wins = value["data"][0]["win_fraction"].as_f64().unwrap();
        assert!((wins - 7.0 / 3.0).abs() < 1e-9);
    }
}
