//! Line-oriented browse loop over a `Session`.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::runtime::Session;
use super::store::Action;
use super::view::render;
use crate::database::{OrderColumn, OrderSpec};
use crate::error::AppResult;

pub const HELP: &str = "\
Commands:
  n                 next page
  p                 previous page
  t <text>          filter by title (empty clears)
  from <date>       earliest air date, YYYY.MM.DD (empty clears)
  to <date>         latest air date, YYYY.MM.DD (empty clears)
  sort title|date|episode   toggle a column
  sort <1-6>        episode, date or title; odd codes ascending
  show <row>        characters of a row
  close             hide characters
  q                 quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply(Action),
    /// 1-based row on the current page.
    Show(usize),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (word, rest) = match line.trim_start().split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (line.trim(), ""),
    };

    match word {
        "n" | "next" => Ok(Command::Apply(Action::NextPage)),
        "p" | "prev" => Ok(Command::Apply(Action::PreviousPage)),
        "t" | "title" => Ok(Command::Apply(Action::FilterTitle(rest.to_string()))),
        "from" => Ok(Command::Apply(Action::FilterFrom(rest.trim().to_string()))),
        "to" => Ok(Command::Apply(Action::FilterTo(rest.trim().to_string()))),
        "sort" => {
            let column = match rest.trim() {
                "title" => OrderColumn::Title,
                "date" => OrderColumn::Date,
                "episode" => OrderColumn::Episode,
                other => {
                    return other
                        .parse::<i64>()
                        .ok()
                        .and_then(OrderSpec::from_code)
                        .map(|order| Command::Apply(Action::SetOrder(order)))
                        .ok_or_else(|| format!("Unknown sort column or code {:?}", other))
                }
            };
            Ok(Command::Apply(Action::ToggleOrder(column)))
        }
        "show" => rest
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|row| *row > 0)
            .map(Command::Show)
            .ok_or_else(|| format!("Expected a row number, got {:?}", rest.trim())),
        "close" => Ok(Command::Apply(Action::ClosePopup)),
        "h" | "help" | "?" => Ok(Command::Help),
        "q" | "quit" => Ok(Command::Quit),
        "" => Err("Empty command".to_string()),
        other => Err(format!("Unknown command {:?} (try help)", other)),
    }
}

/// Read commands until `q` or end of input, printing the view after each.
pub async fn run<R, W>(session: &mut Session, input: R, mut out: W) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    session.start();
    session.settle().await;
    write!(out, "{}", render(session.state()))?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{}", message)?;
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => {
                writeln!(out, "{}", HELP)?;
                continue;
            }
            Command::Show(row) => {
                let episode_id = session.state().rows.get(row - 1).map(|r| r.episode.id);
                match episode_id {
                    Some(id) => session.dispatch(Action::OpenPopup(id)),
                    None => {
                        writeln!(out, "No row {} on this page", row)?;
                        continue;
                    }
                }
            }
            Command::Apply(action) => session.dispatch(action),
        }

        session.settle().await;
        write!(out, "{}", render(session.state()))?;
        out.flush()?;
    }

    session.shutdown();
    Ok(())
}
