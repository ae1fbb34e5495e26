use serde::Deserialize;

use crate::limits::DEFAULT_HISTORY_PAGE;
use crate::model::*;

/// Parsed command from one protocol line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Ping,
    Status,
    ListClubs,
    AddClub {
        name: String,
        credit: Credit,
    },
    RemoveClub {
        name: String,
    },
    ListRooms,
    AddRoom {
        name: String,
    },
    RemoveRoom {
        name: String,
    },
    SetRoomOpen {
        room: String,
        days: Vec<String>,
        open: bool,
    },
    Submit {
        club: String,
        selections: Vec<DaySelection>,
    },
    Pending,
    Run,
    History {
        limit: usize,
    },
}

/// JSON body of `SUBMIT`.
#[derive(Deserialize)]
struct SubmitBody {
    club: String,
    selections: Vec<DaySelection>,
}

/// Parse one line. Keywords are case-insensitive; names are single words or
/// double-quoted strings.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }
    let (head, rest) = split_word(line);
    let keyword = head.to_ascii_uppercase();

    // SUBMIT takes the raw remainder, everything else is tokenized.
    if keyword == "SUBMIT" {
        if rest.is_empty() {
            return Err(CommandError::MissingArgument("SUBMIT", "json body"));
        }
        let body: SubmitBody =
            serde_json::from_str(rest).map_err(|e| CommandError::BadJson(e.to_string()))?;
        return Ok(Command::Submit {
            club: body.club,
            selections: body.selections,
        });
    }

    let args = tokenize(rest)?;
    match keyword.as_str() {
        "PING" => no_args("PING", &args, Command::Ping),
        "STATUS" => no_args("STATUS", &args, Command::Status),
        "CLUBS" => no_args("CLUBS", &args, Command::ListClubs),
        "ROOMS" => no_args("ROOMS", &args, Command::ListRooms),
        "PENDING" => no_args("PENDING", &args, Command::Pending),
        "RUN" => no_args("RUN", &args, Command::Run),
        "HISTORY" => match args.as_slice() {
            [] => Ok(Command::History {
                limit: DEFAULT_HISTORY_PAGE,
            }),
            [n] => Ok(Command::History {
                limit: parse_number(n)?,
            }),
            _ => Err(CommandError::TooManyArguments("HISTORY")),
        },
        "CLUB" => parse_club(&args),
        "ROOM" => parse_room(&args),
        _ => Err(CommandError::Unknown(head.to_string())),
    }
}

fn parse_club(args: &[String]) -> Result<Command, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("CLUB", "ADD or REMOVE"));
    };
    match (sub.to_ascii_uppercase().as_str(), rest) {
        ("ADD", [name]) => Ok(Command::AddClub {
            name: name.clone(),
            credit: 0,
        }),
        ("ADD", [name, credit]) => Ok(Command::AddClub {
            name: name.clone(),
            credit: parse_number(credit)?,
        }),
        ("ADD", []) => Err(CommandError::MissingArgument("CLUB ADD", "name")),
        ("ADD", _) => Err(CommandError::TooManyArguments("CLUB ADD")),
        ("REMOVE", [name]) => Ok(Command::RemoveClub { name: name.clone() }),
        ("REMOVE", []) => Err(CommandError::MissingArgument("CLUB REMOVE", "name")),
        ("REMOVE", _) => Err(CommandError::TooManyArguments("CLUB REMOVE")),
        _ => Err(CommandError::Unknown(format!("CLUB {sub}"))),
    }
}

fn parse_room(args: &[String]) -> Result<Command, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("ROOM", "ADD, REMOVE, OPEN or CLOSE"));
    };
    let sub_upper = sub.to_ascii_uppercase();
    match (sub_upper.as_str(), rest) {
        ("ADD", [name]) => Ok(Command::AddRoom { name: name.clone() }),
        ("REMOVE", [name]) => Ok(Command::RemoveRoom { name: name.clone() }),
        ("OPEN" | "CLOSE", [room, days @ ..]) if !days.is_empty() => Ok(Command::SetRoomOpen {
            room: room.clone(),
            days: days.to_vec(),
            open: sub_upper == "OPEN",
        }),
        ("ADD" | "REMOVE", []) => Err(CommandError::MissingArgument("ROOM", "name")),
        ("OPEN" | "CLOSE", _) => Err(CommandError::MissingArgument("ROOM", "name and day")),
        ("ADD" | "REMOVE", _) => Err(CommandError::TooManyArguments("ROOM")),
        _ => Err(CommandError::Unknown(format!("ROOM {sub}"))),
    }
}

fn no_args(keyword: &'static str, args: &[String], cmd: Command) -> Result<Command, CommandError> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(CommandError::TooManyArguments(keyword))
    }
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, CommandError> {
    s.parse()
        .map_err(|_| CommandError::BadNumber(s.to_string()))
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Split on whitespace, keeping `"double quoted"` runs together.
fn tokenize(s: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                token.push(c);
            }
            if !closed {
                return Err(CommandError::UnterminatedQuote);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str, &'static str),
    TooManyArguments(&'static str),
    BadNumber(String),
    BadJson(String),
    UnterminatedQuote,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(s) => write!(f, "unknown command: {s}"),
            CommandError::MissingArgument(cmd, what) => write!(f, "{cmd}: missing {what}"),
            CommandError::TooManyArguments(cmd) => write!(f, "{cmd}: too many arguments"),
            CommandError::BadNumber(s) => write!(f, "expected a non-negative integer, got {s:?}"),
            CommandError::BadJson(e) => write!(f, "bad json: {e}"),
            CommandError::UnterminatedQuote => write!(f, "unterminated quote"),
        }
    }
}

impl std::error::Error for CommandError {}
