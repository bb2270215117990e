use chrono::NaiveDate;
use std::convert::TryFrom;
use std::path::Path;
use unsegen::input::*;

use nom::{
    bytes::complete::{is_not, take_while1},
    character::complete::{char, digit0, space0, space1},
    combinator::{all_consuming, map_res, opt, rest},
    multi::separated_list1,
    sequence::{pair, preceded, separated_pair, terminated},
    IResult,
};

use super::context::{Context, Mode};
use crate::api::ProfileUpdate;
use crate::calendar::DisplayedMonth;
use crate::error::{Error, ErrorKind, Result};

pub type ActionResult = Result<()>;

pub enum Action {
    Arg(fn(&mut Context, &str) -> ActionResult),
    NoArg(fn(&mut Context) -> ActionResult),
    Repeatable(fn(&mut Context, u32) -> ActionResult),
}

const COMMANDS: &[(&str, Action)] = &[
    ("section", Action::Arg(|c, name| c.show_section(name))),
    (
        "next",
        Action::Repeatable(|c, n| c.shift_month(month_count(n)?)),
    ),
    (
        "prev",
        Action::Repeatable(|c, n| c.shift_month(-month_count(n)?)),
    ),
    (
        "today",
        Action::NoArg(|c| {
            c.go_today();
            Ok(())
        }),
    ),
    (
        "goto",
        Action::Arg(|c, month| {
            c.go_to(month.parse::<DisplayedMonth>()?);
            Ok(())
        }),
    ),
    (
        "day",
        Action::Arg(|c, date| c.show_date(NaiveDate::parse_from_str(date, "%Y-%m-%d")?)),
    ),
    (
        "cancel",
        Action::Arg(|c, id| {
            c.cancel_reservation(parse_id(id)?);
            Ok(())
        }),
    ),
    ("edit", Action::Arg(|c, id| c.edit_reservation(parse_id(id)?))),
    ("avatar", Action::Arg(|c, path| c.upload_avatar(Path::new(path)))),
    (
        "profile",
        Action::Arg(|c, fields| c.update_profile(parse_profile(fields)?)),
    ),
    (
        "reload",
        Action::NoArg(|c| {
            c.reload();
            Ok(())
        }),
    ),
    (
        "quit",
        Action::NoArg(|c| {
            c.quit();
            Ok(())
        }),
    ),
];

fn unknown_command(name: &str) -> Error {
    Error::new(
        ErrorKind::CommandParse,
        &format!("Unknown command '{}'", name),
    )
}

fn lookup(name: &str) -> Result<&'static Action> {
    COMMANDS
        .iter()
        .find(|(cmd, _)| *cmd == name)
        .map(|(_, act)| act)
        .ok_or_else(|| unknown_command(name))
}

fn month_count(repeats: u32) -> Result<i32> {
    i32::try_from(repeats).map_err(|_| {
        Error::new(
            ErrorKind::CommandParse,
            &format!("cannot move {} months", repeats),
        )
    })
}

fn parse_id(arg: &str) -> Result<u64> {
    arg.trim().parse::<u64>().map_err(|_| {
        Error::new(
            ErrorKind::CommandParse,
            &format!("'{}' is not a reservation id", arg),
        )
    })
}

fn field_assignment(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        char('='),
        is_not(" \t"),
    )(input)
}

/// Parses `first_name=Ada email=ada@example.org`.
pub fn parse_profile(input: &str) -> Result<ProfileUpdate> {
    let (_, fields) = all_consuming(terminated(
        separated_list1(space1, field_assignment),
        space0,
    ))(input.trim_start())?;

    let mut update = ProfileUpdate::default();
    for (field, value) in fields {
        update.set(field, value)?;
    }
    Ok(update)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub repeats: Option<u32>,
    pub arg: Option<&'a str>,
}

fn command_line(input: &str) -> IResult<&str, ParsedCommand<'_>> {
    let (input, (repeats, name)) = preceded(
        space0,
        pair(
            map_res(digit0, |d: &str| {
                if d.is_empty() {
                    Ok(None)
                } else {
                    d.parse::<u32>().map(Some)
                }
            }),
            take_while1(|c: char| c.is_ascii_alphabetic()),
        ),
    )(input)?;
    let (input, arg) = opt(preceded(space1, rest))(input)?;
    let arg = arg.map(str::trim).filter(|a| !a.is_empty());

    Ok((input, ParsedCommand { name, repeats, arg }))
}

/// Splits a command line into an optional repeat count, the command name
/// and its argument. Names are not checked here.
pub fn parse_command(cmd: &str) -> Result<ParsedCommand<'_>> {
    let (_, parsed) = all_consuming(terminated(command_line, space0))(cmd)?;
    Ok(parsed)
}

pub fn run_command(context: &mut Context, cmd: &str) -> ActionResult {
    let parsed = parse_command(cmd)?;
    let act = lookup(parsed.name)?;

    let misuse = |what: &str| {
        Error::new(
            ErrorKind::CommandParse,
            &format!("'{}' {}", parsed.name, what),
        )
    };

    match (act, parsed.repeats, parsed.arg) {
        (Action::Repeatable(a), repeats, None) => a(context, repeats.unwrap_or(1)),
        (Action::Arg(a), None, Some(arg)) => a(context, arg),
        (Action::Arg(_), None, None) => Err(misuse("needs an argument")),
        (Action::NoArg(a), None, None) => a(context),
        (_, Some(_), _) => Err(misuse("cannot be repeated")),
        (_, None, Some(_)) => Err(misuse("takes no argument")),
    }
}

pub struct CommandParser<'a> {
    context: &'a mut Context,
}

impl<'a> CommandParser<'a> {
    pub fn new(context: &'a mut Context) -> Self {
        CommandParser { context }
    }
}

impl Behavior for CommandParser<'_> {
    fn input(self, input: Input) -> Option<Input> {
        if let Event::Key(Key::Char('\n')) = input.event {
            let cmd = self.context.input_sink_mut().finish_line().to_owned();
            log::debug!("Running command '{}'", cmd);

            if let Err(e) = run_command(self.context, &cmd) {
                log::warn!("Command '{}' failed: {}", cmd, e);
                self.context.show_message(&e.to_string(), false);
            }
            self.context.mode = Mode::Normal;
            None
        } else {
            Some(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_repeat_name_and_argument() {
        assert_eq!(
            parse_command("3next").unwrap(),
            ParsedCommand {
                name: "next",
                repeats: Some(3),
                arg: None
            }
        );
        assert_eq!(
            parse_command("section  calendar ").unwrap(),
            ParsedCommand {
                name: "section",
                repeats: None,
                arg: Some("calendar")
            }
        );
        assert_eq!(
            parse_command("avatar /tmp/me.png").unwrap().arg,
            Some("/tmp/me.png")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_command("").is_err());
        assert!(parse_command("42").is_err());
        assert!(parse_command("!!").is_err());
    }

    #[test]
    fn every_command_is_known() {
        for name in &[
            "section", "next", "prev", "today", "goto", "day", "cancel", "edit", "avatar",
            "profile", "reload", "quit",
        ] {
            assert!(lookup(name).is_ok(), "{}", name);
        }
        assert_eq!(
            lookup("frobnicate").err().map(|e| e.kind.as_str()),
            Some("invalid command".to_owned())
        );
    }

    #[test]
    fn profile_fields() {
        let update = parse_profile("first_name=Ada email=ada@example.org").unwrap();
        assert_eq!(update.first_name.as_deref(), Some("Ada"));
        assert_eq!(update.email.as_deref(), Some("ada@example.org"));
        assert_eq!(update.last_name, None);

        assert!(parse_profile("nickname=ada").is_err());
        assert!(parse_profile("first_name").is_err());
    }

    #[test]
    fn month_counts() {
        assert_eq!(month_count(3).unwrap(), 3);
        assert!(month_count(4_000_000_000).is_err());
        assert_eq!(
            parse_command("4000000000next").unwrap().repeats,
            Some(4_000_000_000)
        );
    }

    #[test]
    fn ids() {
        assert_eq!(parse_id(" 17").unwrap(), 17);
        assert!(parse_id("seventeen").is_err());
    }
}
