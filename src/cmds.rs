use crate::profile::Section;

/// Commands bound to single keys in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    Noop,
    NextMonth,
    PrevMonth,
    Today,
    NextDay,
    PrevDay,
    NextWeek,
    PrevWeek,
    ShowDay,
    ShowSection(Section),
    NextReservation,
    PrevReservation,
    Reload,
    CommandMode,
    Exit,
}
