pub mod calctrl;

pub use calctrl::{CalendarController, MonthRequest};
