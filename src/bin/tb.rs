extern crate tablebook as lib;

use chrono::Local;
use flexi_logger::{FileSpec, Logger};
use lib::api::ApiClient;
use lib::calendar::DisplayedMonth;
use lib::config::Config;
use lib::ctrl::CalendarController;
use lib::events::{Dispatcher, Loader};
use lib::provider::{source_from_config, ReservationSource};
use lib::ui::app::App;
use lib::ui::{Context, TextCalendar};
use nix::sys::termios;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use unsegen::base::Terminal;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tb",
    author = "Julian Bigge <j.reedts@gmail.com>",
    about = "Tablebook - reservations of your restaurant profile in the terminal."
)]
pub struct Args {
    #[structopt(
        name = "CONFIG",
        short = "c",
        long = "config",
        help = "path to config file",
        parse(from_os_str)
    )]
    pub configfile: Option<PathBuf>,

    #[structopt(
        short = "s",
        long = "show",
        help = "only print the calendar non-interactively"
    )]
    pub show: bool,

    #[structopt(long = "month", help = "month to open, as YYYY-MM")]
    pub month: Option<DisplayedMonth>,

    #[structopt(long = "log-file", help = "path to log file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

fn show_month(
    source: &dyn ReservationSource,
    month: Option<DisplayedMonth>,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();
    let month = month.unwrap_or_else(|| DisplayedMonth::from_date(&today));

    let mut ctrl = CalendarController::new(month, today);
    let request = ctrl.request_month_data();
    let reservations = source.reservations_between(request.begin, request.end)?;
    ctrl.apply_month_data(request.generation, reservations);

    let stdout = stdout();
    let mut view = TextCalendar::new(stdout.lock());
    ctrl.render_month(today, &mut view);
    view.finish()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    const DEFAULT_LOG_LEVEL: &str = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let mut logger = Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)?;

    if let Some(log_file) = &args.log_file {
        logger = logger
            .log_to_file(FileSpec::try_from(log_file)?)
            .print_message();
    }

    logger.start()?;

    let config: Config = lib::config::load_suitable_config(args.configfile.as_deref())?;
    let source = source_from_config(&config)?;

    if args.show {
        return show_month(source.as_ref(), args.month);
    }

    const STDOUT: std::os::unix::io::RawFd = 0;
    let orig_attr = std::sync::Mutex::new(termios::tcgetattr(STDOUT)?);

    std::panic::set_hook(Box::new(move |info| {
        // Switch to main terminal screen
        println!("{}{}", termion::screen::ToMainScreen, termion::cursor::Show);

        if let Ok(attr) = orig_attr.lock() {
            let _ = termios::tcsetattr(STDOUT, termios::SetArg::TCSANOW, &attr);
        }

        println!("Tablebook ran into a fatal error!");
        println!("Consider filing an issue with a log file and the backtrace below.");

        println!("{}", info);
        println!("{:?}", backtrace::Backtrace::new());
    }));

    let api = Arc::new(ApiClient::from_config(&config.api)?);
    let dispatcher = Dispatcher::from_config(&config);
    let loader = Loader::new(source, api, dispatcher.event_sink().clone());

    // Setup unsegen terminal
    let stdout = stdout();
    let term = Terminal::new(stdout.lock())?;

    let context = Context::new(&config, loader, args.month);
    let mut app = App::new(&config, context);

    app.run(dispatcher, term)
}
