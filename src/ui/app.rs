use crate::config::Config;
use crate::events::{Dispatcher, Event};

use super::{Context, FlashLine, Mode, NavBar, SectionWindow};

use unsegen::base::{GraphemeCluster, Terminal};
use unsegen::input::{EditBehavior, Input, Key, ScrollBehavior};
use unsegen::widget::*;

use super::command::CommandParser;

pub struct App<'a> {
    config: &'a Config,
    context: Context,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, context: Context) -> App<'a> {
        App { config, context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn bottom_bar<'w>(&'w self) -> impl Widget + 'w {
        let spacer = " ".with_demand(|_| Demand2D {
            width: ColDemand::exact(1),
            height: RowDemand::exact(1),
        });

        let mut layout = HLayout::new()
            .separator(GraphemeCluster::try_from(' ').unwrap())
            .widget(spacer);
        if let Mode::Command = self.context.mode {
            layout = layout.widget(self.context.input_sink().as_widget());
        } else {
            layout = layout.widget(FlashLine::new(&self.context));
        }

        layout
    }

    fn as_widget<'w>(&'w self) -> impl Widget + 'w
    where
        'a: 'w,
    {
        VLayout::new()
            .widget(NavBar::new(&self.context))
            .widget(SectionWindow::new(&self.context))
            .widget(self.bottom_bar())
    }

    fn handle_input(&mut self, input: Input) {
        if input.matches(Key::Esc) {
            self.context.mode = Mode::Normal;
            self.context.close_details();
            return;
        }

        match self.context.mode {
            Mode::Normal => {
                let cmd = match &input.event {
                    unsegen::input::Event::Key(key) => self.config.key_map.get(key).copied(),
                    _ => None,
                };

                match cmd {
                    Some(cmd) => self.context.execute(cmd),
                    None => log::trace!("Unbound input {:?}", input.event),
                }
            }
            Mode::Command => {
                input
                    .chain(
                        EditBehavior::new(self.context.input_sink_mut())
                            .delete_forwards_on(Key::Delete)
                            .delete_backwards_on(Key::Backspace)
                            .left_on(Key::Left)
                            .right_on(Key::Right),
                    )
                    .chain(
                        ScrollBehavior::new(self.context.input_sink_mut())
                            .backwards_on(Key::Up)
                            .forwards_on(Key::Down),
                    )
                    .chain(CommandParser::new(&mut self.context))
                    .finish();
            }
        }
    }

    pub fn run(
        &mut self,
        dispatcher: Dispatcher,
        mut term: Terminal,
    ) -> Result<(), Box<dyn std::error::Error>> {
        while self.context.is_running() {
            match dispatcher.next() {
                Ok(Event::Input(input)) => self.handle_input(input),
                Ok(event) => self.context.handle(event),
                Err(err) => {
                    log::error!("Event channel closed: {}", err);
                    break;
                }
            }

            let root = term.create_root_window();
            self.as_widget().draw(root, RenderingHints::new());
            term.present();
        }

        Ok(())
    }
}
