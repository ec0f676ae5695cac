use anyhow::{anyhow, bail, Error};
use common::{parse_color, Color};
use log::{error, info};

use crate::{command::encode, presets::PresetStore, serial::CommandSink};

/// A user action on the preset list or the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverEvent {
    Next,
    Previous,
    Select(usize),
    /// Show a color on the device without storing it
    Preview(Color),
    Add {
        position: Option<usize>,
        color: Color,
    },
    Remove(usize),
}

/// One line typed into the interactive loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Event(DriverEvent),
    /// Open the serial port and start sending
    Open,
    /// Stop sending and close the port
    Close,
    List,
    Save,
    Quit,
}

impl Input {
    /// Parse `n`, `p`, `s N`, `a COLOR [N]`, `r N`, `c COLOR`, `o`, `x`, `l`,
    /// `w` or `q`
    pub fn parse(line: &str) -> Result<Input, Error> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            bail!("empty input");
        };

        let index = |word: Option<&str>| -> Result<usize, Error> {
            let word = word.ok_or_else(|| anyhow!("`{}` needs a preset number", command))?;
            Ok(word.parse()?)
        };
        let color = |word: Option<&str>| -> Result<Color, Error> {
            let word = word.ok_or_else(|| anyhow!("`{}` needs a color", command))?;
            Ok(parse_color(word)?)
        };

        let input = match command {
            "n" | "next" => Input::Event(DriverEvent::Next),
            "p" | "previous" => Input::Event(DriverEvent::Previous),
            "s" | "select" => Input::Event(DriverEvent::Select(index(words.next())?)),
            "r" | "remove" => Input::Event(DriverEvent::Remove(index(words.next())?)),
            "c" | "color" => Input::Event(DriverEvent::Preview(color(words.next())?)),
            "a" | "add" => {
                let color = color(words.next())?;
                let position = words.next().map(|word| index(Some(word))).transpose()?;
                Input::Event(DriverEvent::Add { position, color })
            }
            "o" | "open" => Input::Open,
            "x" | "close" => Input::Close,
            "l" | "list" => Input::List,
            "w" | "save" => Input::Save,
            "q" | "quit" => Input::Quit,
            other => bail!("unknown command `{}`", other),
        };

        if let Some(extra) = words.next() {
            bail!("unexpected `{}` after `{}`", extra, command);
        }

        Ok(input)
    }
}

/// Routes user actions to the preset store and, while a sink is active,
/// sends the resulting color to the device.
pub struct Driver<S: CommandSink> {
    store: PresetStore,
    sink: Option<S>,
}

impl<S: CommandSink> Driver<S> {
    pub fn new(store: PresetStore) -> Self {
        Self { store, sink: None }
    }

    pub fn activate(&mut self, sink: S) {
        self.sink = Some(sink);
    }

    pub fn deactivate(&mut self) -> Option<S> {
        self.sink.take()
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    pub fn store(&self) -> &PresetStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PresetStore {
        &mut self.store
    }

    pub fn into_store(self) -> PresetStore {
        self.store
    }

    fn transmit(&mut self, color: Color) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        if let Err(e) = sink.send(&encode(color)) {
            error!("Failed to send color to device: {}", e);
        }
    }

    pub fn next(&mut self) -> Option<Color> {
        let color = self.store.next_color()?;
        info!("Next preset {:?}: {:?}", self.store.current_index(), color);
        self.transmit(color);
        Some(color)
    }

    pub fn previous(&mut self) -> Option<Color> {
        let color = self.store.previous_color()?;
        info!("Previous preset {:?}: {:?}", self.store.current_index(), color);
        self.transmit(color);
        Some(color)
    }

    pub fn select(&mut self, position: usize) -> Option<Color> {
        let color = self.store.color_at(position)?;
        info!("Selected preset {}: {:?}", position, color);
        self.transmit(color);
        Some(color)
    }

    pub fn preview(&mut self, color: Color) -> Color {
        self.transmit(color);
        color
    }

    pub fn add(&mut self, position: Option<usize>, color: Color) {
        self.store.insert(position, color);
    }

    pub fn remove(&mut self, position: usize) -> Option<Color> {
        self.store.remove(position)
    }

    /// Apply an event and return the color it touched, if any
    pub fn handle(&mut self, event: DriverEvent) -> Option<Color> {
        match event {
            DriverEvent::Next => self.next(),
            DriverEvent::Previous => self.previous(),
            DriverEvent::Select(position) => self.select(position),
            DriverEvent::Preview(color) => Some(self.preview(color)),
            DriverEvent::Add { position, color } => {
                self.add(position, color);
                Some(color)
            }
            DriverEvent::Remove(position) => self.remove(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandFrame;

    #[derive(Default)]
    struct MockSink {
        frames: Vec<CommandFrame>,
        fail_next_send: bool,
    }

    impl CommandSink for MockSink {
        fn send(&mut self, frame: &CommandFrame) -> Result<(), Error> {
            if self.fail_next_send {
                self.fail_next_send = false;
                bail!("write failed");
            }
            self.frames.push(*frame);
            Ok(())
        }
    }

    fn driver(colors: &[&str]) -> Driver<MockSink> {
        let mut store = PresetStore::default();
        store.load_from_list(colors);
        Driver::new(store)
    }

    fn sent(driver: &Driver<MockSink>) -> Vec<String> {
        driver
            .sink
            .as_ref()
            .map(|sink| sink.frames.iter().map(|frame| frame.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_navigation_sends_frames_when_active() {
        let mut driver = driver(&["#ff0000", "#00ff00", "#0000ff"]);
        driver.activate(MockSink::default());

        assert_eq!(Some(Color::new(0, 255, 0)), driver.next());
        assert_eq!(Some(Color::new(255, 0, 0)), driver.previous());
        assert_eq!(Some(Color::new(0, 0, 255)), driver.select(2));
        assert_eq!(None, driver.select(3));

        assert_eq!(vec!["U00ff0001", "Uff000001", "U0000ff01"], sent(&driver));
    }

    #[test]
    fn test_inactive_driver_still_navigates() {
        let mut driver = driver(&["#ff0000", "#00ff00"]);
        assert!(!driver.is_active());

        assert_eq!(Some(Color::new(0, 255, 0)), driver.next());
        assert_eq!(Some(1), driver.store().current_index());
    }

    #[test]
    fn test_empty_store_sends_nothing() {
        let mut driver = driver(&[]);
        driver.activate(MockSink::default());

        assert_eq!(None, driver.next());
        assert_eq!(None, driver.previous());
        assert!(sent(&driver).is_empty());
    }

    #[test]
    fn test_preview_does_not_store() {
        let mut driver = driver(&[]);
        driver.activate(MockSink::default());

        driver.handle(DriverEvent::Preview(Color::new(255, 255, 255)));

        assert!(driver.store().is_empty());
        assert_eq!(vec!["Uffffff03"], sent(&driver));
    }

    #[test]
    fn test_add_and_remove_events() {
        let mut driver = driver(&["#ff0000"]);
        driver.activate(MockSink::default());

        driver.handle(DriverEvent::Add {
            position: Some(0),
            color: Color::new(0, 0, 255),
        });
        assert_eq!(vec!["#0000ff", "#ff0000"], driver.store().to_string_list());

        assert_eq!(
            Some(Color::new(0, 0, 255)),
            driver.handle(DriverEvent::Remove(0))
        );
        assert_eq!(None, driver.handle(DriverEvent::Remove(5)));
        assert_eq!(vec!["#ff0000"], driver.store().to_string_list());

        // Editing the list does not talk to the device
        assert!(sent(&driver).is_empty());
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let mut driver = driver(&["#ff0000", "#00ff00"]);
        driver.activate(MockSink {
            fail_next_send: true,
            ..Default::default()
        });

        assert_eq!(Some(Color::new(0, 255, 0)), driver.next());
        assert_eq!(Some(Color::new(255, 0, 0)), driver.next());
        assert_eq!(vec!["Uff000001"], sent(&driver));
    }

    #[test]
    fn test_deactivate_returns_sink() {
        let mut driver = driver(&["#ff0000"]);
        driver.activate(MockSink::default());
        driver.select(0);

        let sink = driver.deactivate().expect("sink was active");
        assert_eq!(1, sink.frames.len());
        assert!(!driver.is_active());
    }

    #[test]
    fn test_parse_input() -> Result<(), Error> {
        assert_eq!(Input::Event(DriverEvent::Next), Input::parse("n")?);
        assert_eq!(Input::Event(DriverEvent::Previous), Input::parse(" previous ")?);
        assert_eq!(Input::Event(DriverEvent::Select(2)), Input::parse("s 2")?);
        assert_eq!(Input::Event(DriverEvent::Remove(0)), Input::parse("r 0")?);
        assert_eq!(
            Input::Event(DriverEvent::Preview(Color::new(255, 0, 0))),
            Input::parse("c red")?
        );
        assert_eq!(
            Input::Event(DriverEvent::Add {
                position: None,
                color: Color::new(0x12, 0x34, 0x56)
            }),
            Input::parse("a #123456")?
        );
        assert_eq!(
            Input::Event(DriverEvent::Add {
                position: Some(1),
                color: Color::new(0, 0, 255)
            }),
            Input::parse("add blue 1")?
        );
        assert_eq!(Input::Open, Input::parse("o")?);
        assert_eq!(Input::Close, Input::parse("x")?);
        assert_eq!(Input::Close, Input::parse("close")?);
        assert_eq!(Input::List, Input::parse("l")?);
        assert_eq!(Input::Save, Input::parse("w")?);
        assert_eq!(Input::Quit, Input::parse("quit")?);
        Ok(())
    }

    #[test]
    fn test_parse_input_errors() {
        for line in ["", "   ", "zz", "s", "s two", "c", "c #12", "a", "n 1", "a red 1 2"] {
            assert!(Input::parse(line).is_err(), "`{}` should not parse", line);
        }
    }
}
