use std::path::Path;

use anyhow::Error;
use common::Color;
use log::{debug, info};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::{driver::DriverEvent, presets::PresetStore};

/// Everything remembered between runs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Session {
    pub port: Option<String>,
    pub colors: Vec<String>,
    /// Index of the active preset
    pub current: usize,
    /// Color set by hand, outside the preset list
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Open the port as soon as the interactive loop starts
    pub activate: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            port: None,
            colors: Vec::new(),
            current: 0,
            red: 255,
            green: 255,
            blue: 255,
            activate: false,
        }
    }
}

impl Session {
    pub fn load(path: &Path) -> Result<Session, Error> {
        if !path.exists() {
            debug!("No session at {}, starting fresh", path.display());
            return Ok(Session::default());
        }

        let session = std::fs::read_to_string(path)?;
        let session: Session = ron::from_str(&session)?;
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, ron::ser::to_string_pretty(self, PrettyConfig::default())?)?;
        info!("Saved {} presets to {}", self.colors.len(), path.display());
        Ok(())
    }

    /// Fill the store with the saved presets and select the saved one
    pub fn restore(&self, store: &mut PresetStore) {
        store.load_from_list(&self.colors);
        store.color_at(self.current);
    }

    /// Take the presets and cursor back from the store
    pub fn capture(&mut self, store: &PresetStore) {
        self.colors = store.to_string_list();
        self.current = store.current_index().unwrap_or(0);
    }

    /// Remember what an event changes outside the preset list
    pub fn record(&mut self, event: &DriverEvent) {
        if let DriverEvent::Preview(color) = event {
            self.set_manual_color(*color);
        }
    }

    pub fn manual_color(&self) -> Color {
        Color::new(self.red, self.green, self.blue)
    }

    pub fn set_manual_color(&mut self, color: Color) {
        self.red = color.r;
        self.green = color.g;
        self.blue = color.b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.ron");

        let session = Session {
            port: Some("/dev/ttyACM0".to_string()),
            colors: vec!["#ff0000".to_string(), "#00ff00".to_string()],
            current: 1,
            red: 1,
            green: 2,
            blue: 3,
            activate: true,
        };
        session.save(&path)?;

        assert_eq!(session, Session::load(&path)?);
        Ok(())
    }

    #[test]
    fn test_missing_session_is_default() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let session = Session::load(&dir.path().join("session.ron"))?;

        assert_eq!(Session::default(), session);
        assert_eq!(Color::new(255, 255, 255), session.manual_color());
        Ok(())
    }

    #[test]
    fn test_restore_and_capture() {
        let session = Session {
            colors: vec![
                "#ff0000".to_string(),
                "garbage".to_string(),
                "#0000ff".to_string(),
            ],
            current: 1,
            ..Session::default()
        };

        let mut store = PresetStore::default();
        session.restore(&mut store);
        assert_eq!(Some(Color::new(0, 0, 255)), store.current_color());

        store.next_color();

        let mut captured = session.clone();
        captured.capture(&store);
        assert_eq!(vec!["#ff0000", "#0000ff"], captured.colors);
        assert_eq!(0, captured.current);
    }

    #[test]
    fn test_capture_keeps_activate_preference() {
        let mut store = PresetStore::default();
        store.load_from_list(["#ff0000"]);

        let mut session = Session::default();
        session.capture(&store);
        assert!(!session.activate);

        session.activate = true;
        session.capture(&store);
        assert!(session.activate);
    }

    #[test]
    fn test_record_preview_sets_manual_color() {
        let mut session = Session::default();

        session.record(&DriverEvent::Preview(Color::new(1, 2, 3)));
        assert_eq!(Color::new(1, 2, 3), session.manual_color());

        // List edits and navigation leave it alone
        session.record(&DriverEvent::Next);
        session.record(&DriverEvent::Add {
            position: None,
            color: Color::new(9, 9, 9),
        });
        assert_eq!(Color::new(1, 2, 3), session.manual_color());
    }

    #[test]
    fn test_restore_with_stale_cursor() {
        let session = Session {
            colors: vec!["#ff0000".to_string()],
            current: 7,
            ..Session::default()
        };

        let mut store = PresetStore::default();
        session.restore(&mut store);
        assert_eq!(Some(0), store.current_index());
    }
}
