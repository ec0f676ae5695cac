use std::{fmt::Debug, ops::Range};

use common::{color_name, parse_color, Color};
use log::{debug, warn};

use crate::icon::{Icon, IconTemplate};

/// A stored color and the swatch rendered for it.
///
/// The icon is derived from the color when the preset is created and is
/// dropped together with it.
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    color: Color,
    icon: Option<Icon>,
}

impl Preset {
    pub fn new(color: Color, template: &IconTemplate) -> Self {
        Self {
            color,
            icon: template.render(color),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }

    pub fn name(&self) -> String {
        color_name(self.color)
    }
}

/// What a list view needs to draw one row
#[derive(Debug, PartialEq)]
pub struct PresetItem<'a> {
    pub text: String,
    pub icon: Option<&'a Icon>,
}

/// Change delivered to observers once a mutation has been committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListChange {
    Inserted(Range<usize>),
    Removed(Range<usize>),
    /// The whole list was replaced
    Reset,
}

type Observer = Box<dyn FnMut(&ListChange)>;

/// Ordered list of color presets with a cursor for next/previous cycling.
///
/// The cursor always points at a preset while the list is non-empty.
pub struct PresetStore {
    presets: Vec<Preset>,
    current: usize,
    template: IconTemplate,
    observers: Vec<Observer>,
}

impl PresetStore {
    pub fn new(template: IconTemplate) -> Self {
        Self {
            presets: Vec::new(),
            current: 0,
            template,
            observers: Vec::new(),
        }
    }

    /// Register a callback for insertions, removals and resets
    pub fn subscribe(&mut self, observer: impl FnMut(&ListChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, change: ListChange) {
        debug!("Preset list changed: {:?}", change);
        for observer in self.observers.iter_mut() {
            observer(&change);
        }
    }

    /// Replace every preset with the parsed colors.
    ///
    /// Entries that do not parse are skipped. The cursor goes back to the
    /// first preset.
    pub fn load_from_list<I, S>(&mut self, colors: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let presets = colors
            .into_iter()
            .filter_map(|text| match parse_color(text.as_ref()) {
                Ok(color) => Some(Preset::new(color, &self.template)),
                Err(e) => {
                    warn!("Skipping stored preset: {}", e);
                    None
                }
            })
            .collect();

        // The old presets and their icons are dropped here
        self.presets = presets;
        self.current = 0;
        self.notify(ListChange::Reset);
    }

    pub fn to_string_list(&self) -> Vec<String> {
        self.presets.iter().map(Preset::name).collect()
    }

    /// Insert before `position`, or append when it is `None` or out of range.
    pub fn insert(&mut self, position: Option<usize>, color: Color) {
        let preset = Preset::new(color, &self.template);
        let index = match position {
            Some(index) if index < self.presets.len() => index,
            _ => self.presets.len(),
        };

        // Keep the cursor on the preset it pointed at
        if !self.presets.is_empty() && index <= self.current {
            self.current += 1;
        }

        self.presets.insert(index, preset);
        self.notify(ListChange::Inserted(index..index + 1));
    }

    /// Remove the preset at `position`, returning its color.
    ///
    /// Does nothing and returns `None` for an out of range position.
    pub fn remove(&mut self, position: usize) -> Option<Color> {
        if position >= self.presets.len() {
            return None;
        }

        let removed = self.presets.remove(position);

        if position < self.current {
            self.current -= 1;
        }
        self.current = self.current.min(self.presets.len().saturating_sub(1));

        self.notify(ListChange::Removed(position..position + 1));
        Some(removed.color)
    }

    /// Select the preset at `position` and return its color.
    pub fn color_at(&mut self, position: usize) -> Option<Color> {
        let color = self.presets.get(position)?.color;
        self.current = position;
        Some(color)
    }

    /// Step the cursor forward, wrapping to the first preset.
    pub fn next_color(&mut self) -> Option<Color> {
        if self.presets.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.presets.len();
        Some(self.presets[self.current].color)
    }

    /// Step the cursor back, wrapping to the last preset.
    pub fn previous_color(&mut self) -> Option<Color> {
        if self.presets.is_empty() {
            return None;
        }
        self.current = match self.current {
            0 => self.presets.len() - 1,
            current => current - 1,
        };
        Some(self.presets[self.current].color)
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.presets.is_empty()).then_some(self.current)
    }

    pub fn current_color(&self) -> Option<Color> {
        self.presets.get(self.current).map(Preset::color)
    }

    pub fn item_count(&self) -> usize {
        self.presets.len()
    }

    pub fn item_at(&self, position: usize) -> Option<PresetItem<'_>> {
        self.presets.get(position).map(|preset| PresetItem {
            text: preset.name(),
            icon: preset.icon(),
        })
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new(IconTemplate::embedded())
    }
}

impl Debug for PresetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresetStore")
            .field("presets", &self.to_string_list())
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}
