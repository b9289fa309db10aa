use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::styles::{FrameStyle, LightingStyle, WallTexture};

/// An option list that has an "infer it for me" member.
pub trait Selectable: Copy + PartialEq {
    const AUTO: Self;
    const KIND: &'static str;

    fn is_auto(self) -> bool {
        self == Self::AUTO
    }
}

impl Selectable for FrameStyle {
    const AUTO: Self = FrameStyle::Auto;
    const KIND: &'static str = "frame style";
}

impl Selectable for LightingStyle {
    const AUTO: Self = LightingStyle::Auto;
    const KIND: &'static str = "lighting style";
}

impl Selectable for WallTexture {
    const AUTO: Self = WallTexture::Auto;
    const KIND: &'static str = "wall texture";
}

/// Non-empty ordered selection where `Auto` never coexists with a named value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<T>",
    into = "Vec<T>",
    bound(
        serialize = "T: Selectable + Serialize",
        deserialize = "T: Selectable + Deserialize<'de>"
    )
)]
pub struct SelectionSet<T> {
    values: Vec<T>,
}

impl<T: Selectable> From<Vec<T>> for SelectionSet<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_values(values)
    }
}

impl<T> From<SelectionSet<T>> for Vec<T> {
    fn from(set: SelectionSet<T>) -> Self {
        set.values
    }
}

impl<T: Selectable> SelectionSet<T> {
    pub fn auto() -> Self {
        Self {
            values: vec![T::AUTO],
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let mut set = Self { values: Vec::new() };
        for value in values {
            if value.is_auto() || set.values.contains(&value) {
                continue;
            }
            set.values.push(value);
        }
        if set.values.is_empty() {
            set.values.push(T::AUTO);
        }
        set
    }

    pub fn select(&mut self, value: T) {
        if value.is_auto() {
            self.values = vec![T::AUTO];
            return;
        }
        self.values.retain(|existing| !existing.is_auto());
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    pub fn deselect(&mut self, value: T) -> Result<(), StateError> {
        if !self.values.contains(&value) {
            return Ok(());
        }
        if self.values.len() == 1 {
            return Err(StateError::LastSelection(T::KIND));
        }
        self.values.retain(|existing| *existing != value);
        Ok(())
    }

    pub fn toggle(&mut self, value: T) -> Result<(), StateError> {
        if self.values.contains(&value) {
            self.deselect(value)
        } else {
            self.select(value);
            Ok(())
        }
    }

    /// Round-robin pick: `values[index % len]`.
    pub fn pick(&self, index: usize) -> T {
        self.values[index % self.values.len()]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_auto(&self) -> bool {
        self.values.len() == 1 && self.values[0].is_auto()
    }
}

impl<T: Selectable> Default for SelectionSet<T> {
    fn default() -> Self {
        Self::auto()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintSets {
    #[serde(default)]
    pub frames: SelectionSet<FrameStyle>,
    #[serde(default)]
    pub lighting: SelectionSet<LightingStyle>,
    #[serde(default)]
    pub textures: SelectionSet<WallTexture>,
}

impl ConstraintSets {
    pub fn assign(&self, index: usize) -> (FrameStyle, LightingStyle, WallTexture) {
        (
            self.frames.pick(index),
            self.lighting.pick(index),
            self.textures.pick(index),
        )
    }
}
